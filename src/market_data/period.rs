// =============================================================================
// Fetch look-back period
// =============================================================================
//
// `"<n>D"` means n days back and `"M<n>"` n minutes back. The fetch starts on
// the date of `now - period`; a period reaching past the calendar is rejected.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::market_data::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPeriod {
    Days(u32),
    Minutes(u32),
}

impl FetchPeriod {
    pub fn duration(self) -> Duration {
        match self {
            Self::Days(n) => Duration::days(i64::from(n)),
            Self::Minutes(n) => Duration::minutes(i64::from(n)),
        }
    }

    pub fn start_date(self, now: NaiveDateTime) -> Result<NaiveDate, SourceError> {
        now.checked_sub_signed(self.duration())
            .map(|start| start.date())
            .ok_or(SourceError::PeriodOutOfRange(self))
    }
}

impl Default for FetchPeriod {
    fn default() -> Self {
        Self::Days(1)
    }
}

impl std::fmt::Display for FetchPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Days(n) => write!(f, "{n}D"),
            Self::Minutes(n) => write!(f, "M{n}"),
        }
    }
}

impl FromStr for FetchPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if let Some(days) = s.strip_suffix(['D', 'd']) {
            days.parse().map(Self::Days)
        } else if let Some(minutes) = s.strip_prefix(['M', 'm']) {
            minutes.parse().map(Self::Minutes)
        } else {
            return Err(format!("unrecognised period {s:?}: expected \"<n>D\" or \"M<n>\""));
        };
        parsed.map_err(|e| format!("invalid period {s:?}: {e}"))
    }
}

impl Serialize for FetchPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FetchPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_forms() {
        assert_eq!("3D".parse::<FetchPeriod>().unwrap(), FetchPeriod::Days(3));
        assert_eq!("M30".parse::<FetchPeriod>().unwrap(), FetchPeriod::Minutes(30));
        assert!("3W".parse::<FetchPeriod>().is_err());
        assert!("MxD".parse::<FetchPeriod>().is_err());
        assert!("D".parse::<FetchPeriod>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        assert_eq!(FetchPeriod::Days(3).to_string(), "3D");
        assert_eq!(FetchPeriod::Minutes(45).to_string(), "M45");
    }

    #[test]
    fn start_date_steps_back() {
        let now = NaiveDate::from_ymd_opt(2024, 11, 12)
            .unwrap()
            .and_hms_opt(0, 20, 0)
            .unwrap();
        assert_eq!(
            FetchPeriod::Days(3).start_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 9).unwrap()
        );
        assert_eq!(
            FetchPeriod::Minutes(30).start_date(now).unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 11).unwrap()
        );
    }

    #[test]
    fn start_date_before_calendar_is_an_error() {
        let now = NaiveDate::from_ymd_opt(2024, 11, 12)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let huge: FetchPeriod = "4294967295D".parse().unwrap();
        assert!(matches!(
            huge.start_date(now),
            Err(SourceError::PeriodOutOfRange(FetchPeriod::Days(u32::MAX)))
        ));
        assert!(FetchPeriod::Minutes(u32::MAX).start_date(now).is_ok());
    }

    #[test]
    fn serde_uses_string_form() {
        let p: FetchPeriod = serde_json::from_str("\"M10\"").unwrap();
        assert_eq!(p, FetchPeriod::Minutes(10));
        assert_eq!(serde_json::to_string(&FetchPeriod::Days(1)).unwrap(), "\"1D\"");
    }
}
