// =============================================================================
// Runtime Configuration — engine settings, defaults written on first run
// =============================================================================
//
// Every tunable parameter of the engine lives here: the instrument, the
// market-data source, the indicator windows and the composite scoring
// weights. The config is an explicit value handed to the components that need
// it; nothing reads ambient globals.
//
// All fields carry `#[serde(default)]` so that a partial JSON file (or an
// older one missing new fields) still loads.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicators::bollinger::BollingerParams;
use crate::indicators::candlestick::DEFAULT_TREND_WINDOW;
use crate::indicators::moving_average::MovingAverageParams;
use crate::indicators::stoch_rsi::StochRsiParams;
use crate::indicators::{rsi, stochastic};
use crate::market_data::storage::write_json_atomic;
use crate::market_data::FetchPeriod;

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_PATH_ENV: &str = "CANDLE_SIGNALS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_ticker() -> String {
    "FEES".to_string()
}

fn default_interval_minutes() -> u32 {
    10
}

fn default_source_filename() -> String {
    "FEES_2024-11-10_3D_[183522].json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_market_open() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default()
}

fn default_market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 45, 0).unwrap_or_default()
}

fn default_utc_offset_minutes() -> i32 {
    180
}

fn default_base_url() -> String {
    "https://iss.moex.com".to_string()
}

fn default_engine() -> String {
    "stock".to_string()
}

fn default_market() -> String {
    "shares".to_string()
}

fn default_board() -> String {
    "TQBR".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_rsi_period() -> usize {
    rsi::DEFAULT_PERIOD
}

fn default_stochastic_period() -> usize {
    stochastic::DEFAULT_PERIOD
}

fn default_pattern_window() -> usize {
    DEFAULT_TREND_WINDOW
}

fn default_weight() -> f64 {
    1.0
}

fn default_threshold() -> f64 {
    1.0
}

fn default_strong_threshold() -> f64 {
    3.0
}

// =============================================================================
// SourceConfig
// =============================================================================

/// MOEX ISS endpoint and the fetch retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_market")]
    pub market: String,

    #[serde(default = "default_board")]
    pub board: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Total attempts per live tick, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubled after every failed attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            engine: default_engine(),
            market: default_market(),
            board: default_board(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

// =============================================================================
// IndicatorParams
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default)]
    pub moving_average: MovingAverageParams,

    #[serde(default)]
    pub bollinger: BollingerParams,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_stochastic_period")]
    pub stochastic_period: usize,

    #[serde(default)]
    pub stoch_rsi: StochRsiParams,

    /// Number of preceding closes that must trend for hammer / hanging man.
    #[serde(default = "default_pattern_window")]
    pub pattern_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            moving_average: MovingAverageParams::default(),
            bollinger: BollingerParams::default(),
            rsi_period: default_rsi_period(),
            stochastic_period: default_stochastic_period(),
            stoch_rsi: StochRsiParams::default(),
            pattern_window: default_pattern_window(),
        }
    }
}

// =============================================================================
// ScoringConfig
// =============================================================================

/// Weights and thresholds of the composite recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_weight")]
    pub moving_average_weight: f64,

    #[serde(default = "default_weight")]
    pub bollinger_weight: f64,

    #[serde(default = "default_weight")]
    pub stoch_rsi_weight: f64,

    #[serde(default = "default_weight")]
    pub stochastic_weight: f64,

    #[serde(default = "default_weight")]
    pub volume_weight: f64,

    /// |score| at or above this is a Buy / Sell.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// |score| at or above this is a StrongBuy / StrongSell.
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            moving_average_weight: default_weight(),
            bollinger_weight: default_weight(),
            stoch_rsi_weight: default_weight(),
            stochastic_weight: default_weight(),
            volume_weight: default_weight(),
            threshold: default_threshold(),
            strong_threshold: default_strong_threshold(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Instrument -----------------------------------------------------------

    #[serde(default = "default_ticker")]
    pub ticker: String,

    /// Bar length; also the live polling cadence.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// How far back a fetch reaches (`"3D"`, `"M30"`).
    #[serde(default)]
    pub period: FetchPeriod,

    // --- Modes ----------------------------------------------------------------

    /// Candle file inside `storage_dir` used when `self_creation` is off.
    #[serde(default = "default_source_filename")]
    pub source_filename: String,

    /// Run one recompute pass and exit instead of the live loop.
    #[serde(default = "default_true")]
    pub instant_processing: bool,

    /// Fetch a fresh series from the source instead of loading
    /// `source_filename`.
    #[serde(default)]
    pub self_creation: bool,

    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    // --- Trading session --------------------------------------------------------

    #[serde(default = "default_market_open", with = "hhmm")]
    pub market_open: NaiveTime,

    #[serde(default = "default_market_close", with = "hhmm")]
    pub market_close: NaiveTime,

    /// Exchange clock offset from UTC (Moscow is +180).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Compute pivot levels from the most recent session in the series
    /// rather than from today's date.
    #[serde(default)]
    pub levels_from_last_session: bool,

    // --- Components -------------------------------------------------------------

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub indicators: IndicatorParams,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            interval_minutes: default_interval_minutes(),
            period: FetchPeriod::default(),
            source_filename: default_source_filename(),
            instant_processing: true,
            self_creation: false,
            storage_dir: default_storage_dir(),
            market_open: default_market_open(),
            market_close: default_market_close(),
            utc_offset_minutes: default_utc_offset_minutes(),
            levels_from_last_session: false,
            source: SourceConfig::default(),
            indicators: IndicatorParams::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            ticker = %config.ticker,
            interval_minutes = config.interval_minutes,
            instant_processing = config.instant_processing,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Load from `path`, or fall back to defaults with a warning when the
    /// file is missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "using default runtime config");
                Self::default()
            }
        }
    }

    /// Load `path`; when no file exists yet, write the defaults there so the
    /// next run has a file to edit.
    pub fn load_or_init(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            return Self::load_or_default(path);
        }

        let config = Self::default();
        match config.save(path) {
            Ok(()) => info!(path = %path.display(), "default runtime config written"),
            Err(e) => warn!(error = %format!("{e:#}"), "could not write default runtime config"),
        }
        config
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json_atomic(path.as_ref(), self).context("failed to save runtime config")
    }

    /// Current wall-clock time on the exchange clock.
    pub fn exchange_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes))
    }
}

/// Config path: first positional argument, then `CANDLE_SIGNALS_CONFIG`, then
/// `config.json`.
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// `"HH:MM"` serde for session boundaries (`"HH:MM:SS"` also accepted).
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time {raw:?}: {e}")))
    }
}
