// =============================================================================
// MOEX ISS REST client — board candles
// =============================================================================
//
// Public endpoint, no authentication:
//
//   GET {base}/iss/engines/{engine}/markets/{market}/boards/{board}/
//       securities/{ticker}/candles.json?interval=&from=&start=&iss.meta=off
//
// The response is a column/row table under "candles". Pages hold at most a
// few hundred rows; `start` is advanced by the raw row count of each page
// (parsed or not) until a page with no rows comes back.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::candle_series::timestamp_format;
use crate::market_data::{Candle, CandleSource, FetchPeriod, SourceError};
use crate::runtime_config::SourceConfig;

/// Upper bound on pages per fetch; a runaway `start` cursor stops here.
const MAX_PAGES: usize = 200;

/// MOEX ISS candle client.
#[derive(Clone)]
pub struct MoexClient {
    base_url: String,
    engine: String,
    market: String,
    board: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CandlesEnvelope {
    candles: Table,
}

#[derive(Debug, Deserialize)]
struct Table {
    columns: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

/// One parsed page: the valid candles plus the number of rows the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct CandlePage {
    pub candles: Vec<Candle>,
    pub rows: usize,
}

/// Column positions of the fields we need.
struct Columns {
    begin: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn locate(columns: &[String]) -> Result<Self, SourceError> {
        let find = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| SourceError::Malformed(format!("candles table has no '{name}' column")))
        };
        Ok(Self {
            begin: find("begin")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

impl MoexClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        debug!(base_url = %config.base_url, board = %config.board, "MoexClient initialised");

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            engine: config.engine.clone(),
            market: config.market.clone(),
            board: config.board.clone(),
            client,
        })
    }

    fn candles_url(&self, ticker: &str) -> String {
        format!(
            "{}/iss/engines/{}/markets/{}/boards/{}/securities/{}/candles.json",
            self.base_url, self.engine, self.market, self.board, ticker
        )
    }

    /// One page of candles starting at row offset `start`.
    async fn fetch_page(
        &self,
        ticker: &str,
        interval: u32,
        from: NaiveDate,
        start: usize,
    ) -> Result<CandlePage, SourceError> {
        let resp = self
            .client
            .get(self.candles_url(ticker))
            .query(&[
                ("interval", interval.to_string()),
                ("from", from.format("%Y-%m-%d").to_string()),
                ("start", start.to_string()),
                ("iss.meta", "off".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = resp.json().await?;
        parse_candles(&body)
    }
}

impl CandleSource for MoexClient {
    #[instrument(skip(self), name = "moex::fetch_candles")]
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval_minutes: u32,
        period: FetchPeriod,
        now: NaiveDateTime,
    ) -> Result<Vec<Candle>, SourceError> {
        let interval = iss_interval(interval_minutes)?;
        let from = period.start_date(now)?;

        let mut candles = collect_pages(move |start| self.fetch_page(ticker, interval, from, start)).await?;

        if candles.is_empty() {
            return Err(SourceError::Empty {
                ticker: ticker.to_string(),
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by(|later, earlier| {
            if later.timestamp == earlier.timestamp {
                *earlier = later.clone();
                true
            } else {
                false
            }
        });

        debug!(ticker, interval_minutes, %from, count = candles.len(), "candles fetched");
        Ok(candles)
    }
}

/// Walk the `start=` cursor page by page. The cursor moves by the raw row
/// count so pages whose rows were all skipped neither stop nor rewind it.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Candle>, SourceError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<CandlePage, SourceError>>,
{
    let mut candles = Vec::new();
    let mut start = 0;
    for _ in 0..MAX_PAGES {
        let page = fetch_page(start).await?;
        if page.rows == 0 {
            return Ok(candles);
        }
        start += page.rows;
        candles.extend(page.candles);
    }

    warn!(pages = MAX_PAGES, rows = start, "page limit reached, result may be truncated");
    Ok(candles)
}

/// Map a bar length in minutes onto an ISS interval code.
pub fn iss_interval(minutes: u32) -> Result<u32, SourceError> {
    match minutes {
        1 | 10 | 60 => Ok(minutes),
        1440 => Ok(24),
        other => Err(SourceError::UnsupportedInterval(other)),
    }
}

/// Parse the ISS candles table. Rows that fail to parse or violate the OHLCV
/// invariant are skipped with a warning.
pub fn parse_candles(body: &serde_json::Value) -> Result<CandlePage, SourceError> {
    let envelope = CandlesEnvelope::deserialize(body)
        .map_err(|e| SourceError::Malformed(format!("unexpected candles payload: {e}")))?;
    let cols = Columns::locate(&envelope.candles.columns)?;

    let mut candles = Vec::with_capacity(envelope.candles.data.len());
    for row in &envelope.candles.data {
        match parse_row(row, &cols) {
            Some(candle) => match candle.validate() {
                Ok(()) => candles.push(candle),
                Err(e) => warn!(error = %e, "skipping invalid candle row"),
            },
            None => warn!(row = ?row, "skipping malformed candle row"),
        }
    }
    Ok(CandlePage {
        candles,
        rows: envelope.candles.data.len(),
    })
}

fn parse_row(row: &[serde_json::Value], cols: &Columns) -> Option<Candle> {
    let num = |i: usize| row.get(i)?.as_f64();
    let begin = row.get(cols.begin)?.as_str()?;
    Some(Candle {
        timestamp: timestamp_format::parse(begin).ok()?,
        open: num(cols.open)?,
        high: num(cols.high)?,
        low: num(cols.low)?,
        close: num(cols.close)?,
        volume: num(cols.volume)?,
    })
}
