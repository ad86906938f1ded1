// =============================================================================
// Candle Signals — Main Entry Point
// =============================================================================
//
// Two modes, picked by the config file:
//   instant_processing = true   one recompute pass, write `<name>_processed.json`,
//                               print the summary, exit
//   instant_processing = false  live loop until market close
//
// The candle series comes from `storage_dir/source_filename`, or from a fresh
// MOEX fetch when `self_creation` is set.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod error;
mod indicators;
mod live;
mod market_data;
mod runtime_config;
mod signals;
mod types;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::analysis::{pivot_session, Snapshot};
use crate::live::{LiveUpdater, SnapshotSink, StorageSink};
use crate::market_data::storage::processed_file_name;
use crate::market_data::{CandleSeries, CandleSource, MoexClient, Storage};
use crate::runtime_config::{config_path, RuntimeConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Candle Signals — starting up");

    let config = RuntimeConfig::load_or_init(config_path(std::env::args().nth(1)));
    let storage = Storage::open(&config.storage_dir)?;
    let now = config.exchange_now();

    info!(
        ticker = %config.ticker,
        interval_minutes = config.interval_minutes,
        period = %config.period,
        self_creation = config.self_creation,
        instant_processing = config.instant_processing,
        "configuration resolved"
    );

    // ── 2. Candle series ─────────────────────────────────────────────────
    let (series, source_name) = if config.self_creation {
        let client = MoexClient::new(&config.source)?;
        let candles = client
            .fetch_candles(&config.ticker, config.interval_minutes, config.period, now)
            .await
            .with_context(|| format!("failed to fetch candles for {}", config.ticker))?;
        let series = CandleSeries::new(candles)?;
        let name = storage.save_series(
            &config.ticker,
            config.period.start_date(now)?,
            config.period,
            now.time(),
            &series,
        )?;
        (series, name)
    } else {
        let series = storage.load_series(&config.source_filename)?;
        (series, config.source_filename.clone())
    };

    let mut sink = StorageSink::new(storage, processed_file_name(&source_name));

    // ── 3. Instant processing ────────────────────────────────────────────
    if config.instant_processing {
        let session = pivot_session(&series, config.levels_from_last_session, now.date());
        let snapshot = Snapshot::build(&config, &series, session, now)?;
        sink.publish(&snapshot)?;
        println!("{}", snapshot.summary);
        info!(file = %processed_file_name(&source_name), "processed snapshot written");
        return Ok(());
    }

    // ── 4. Live loop until market close ──────────────────────────────────
    let client = MoexClient::new(&config.source)?;
    let mut updater = LiveUpdater::new(config, client, sink, series);
    updater.run().await?;

    info!("Candle Signals — shutdown complete");
    Ok(())
}
