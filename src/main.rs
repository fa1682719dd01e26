//! Library occupancy tracker entry point.
//!
//! Loads `.env` and configuration, initialises structured logging, then
//! either runs a single tick (for an external scheduler) or ticks until
//! Ctrl-C, waiting a fixed period after each tick finishes.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::info;

use occupancy_tracker::config::{self, AppConfig, RunMode};
use occupancy_tracker::estimate::Estimator;
use occupancy_tracker::source::concordia::ConcordiaClient;
use occupancy_tracker::storage::OccupancyLog;
use occupancy_tracker::tracker::Tracker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("TRACKER_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_FILE.to_string());
    let cfg = AppConfig::load_or_default(&config_path)?;

    info!(
        mode = ?cfg.tracker.mode,
        site = %cfg.api.site,
        log_path = %cfg.tracker.log_path,
        "Occupancy tracker starting"
    );

    let source = ConcordiaClient::new(&cfg.api, cfg.api_key())?;
    let log = OccupancyLog::new(&cfg.tracker.log_path);
    let estimator = Estimator::new(cfg.estimate.variance);
    let rng = StdRng::from_entropy();

    match cfg.tracker.mode {
        RunMode::Once => {
            let mut tracker = Tracker::one_shot(
                Box::new(source),
                log,
                cfg.tracker.real_fetch_every_minutes,
                estimator,
                rng,
            );
            // Failures are already reported on stdout; they never change the exit code.
            let _ = tracker.tick().await;
        }
        RunMode::Continuous => {
            let mut tracker = Tracker::continuous(Box::new(source), log, estimator, rng);
            let period = Duration::from_secs(cfg.tracker.tick_interval_secs);
            tracker.run_until(period, tokio::signal::ctrl_c()).await;
            println!("Tracker stopped. Goodbye!");
        }
    }

    Ok(())
}

/// Initialise the `tracing` subscriber on stderr; stdout carries the tick lines.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("occupancy_tracker=info"));

    let json_logging = std::env::var("TRACKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
