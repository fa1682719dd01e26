//! Tracker — one decide → fetch-or-estimate → append cycle per tick.
//!
//! Two flavours share the same tick:
//! - one-shot: real fetch on wall-clock multiples of the fetch period,
//!   estimates based on the last row of the log, nothing kept in memory;
//! - continuous: real fetch every other tick, estimates based on the last
//!   successful real value carried in memory.
//!
//! Every tick failure stops at the tick boundary. Nothing is retried and a
//! failed tick appends no row.

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::estimate::Estimator;
use crate::schedule::FetchSchedule;
use crate::source::OccupancySource;
use crate::storage::OccupancyLog;
use crate::types::{format_clock, format_timestamp, Reading, TickReport, TrackerResult};

pub struct Tracker {
    source: Box<dyn OccupancySource>,
    log: OccupancyLog,
    schedule: FetchSchedule,
    estimator: Estimator,
    rng: StdRng,
    /// Carried last real count. `None` in one-shot mode, which reads the log tail instead.
    last_real: Option<u32>,
}

impl Tracker {
    /// Tracker for a single scheduler-driven invocation.
    pub fn one_shot(
        source: Box<dyn OccupancySource>,
        log: OccupancyLog,
        real_fetch_every_minutes: u32,
        estimator: Estimator,
        rng: StdRng,
    ) -> Self {
        Self {
            source,
            log,
            schedule: FetchSchedule::wall_clock(real_fetch_every_minutes),
            estimator,
            rng,
            last_real: None,
        }
    }

    /// Tracker for the long-running loop, seeded from the latest real row on disk.
    pub fn continuous(
        source: Box<dyn OccupancySource>,
        log: OccupancyLog,
        estimator: Estimator,
        rng: StdRng,
    ) -> Self {
        let seed = match log.last_real_count() {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    error = %e,
                    path = %log.path().display(),
                    "Unreadable log, last real count starts at 0"
                );
                0
            }
        };
        info!(last_real = seed, path = %log.path().display(), "Seeded last real count from log");
        Self {
            source,
            log,
            schedule: FetchSchedule::alternating(),
            estimator,
            rng,
            last_real: Some(seed),
        }
    }

    pub fn last_real(&self) -> Option<u32> {
        self.last_real
    }

    pub fn log(&self) -> &OccupancyLog {
        &self.log
    }

    /// Run one tick at the current wall-clock time and print its status line.
    pub async fn tick(&mut self) -> TrackerResult<TickReport> {
        let now = Local::now();
        let result = self.run_tick(now).await;
        println!("{}", status_line(&Local::now(), &result));
        result
    }

    /// Tick repeatedly until `shutdown` resolves, returning the number of ticks run.
    ///
    /// The first tick runs immediately; each later one starts `period` after the
    /// previous tick finished. `shutdown` is checked between ticks, so a tick in
    /// progress always completes.
    pub async fn run_until<F: Future>(&mut self, period: Duration, shutdown: F) -> u64 {
        tokio::pin!(shutdown);
        let mut delay = Duration::ZERO;
        let mut ticks = 0;

        info!(
            interval_secs = period.as_secs(),
            "Entering tracking loop. Press Ctrl+C to stop."
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(ticks, "Shutdown signal received.");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = self.tick().await;
                    ticks += 1;
                }
            }
            delay = period;
        }
        ticks
    }

    /// Run one tick as if the wall clock read `now`.
    pub async fn run_tick(&mut self, now: DateTime<Local>) -> TrackerResult<TickReport> {
        self.log.ensure_header()?;

        let reading = if self.schedule.is_real_fetch(&now) {
            self.fetch_real().await?
        } else {
            self.estimate(&now)?
        };

        self.log.append(&reading)?;
        info!(
            kind = %reading.kind,
            occupancy = reading.occupancy,
            timestamp = %reading.timestamp,
            "Tick recorded"
        );
        Ok(TickReport { reading })
    }

    async fn fetch_real(&mut self) -> TrackerResult<Reading> {
        match self.source.fetch().await {
            Ok(reading) => {
                if self.last_real.is_some() {
                    self.last_real = Some(reading.occupancy);
                }
                Ok(reading)
            }
            Err(e) => {
                error!(error = %e, last_real = ?self.last_real, "Real fetch failed");
                Err(e)
            }
        }
    }

    fn estimate(&mut self, now: &DateTime<Local>) -> TrackerResult<Reading> {
        let last = match self.last_real {
            Some(carried) => carried,
            None => self.log.last_count()?,
        };
        let occupancy = self.estimator.estimate(last, &mut self.rng);
        Ok(Reading::estimated(format_timestamp(now), occupancy))
    }
}

/// The single human-readable line printed for every tick.
pub fn status_line(at: &DateTime<Local>, result: &TrackerResult<TickReport>) -> String {
    match result {
        Ok(report) => format!("[{}] {report}", format_clock(at)),
        Err(e) => format!("[{}] Error: {e}", format_clock(at)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
