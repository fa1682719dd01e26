//! Real-fetch trigger policies.
//!
//! Decides, per tick, whether the tracker calls the API or estimates.

use chrono::{DateTime, Timelike, TimeZone};

/// Per-tick decision between a real fetch and an estimate.
#[derive(Debug, Clone)]
pub enum FetchSchedule {
    /// Real fetch when the wall-clock minute is a multiple of `every_minutes`.
    WallClock { every_minutes: u32 },
    /// Real fetch on every other tick, starting with a real one.
    Alternating { next_is_real: bool },
}

impl FetchSchedule {
    pub fn wall_clock(every_minutes: u32) -> Self {
        FetchSchedule::WallClock {
            every_minutes: every_minutes.max(1),
        }
    }

    pub fn alternating() -> Self {
        FetchSchedule::Alternating { next_is_real: true }
    }

    /// Decide for the tick happening at `now`. Alternating schedules flip.
    pub fn is_real_fetch<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        match self {
            FetchSchedule::WallClock { every_minutes } => now.minute() % *every_minutes == 0,
            FetchSchedule::Alternating { next_is_real } => {
                let real = *next_is_real;
                *next_is_real = !real;
                real
            }
        }
    }
}
