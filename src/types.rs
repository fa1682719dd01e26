//! Core domain types for the occupancy tracker.
//!
//! Readings, log rows, tick reports, and the domain error enum shared by
//! the source, storage, and tracker modules.

use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout shared by real and estimated rows.
///
/// The occupancy API reports `2026-02-25 08:25:00.000`; estimates carry a
/// literal `.000` so both are indistinguishable format-wise.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S.000";

/// Format a wall-clock instant the way log rows expect it.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Clock format used in the per-tick console line.
pub fn format_clock(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Reading kind
// ---------------------------------------------------------------------------

/// Whether a value came from the API or was synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingKind {
    Real,
    Estimated,
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingKind::Real => write!(f, "Real"),
            ReadingKind::Estimated => write!(f, "Estimated"),
        }
    }
}

impl FromStr for ReadingKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Real" => Ok(ReadingKind::Real),
            "Estimated" => Ok(ReadingKind::Estimated),
            other => Err(TrackerError::InvalidRow(format!("unknown reading type '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Readings and rows
// ---------------------------------------------------------------------------

/// One fetched or estimated occupancy value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// `YYYY-MM-DD HH:MM:SS.000`. Real readings keep the server's string verbatim.
    pub timestamp: String,
    pub occupancy: u32,
    pub kind: ReadingKind,
}

impl Reading {
    pub fn real(timestamp: impl Into<String>, occupancy: u32) -> Self {
        Self {
            timestamp: timestamp.into(),
            occupancy,
            kind: ReadingKind::Real,
        }
    }

    pub fn estimated(timestamp: impl Into<String>, occupancy: u32) -> Self {
        Self {
            timestamp: timestamp.into(),
            occupancy,
            kind: ReadingKind::Estimated,
        }
    }
}

/// A data row of the occupancy log.
///
/// `kind` is `None` only for rows written in the older two-column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub timestamp: String,
    pub occupancy: u32,
    pub kind: Option<ReadingKind>,
}

impl From<&Reading> for LogRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp.clone(),
            occupancy: r.occupancy,
            kind: Some(r.kind),
        }
    }
}

/// Convert a raw floating-point count to a stored occupancy:
/// truncate toward zero, clamp negatives to 0.
pub fn clamp_occupancy(raw: f64) -> u32 {
    let truncated = raw.trunc();
    if truncated <= 0.0 {
        0
    } else if truncated >= u32::MAX as f64 {
        u32::MAX
    } else {
        truncated as u32
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Outcome of one successful tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub reading: Reading,
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success ({}): {} recorded.",
            self.reading.kind, self.reading.occupancy
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Everything that can make a tick fail.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Occupancy API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Occupancy API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Missing field in API response: {0}")]
    MissingField(String),

    #[error("Malformed API response: {0}")]
    Malformed(String),

    #[error("Log file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid log row: {0}")]
    InvalidRow(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
