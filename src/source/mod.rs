//! Occupancy data sources.
//!
//! Defines the `OccupancySource` trait and the Concordia open-data client
//! that implements it. The tracker only talks to the trait, so tests can
//! swap in a mock.

pub mod concordia;

use async_trait::async_trait;

use crate::types::{Reading, TrackerResult};

/// Abstraction over the live occupancy feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OccupancySource: Send + Sync {
    /// Fetch the current reading for the configured site.
    ///
    /// Transport errors, non-2xx statuses, and missing or malformed fields
    /// are all errors; no partial readings are returned.
    async fn fetch(&self) -> TrackerResult<Reading>;
}
