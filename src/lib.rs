//! Library occupancy tracker.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod source;
pub mod estimate;
pub mod schedule;
pub mod storage;
pub mod tracker;
