//! Random-variance occupancy estimator.
//!
//! Between real polls the tracker extrapolates from the last known count by
//! a multiplier drawn uniformly from `[1 - variance, 1 + variance]`.

use rand::Rng;

use crate::types::clamp_occupancy;

/// Absorbs f64 representation error at the interval bounds
/// (`100.0 * 0.95` is `94.999...`) before truncation.
const TRUNCATION_SLACK: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    low: f64,
    high: f64,
}

impl Estimator {
    pub fn new(variance: f64) -> Self {
        let variance = variance.clamp(0.0, 1.0);
        Self {
            low: 1.0 - variance,
            high: 1.0 + variance,
        }
    }

    /// Estimate the current count from `last_count`.
    pub fn estimate<R: Rng + ?Sized>(&self, last_count: u32, rng: &mut R) -> u32 {
        if last_count == 0 {
            return 0;
        }
        let multiplier = rng.gen_range(self.low..=self.high);
        clamp_occupancy(last_count as f64 * multiplier + TRUNCATION_SLACK)
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(0.05)
    }
}
