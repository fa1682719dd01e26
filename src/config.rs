//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so a missing file runs the tracker with the stock
//! Concordia settings. The API key is referenced by env-var name in the
//! config and resolved at runtime.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default config file path, overridable with `TRACKER_CONFIG`.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub api: ApiConfig,
    pub estimate: EstimateConfig,
}

/// How the binary drives ticks.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One tick per invocation, for an external scheduler.
    Once,
    /// Tick forever at a fixed interval until Ctrl-C.
    Continuous,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackerConfig {
    pub mode: RunMode,
    pub log_path: String,
    pub tick_interval_secs: u64,
    /// One-shot mode fetches real data when the minute is a multiple of this.
    pub real_fetch_every_minutes: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Once,
            log_path: "library_stats.csv".to_string(),
            tick_interval_secs: 300,
            real_fetch_every_minutes: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub username: String,
    pub api_key_env: String,
    pub site: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://opendata.concordia.ca/API/v1/library/occupancy/".to_string(),
            username: "974".to_string(),
            api_key_env: "CONCORDIA_API_KEY".to_string(),
            site: "Webster".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EstimateConfig {
    /// Estimates multiply the last count by a factor in `[1 - variance, 1 + variance]`.
    pub variance: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self { variance: 0.05 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            let cfg = Self::load(path)?;
            info!(path, "Configuration loaded");
            Ok(cfg)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tracker.tick_interval_secs == 0 {
            bail!("tracker.tick_interval_secs must be greater than zero");
        }
        if self.tracker.real_fetch_every_minutes == 0 {
            bail!("tracker.real_fetch_every_minutes must be greater than zero");
        }
        let v = self.estimate.variance;
        if !(0.0..1.0).contains(&v) {
            bail!("estimate.variance must be in [0, 1), got {v}");
        }
        Ok(())
    }

    /// Resolve the API key from the environment.
    ///
    /// A missing key is not fatal: requests go out with an empty password
    /// and the server rejects them on every real fetch.
    pub fn api_key(&self) -> SecretString {
        match std::env::var(&self.api.api_key_env) {
            Ok(key) => SecretString::new(key),
            Err(_) => {
                warn!(
                    env = %self.api.api_key_env,
                    "API key not set; real fetches will fail authentication"
                );
                SecretString::new(String::new())
            }
        }
    }
}
