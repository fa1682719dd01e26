//! Concordia open-data library occupancy client.
//!
//! API: `GET /API/v1/library/occupancy/`
//! Auth: HTTP basic, numeric user id + API key.
//! Response: object keyed by library name, e.g.
//! `{"Webster": {"Occupancy": "37.0", "LastRecordTime": "2026-02-25 08:25:00.000"}}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::OccupancySource;
use crate::config::ApiConfig;
use crate::types::{clamp_occupancy, Reading, TrackerError, TrackerResult};

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SiteOccupancy {
    #[serde(rename = "Occupancy", default)]
    occupancy: Option<OccupancyValue>,
    #[serde(rename = "LastRecordTime", default)]
    last_record_time: Option<String>,
}

/// The API sends occupancy as a numeric string; accept plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OccupancyValue {
    Text(String),
    Number(f64),
}

impl OccupancyValue {
    fn as_f64(&self) -> TrackerResult<f64> {
        let value = match self {
            OccupancyValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                TrackerError::Malformed(format!("Occupancy is not a number: '{s}'"))
            })?,
            OccupancyValue::Number(n) => *n,
        };
        if !value.is_finite() {
            return Err(TrackerError::Malformed(format!("Occupancy is not finite: {value}")));
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ConcordiaClient {
    http: Client,
    url: String,
    username: String,
    api_key: SecretString,
    site: String,
}

impl ConcordiaClient {
    pub fn new(api: &ApiConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("occupancy-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for the occupancy API")?;

        Ok(Self {
            http,
            url: api.url.clone(),
            username: api.username.clone(),
            api_key,
            site: api.site.clone(),
        })
    }

    /// Extract the reading for `site` from a raw response body.
    pub fn parse_reading(body: &str, site: &str) -> TrackerResult<Reading> {
        let mut sites: HashMap<String, serde_json::Value> = serde_json::from_str(body)
            .map_err(|e| TrackerError::Malformed(format!("expected a JSON object: {e}")))?;

        let entry = sites
            .remove(site)
            .ok_or_else(|| TrackerError::MissingField(site.to_string()))?;
        let entry: SiteOccupancy = serde_json::from_value(entry)
            .map_err(|e| TrackerError::Malformed(format!("{site}: {e}")))?;

        let occupancy = entry
            .occupancy
            .ok_or_else(|| TrackerError::MissingField(format!("{site}.Occupancy")))?
            .as_f64()?;
        let timestamp = entry
            .last_record_time
            .ok_or_else(|| TrackerError::MissingField(format!("{site}.LastRecordTime")))?;

        Ok(Reading::real(timestamp, clamp_occupancy(occupancy)))
    }
}

#[async_trait]
impl OccupancySource for ConcordiaClient {
    async fn fetch(&self) -> TrackerResult<Reading> {
        debug!(url = %self.url, site = %self.site, "Fetching occupancy");

        let resp = self
            .http
            .get(&self.url)
            .basic_auth(&self.username, Some(self.api_key.expose_secret()))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body: error_body(resp.text().await),
            });
        }

        let body = resp.text().await?;
        let reading = Self::parse_reading(&body, &self.site)?;
        debug!(
            occupancy = reading.occupancy,
            timestamp = %reading.timestamp,
            "Occupancy fetched"
        );
        Ok(reading)
    }
}

/// Body text for a `Status` error; a body that can't be read is named as such.
fn error_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    match body {
        Ok(text) => text,
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
