//! In-process stand-in for the occupancy API.
//!
//! Serves a fixed status and body on the occupancy path and records the
//! `Authorization` header of every request.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use occupancy_tracker::config::ApiConfig;

pub const OCCUPANCY_PATH: &str = "/API/v1/library/occupancy/";

pub const WEBSTER_37: &str =
    r#"{"Webster": {"Occupancy": "37.0", "LastRecordTime": "2026-02-25 08:25:00.000"}, "Vanier": {"Occupancy": "12.0", "LastRecordTime": "2026-02-25 08:25:00.000"}}"#;

/// `974:test-key`, base64-encoded.
pub const EXPECTED_AUTH: &str = "Basic OTc0OnRlc3Qta2V5";

struct Reply {
    status: StatusCode,
    body: String,
    auth_seen: Mutex<Vec<Option<String>>>,
}

pub struct MockApi {
    pub base_url: String,
    reply: Arc<Reply>,
}

impl MockApi {
    /// Start a server on an ephemeral port answering every request with `status` and `body`.
    pub async fn start(status: StatusCode, body: &str) -> Self {
        let reply = Arc::new(Reply {
            status,
            body: body.to_string(),
            auth_seen: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(OCCUPANCY_PATH, get(occupancy))
            .with_state(reply.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock API");
        let addr = listener.local_addr().expect("mock API address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock API server");
        });

        Self {
            base_url: format!("http://{addr}"),
            reply,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            url: format!("{}{OCCUPANCY_PATH}", self.base_url),
            timeout_secs: 5,
            ..ApiConfig::default()
        }
    }

    pub fn hits(&self) -> usize {
        self.reply.auth_seen.lock().unwrap().len()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.reply.auth_seen.lock().unwrap().clone()
    }
}

async fn occupancy(State(reply): State<Arc<Reply>>, headers: HeaderMap) -> (StatusCode, String) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    reply.auth_seen.lock().unwrap().push(auth);
    (reply.status, reply.body.clone())
}

/// A unique log path under the system temp dir.
pub fn temp_log_path() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("occupancy_it_{}.csv", uuid::Uuid::new_v4()));
    p
}

/// An API config pointing at a port nothing listens on.
pub fn unreachable_api() -> ApiConfig {
    ApiConfig {
        url: format!("http://127.0.0.1:9{OCCUPANCY_PATH}"),
        timeout_secs: 2,
        ..ApiConfig::default()
    }
}
