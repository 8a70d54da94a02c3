//! Common test utilities: mock lookup servers
//!
//! Each mock target is an axum router bound to an ephemeral port. Lookup
//! requests are answered by a responder closure; `/health` is answered by
//! the target itself so tests can control when it becomes ready.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parity_harness::{HarnessConfig, HealthPolicy, RetryPolicy, TargetPair};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a mock target sends back for one request
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!(r#"{{"message":"status {}"}}"#, status),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Responder for lookup requests: (path without leading '/', hit number) -> response
pub type Responder = Arc<dyn Fn(&str, usize) -> MockResponse + Send + Sync>;

#[derive(Clone)]
struct MockState {
    responder: Responder,
    /// Health requests before this hit number (1-based) fail with 503
    healthy_from: usize,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// A running mock lookup server
pub struct MockTarget {
    pub url: String,
    state: MockState,
}

impl MockTarget {
    /// Number of requests received for a path (without leading '/')
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Number of lookup requests received, excluding health checks
    pub fn lookup_hits(&self) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.as_str() != "health")
            .map(|(_, count)| count)
            .sum()
    }

    /// Highest number of lookups handled at the same time
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Start a target that is healthy immediately
pub async fn spawn_target<F>(responder: F) -> MockTarget
where
    F: Fn(&str, usize) -> MockResponse + Send + Sync + 'static,
{
    spawn_target_healthy_from(1, responder).await
}

/// Start a target whose health endpoint succeeds from the given hit onwards
pub async fn spawn_target_healthy_from<F>(healthy_from: usize, responder: F) -> MockTarget
where
    F: Fn(&str, usize) -> MockResponse + Send + Sync + 'static,
{
    let state = MockState {
        responder: Arc::new(responder),
        healthy_from,
        hits: Arc::new(Mutex::new(HashMap::new())),
        in_flight: Arc::new(AtomicUsize::new(0)),
        max_in_flight: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().fallback(handle).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockTarget {
        url: format!("http://{}", addr),
        state,
    }
}

async fn handle(State(state): State<MockState>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/').to_string();
    let hit = {
        let mut hits = state.hits.lock().unwrap();
        let count = hits.entry(path.clone()).or_insert(0);
        *count += 1;
        *count
    };

    if path == "health" {
        return if hit >= state.healthy_from {
            (StatusCode::OK, r#"{"status":"ok"}"#).into_response()
        } else {
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        };
    }

    let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let response = (state.responder)(&path, hit);
    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    (
        StatusCode::from_u16(response.status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
        .into_response()
}

/// A URL on which nothing listens
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config pointing at two targets with fast retries and probes
pub fn test_config(baseline: &str, candidate: &str, artifact_dir: &Path) -> HarnessConfig {
    HarnessConfig {
        targets: TargetPair::new(baseline, candidate),
        artifact_dir: artifact_dir.to_path_buf(),
        catalog_dir: artifact_dir.join("catalog"),
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            backoff_base: Duration::from_millis(10),
            ..RetryPolicy::default()
        },
        health: HealthPolicy {
            delay: Duration::from_millis(20),
            ..HealthPolicy::default()
        },
        workers: 4,
        sample_rate: 1.0,
        seed: None,
    }
}

/// Every regular file below a directory
pub fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}
