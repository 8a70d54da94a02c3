//! Retry, timeout and failure classification of the lookup client

mod common;

use common::{dead_url, spawn_target, test_config, MockResponse};
use parity_harness::{HarnessConfig, HarnessError, LookupClient, Severity};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn client_for(url: &str, config: &HarnessConfig) -> LookupClient {
    LookupClient::new("baseline", url, config).unwrap()
}

#[tokio::test]
async fn test_retries_until_success() {
    let target = spawn_target(|_, hit| {
        if hit < 5 {
            MockResponse::status(503)
        } else {
            MockResponse::json(json!({"cveID": "CVE-2021-3711"}))
        }
    })
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&target.url, &target.url, temp_dir.path());

    let fetched = client_for(&target.url, &config)
        .fetch("cves/debian/11/CVE-2021-3711")
        .await
        .unwrap();

    assert_eq!(fetched.attempts, 5);
    assert_eq!(fetched.status.as_u16(), 200);
    assert_eq!(fetched.body, json!({"cveID": "CVE-2021-3711"}));
    assert_eq!(target.hits("cves/debian/11/CVE-2021-3711"), 5);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let target = spawn_target(|_, _| MockResponse::status(503)).await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&target.url, &target.url, temp_dir.path());

    let err = client_for(&target.url, &config)
        .fetch("cves/debian/11/CVE-1")
        .await
        .unwrap_err();

    match &err {
        HarnessError::RetriesExhausted {
            status, attempts, ..
        } => {
            assert_eq!(*status, 503);
            assert_eq!(*attempts, 5);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.severity(), Severity::Run);
    assert_eq!(target.hits("cves/debian/11/CVE-1"), 5);
}

#[tokio::test]
async fn test_gateway_timeout_is_retried() {
    let target = spawn_target(|_, hit| {
        if hit == 1 {
            MockResponse::status(504)
        } else {
            MockResponse::json(json!([]))
        }
    })
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&target.url, &target.url, temp_dir.path());

    let fetched = client_for(&target.url, &config)
        .fetch("packs/alpine/3.16/busybox")
        .await
        .unwrap();
    assert_eq!(fetched.attempts, 2);
}

#[tokio::test]
async fn test_non_retryable_status_is_returned() {
    let target = spawn_target(|_, _| MockResponse::raw(404, r#"{"error":"not found"}"#)).await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&target.url, &target.url, temp_dir.path());

    let fetched = client_for(&target.url, &config)
        .fetch("packs/debian/11/missing")
        .await
        .unwrap();

    assert_eq!(fetched.attempts, 1);
    assert_eq!(fetched.status.as_u16(), 404);
    assert_eq!(fetched.body, json!({"error": "not found"}));
}

#[tokio::test]
async fn test_invalid_json_is_fatal() {
    let target = spawn_target(|_, _| MockResponse::raw(200, "<html>oops</html>")).await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&target.url, &target.url, temp_dir.path());

    let err = client_for(&target.url, &config)
        .fetch("cves/debian/11/CVE-1")
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::InvalidBody { .. }), "{:?}", err);
    assert_eq!(err.severity(), Severity::Run);
}

#[tokio::test]
async fn test_read_timeout_is_recoverable() {
    let target = spawn_target(|_, _| {
        MockResponse::json(json!({})).with_delay(Duration::from_millis(1500))
    })
    .await;
    let temp_dir = TempDir::new().unwrap();
    let config = HarnessConfig {
        read_timeout: Duration::from_millis(300),
        ..test_config(&target.url, &target.url, temp_dir.path())
    };

    let err = client_for(&target.url, &config)
        .fetch("cves/debian/11/CVE-1")
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::ReadTimeout { .. }), "{:?}", err);
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_connection_refused_is_fatal() {
    let url = dead_url().await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&url, &url, temp_dir.path());

    let err = client_for(&url, &config)
        .fetch("cves/debian/11/CVE-1")
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Connection { .. }), "{:?}", err);
    assert_eq!(err.severity(), Severity::Run);
}
