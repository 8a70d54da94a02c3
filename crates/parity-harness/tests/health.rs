//! Readiness probe behaviour

mod common;

use common::{dead_url, spawn_target_healthy_from, test_config, MockResponse};
use parity_harness::{health, HarnessConfig, HarnessError, HealthPolicy, LookupClient};
use serde_json::json;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn clients(config: &HarnessConfig) -> (LookupClient, LookupClient) {
    (
        LookupClient::baseline(config).unwrap(),
        LookupClient::candidate(config).unwrap(),
    )
}

#[tokio::test]
async fn test_probe_succeeds_on_third_attempt() {
    let baseline = spawn_target_healthy_from(3, |_, _| MockResponse::json(json!({}))).await;
    let candidate = spawn_target_healthy_from(3, |_, _| MockResponse::json(json!({}))).await;
    let temp_dir = TempDir::new().unwrap();
    let config = HarnessConfig {
        health: HealthPolicy::default(),
        ..test_config(&baseline.url, &candidate.url, temp_dir.path())
    };
    let (base_client, cand_client) = clients(&config);

    let started = Instant::now();
    let attempts = health::probe(&base_client, &cand_client, &config.health)
        .await
        .unwrap();

    assert_eq!(attempts, 3);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(baseline.hits("health"), 3);
    assert_eq!(candidate.hits("health"), 3);
}

#[tokio::test]
async fn test_probe_gives_up_after_five_attempts() {
    let baseline =
        spawn_target_healthy_from(usize::MAX, |_, _| MockResponse::json(json!({}))).await;
    let candidate =
        spawn_target_healthy_from(usize::MAX, |_, _| MockResponse::json(json!({}))).await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&baseline.url, &candidate.url, temp_dir.path());
    let (base_client, cand_client) = clients(&config);

    let err = health::probe(&base_client, &cand_client, &config.health)
        .await
        .unwrap_err();

    assert!(
        matches!(err, HarnessError::TargetsUnreachable { attempts: 5, .. }),
        "{:?}",
        err
    );
    assert_eq!(baseline.hits("health"), 5);
    assert_eq!(candidate.hits("health"), 5);
}

#[tokio::test]
async fn test_probe_requires_both_targets() {
    let baseline = spawn_target_healthy_from(1, |_, _| MockResponse::json(json!({}))).await;
    let candidate_url = dead_url().await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&baseline.url, &candidate_url, temp_dir.path());
    let (base_client, cand_client) = clients(&config);

    let err = health::probe(&base_client, &cand_client, &config.health)
        .await
        .unwrap_err();

    match err {
        HarnessError::TargetsUnreachable { detail, .. } => {
            assert!(detail.starts_with("candidate"), "{}", detail);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(baseline.hits("health"), 5);
}

#[tokio::test]
async fn test_probe_needs_same_attempt() {
    // Baseline is up from the start, candidate only from its fourth check
    let baseline = spawn_target_healthy_from(1, |_, _| MockResponse::json(json!({}))).await;
    let candidate = spawn_target_healthy_from(4, |_, _| MockResponse::json(json!({}))).await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&baseline.url, &candidate.url, temp_dir.path());
    let (base_client, cand_client) = clients(&config);

    let attempts = health::probe(&base_client, &cand_client, &config.health)
        .await
        .unwrap();

    assert_eq!(attempts, 4);
    assert_eq!(baseline.hits("health"), 4);
}

#[tokio::test]
async fn test_check_timeout_comes_from_policy() {
    let responder = |_: &str, _: usize| {
        MockResponse::json(json!({"status": "ok"})).with_delay(Duration::from_secs(2))
    };
    let baseline = spawn_target_healthy_from(1, responder).await;
    let candidate = spawn_target_healthy_from(1, responder).await;
    let temp_dir = TempDir::new().unwrap();
    let config = HarnessConfig {
        health: HealthPolicy {
            attempts: 2,
            delay: Duration::from_millis(10),
            check_timeout: Duration::from_millis(100),
            path: "ready".to_string(),
        },
        ..test_config(&baseline.url, &candidate.url, temp_dir.path())
    };
    let (base_client, cand_client) = clients(&config);

    let started = Instant::now();
    let err = health::probe(&base_client, &cand_client, &config.health)
        .await
        .unwrap_err();

    assert!(
        matches!(err, HarnessError::TargetsUnreachable { attempts: 2, .. }),
        "{:?}",
        err
    );
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(baseline.hits("ready"), 2);
}
