//! Configuration for comparison runs

use crate::error::{HarnessError, HarnessResult};
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default baseline server (the implementation being replaced)
pub const DEFAULT_BASELINE_URL: &str = "http://127.0.0.1:1325";
/// Default candidate server (the implementation under test)
pub const DEFAULT_CANDIDATE_URL: &str = "http://127.0.0.1:1326";
pub const DEFAULT_SAMPLE_RATE: f64 = 0.01;

/// Base URLs of the two servers, fixed for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPair {
    pub baseline: String,
    pub candidate: String,
}

impl TargetPair {
    pub fn new(baseline: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            baseline: baseline.into(),
            candidate: candidate.into(),
        }
    }
}

impl Default for TargetPair {
    fn default() -> Self {
        Self::new(DEFAULT_BASELINE_URL, DEFAULT_CANDIDATE_URL)
    }
}

/// Per-request retry policy, applied independently to each target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff_base: Duration,
    /// Statuses that trigger another attempt
    pub retryable_statuses: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            retryable_statuses: [503, 504].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Readiness check performed once before any test case is dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPolicy {
    pub attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
    /// Time allowed for a single liveness request
    pub check_timeout: Duration,
    /// Liveness endpoint, relative to each base URL
    pub path: String,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
            check_timeout: Duration::from_secs(5),
            path: "health".to_string(),
        }
    }
}

/// Configuration for a comparison run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub targets: TargetPair,
    /// Root of the identifier lists
    pub catalog_dir: PathBuf,
    /// Root of the mismatch artifacts
    pub artifact_dir: PathBuf,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
    pub health: HealthPolicy,
    /// Number of test cases processed in parallel
    pub workers: usize,
    /// Fraction of each catalog to test, in (0, 1]
    pub sample_rate: f64,
    /// Fixed seed for reproducible sampling
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            targets: TargetPair::default(),
            catalog_dir: PathBuf::from("integration"),
            artifact_dir: PathBuf::from("integration").join("diff"),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            health: HealthPolicy::default(),
            workers: default_workers(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            seed: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables
    ///
    /// - `PARITY_BASELINE_URL`: baseline server (default: http://127.0.0.1:1325)
    /// - `PARITY_CANDIDATE_URL`: candidate server (default: http://127.0.0.1:1326)
    /// - `PARITY_CATALOG_DIR`: identifier lists (default: integration)
    /// - `PARITY_ARTIFACT_DIR`: mismatch dumps (default: integration/diff)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let catalog_dir = env::var("PARITY_CATALOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_dir);
        let artifact_dir = env::var("PARITY_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| catalog_dir.join("diff"));

        Self {
            targets: TargetPair::new(
                env::var("PARITY_BASELINE_URL").unwrap_or(defaults.targets.baseline),
                env::var("PARITY_CANDIDATE_URL").unwrap_or(defaults.targets.candidate),
            ),
            catalog_dir,
            artifact_dir,
            ..defaults
        }
    }

    /// Reject values that would make the run meaningless
    pub fn validate(&self) -> HarnessResult<()> {
        if !(self.sample_rate > 0.0 && self.sample_rate <= 1.0) {
            return Err(HarnessError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.health.attempts == 0 {
            return Err(invalid("health.attempts", "must be at least 1"));
        }
        if self.health.check_timeout.is_zero() {
            return Err(invalid("health.check_timeout", "must be positive"));
        }
        for (key, url) in [
            ("targets.baseline", &self.targets.baseline),
            ("targets.candidate", &self.targets.candidate),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(invalid(key, &format!("'{}' is not a valid URL", url)));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> HarnessError {
    HarnessError::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Worker count when none is configured
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
