//! Error types for comparison runs

use crate::case::TestCase;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// How far a failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Only the current test case is lost
    Case,
    /// The current release is abandoned, other releases still run
    Release,
    /// The whole run is invalid
    Run,
}

/// Errors that can occur while comparing the two targets
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No identifier list exists for the requested tuple
    #[error("catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    /// Failed to read an identifier list
    #[error("failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The health probe never saw both targets up
    #[error("targets unreachable after {attempts} health probe attempts: {detail}")]
    TargetsUnreachable { attempts: u32, detail: String },

    /// Transport-level failure reaching a target
    #[error("failed to connect to {target} ({url}): {source}")]
    Connection {
        target: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Connection established but no response in time
    #[error("read timeout from {target} ({url})")]
    ReadTimeout { target: String, url: String },

    /// Every attempt answered with a retryable status
    #[error("{target} ({url}) answered {status} on all {attempts} attempts")]
    RetriesExhausted {
        target: String,
        url: String,
        status: u16,
        attempts: u32,
    },

    /// Response body is not valid JSON
    #[error("invalid JSON body from {target} ({url}): {source}")]
    InvalidBody {
        target: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Any other failure while requesting
    #[error("request to {target} ({url}) failed: {source}")]
    Request {
        target: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to build the HTTP client
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Failed to write mismatch evidence
    #[error("failed to write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize mismatch evidence
    #[error("failed to serialize artifact {path}: {source}")]
    ArtifactEncode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A worker task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Sample rate outside (0, 1]
    #[error("sample rate must be in (0, 1], got {rate}")]
    InvalidSampleRate { rate: f64 },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    /// A fatal failure while processing one test case
    #[error("{case}: {source}")]
    CaseFailed {
        case: Box<TestCase>,
        #[source]
        source: Box<HarnessError>,
    },
}

impl HarnessError {
    /// How far this failure reaches
    pub fn severity(&self) -> Severity {
        match self {
            HarnessError::ReadTimeout { .. } => Severity::Case,
            HarnessError::CatalogNotFound { .. } | HarnessError::CatalogRead { .. } => {
                Severity::Release
            }
            HarnessError::CaseFailed { source, .. } => source.severity(),
            _ => Severity::Run,
        }
    }

    /// Whether the run may continue past this failure
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Case
    }

    pub(crate) fn in_case(self, case: &TestCase) -> Self {
        HarnessError::CaseFailed {
            case: Box::new(case.clone()),
            source: Box::new(self),
        }
    }
}
