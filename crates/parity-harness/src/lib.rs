//! Differential regression harness for lookup APIs
//!
//! Drives two running servers through the same sampled set of CVE or package
//! lookups and reports every response whose body differs between them.
//!
//! # Architecture
//!
//! ```text
//!  catalog ──► sampler ──► dispatcher ──┬──► baseline  :1325 ──┐
//!                          (N workers)  └──► candidate :1326 ──┤
//!                                                              ▼
//!                                             structural diff ──► recorder
//! ```
//!
//! Both servers must pass a health probe before any lookup is sent. A read
//! timeout skips the affected lookup; any other transport or parse failure
//! aborts the run. Mismatches are logged and written to disk, never treated
//! as failures.

pub mod case;
pub mod catalog;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod harness;
pub mod health;
pub mod recorder;
pub mod sample;

pub use case::{LookupKind, ReleaseKey, TestCase};
pub use catalog::{CatalogSource, FileCatalog, StaticCatalog};
pub use client::{Fetched, LookupClient};
pub use config::{HarnessConfig, HealthPolicy, RetryPolicy, TargetPair};
pub use dispatch::{ComparisonOutcome, Dispatcher, ReleaseReport, Verdict};
pub use error::{HarnessError, HarnessResult, Severity};
pub use harness::{AbandonedRelease, Harness, RunSummary};
pub use recorder::{ArtifactPaths, MismatchRecorder};
pub use sample::Sampler;
