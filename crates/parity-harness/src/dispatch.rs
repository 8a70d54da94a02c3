//! Concurrent comparison of test cases
//!
//! Every test case is one unit of work: fetch from the baseline, fetch from
//! the candidate, diff, and record the evidence on mismatch. Units run on a
//! bounded pool of tokio tasks and share nothing but the HTTP clients and the
//! artifact root, where each case owns a distinct directory.

use crate::case::{ReleaseKey, TestCase};
use crate::client::{Fetched, LookupClient};
use crate::error::{HarnessError, HarnessResult};
use crate::recorder::{ArtifactPaths, MismatchRecorder};
use parity_diff::{diff_values, DiffSet};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn, Instrument, Span};

/// What happened to one test case
#[derive(Debug)]
pub enum Verdict {
    /// Both targets returned equivalent bodies
    Match,
    /// The bodies differ; both were written to disk
    Mismatch {
        diff: DiffSet,
        baseline: Value,
        candidate: Value,
        artifacts: ArtifactPaths,
    },
    /// A target timed out; the case is dropped and the run continues
    Skipped { reason: String },
    /// The run cannot continue
    Fatal(HarnessError),
}

impl Verdict {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Verdict::Mismatch { .. })
    }
}

/// The single outcome of a test case
#[derive(Debug)]
pub struct ComparisonOutcome {
    pub case: TestCase,
    pub verdict: Verdict,
}

/// Tally of one release
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
    pub release: ReleaseKey,
    /// Identifiers in the catalog
    pub catalog_size: usize,
    /// Identifiers dispatched
    pub sampled: usize,
    pub matched: usize,
    /// Identifiers whose bodies differ
    pub mismatched: Vec<String>,
    /// Identifiers dropped after a read timeout
    pub skipped: Vec<String>,
}

impl ReleaseReport {
    pub fn new(release: ReleaseKey, catalog_size: usize, sampled: usize) -> Self {
        Self {
            release,
            catalog_size,
            sampled,
            matched: 0,
            mismatched: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Number of cases with an outcome so far
    pub fn completed(&self) -> usize {
        self.matched + self.mismatched.len() + self.skipped.len()
    }

    /// Fold one outcome into the tally, surfacing fatal outcomes as errors
    pub fn absorb(&mut self, outcome: ComparisonOutcome) -> HarnessResult<()> {
        let ComparisonOutcome { case, verdict } = outcome;
        match verdict {
            Verdict::Match => self.matched += 1,
            Verdict::Mismatch { .. } => self.mismatched.push(case.identifier),
            Verdict::Skipped { reason } => {
                warn!("Skipped {}: {}", case, reason);
                self.skipped.push(case.identifier);
            }
            Verdict::Fatal(err) => {
                error!("Failed to compare {}: {}", case, err);
                return Err(err);
            }
        }
        Ok(())
    }
}

struct CaseContext {
    baseline: LookupClient,
    candidate: LookupClient,
    recorder: MismatchRecorder,
}

/// Fans test cases out over a bounded pool of workers
#[derive(Clone)]
pub struct Dispatcher {
    context: Arc<CaseContext>,
    workers: usize,
}

impl Dispatcher {
    pub fn new(
        baseline: LookupClient,
        candidate: LookupClient,
        recorder: MismatchRecorder,
        workers: usize,
    ) -> Self {
        Self {
            context: Arc::new(CaseContext {
                baseline,
                candidate,
                recorder,
            }),
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn recorder(&self) -> &MismatchRecorder {
        &self.context.recorder
    }

    /// Compare a single test case end to end
    pub async fn compare(&self, case: TestCase) -> ComparisonOutcome {
        compare_case(&self.context, case).await
    }

    /// Compare every case of a release
    ///
    /// At most `workers` cases are in flight. The first fatal outcome aborts
    /// every in-flight case and is returned; nothing queued behind it starts.
    pub async fn dispatch(
        &self,
        release: ReleaseKey,
        catalog_size: usize,
        cases: Vec<TestCase>,
    ) -> HarnessResult<ReleaseReport> {
        let mut report = ReleaseReport::new(release, catalog_size, cases.len());
        let mut pending = cases.into_iter();
        let mut tasks = JoinSet::new();

        loop {
            while tasks.len() < self.workers {
                let Some(case) = pending.next() else { break };
                let context = Arc::clone(&self.context);
                tasks.spawn(
                    async move { compare_case(&context, case).await }.instrument(Span::current()),
                );
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let absorbed = joined
                .map_err(HarnessError::from)
                .and_then(|outcome| report.absorb(outcome));
            if let Err(err) = absorbed {
                tasks.abort_all();
                return Err(err);
            }
        }

        Ok(report)
    }
}

async fn compare_case(context: &CaseContext, case: TestCase) -> ComparisonOutcome {
    let verdict = match fetch_pair(context, &case).await {
        Ok((baseline, candidate)) => judge(context, &case, baseline.body, candidate.body).await,
        Err(err) if err.is_recoverable() => Verdict::Skipped {
            reason: err.to_string(),
        },
        Err(err) => Verdict::Fatal(err.in_case(&case)),
    };
    ComparisonOutcome { case, verdict }
}

/// Fetch from both targets concurrently
///
/// Returns as soon as either side fails fatally, dropping the other request.
/// A timeout on one side is only reported once the other side has finished,
/// so a fatal failure always outranks it.
async fn fetch_pair(context: &CaseContext, case: &TestCase) -> HarnessResult<(Fetched, Fetched)> {
    let path = case.request_path();
    let (baseline, candidate) = tokio::try_join!(
        fatal_first(context.baseline.fetch(&path)),
        fatal_first(context.candidate.fetch(&path))
    )?;
    Ok((baseline?, candidate?))
}

/// Lift fatal errors out so `try_join!` short-circuits on them only
async fn fatal_first(
    fetch: impl Future<Output = HarnessResult<Fetched>>,
) -> HarnessResult<HarnessResult<Fetched>> {
    match fetch.await {
        Err(err) if !err.is_recoverable() => Err(err),
        other => Ok(other),
    }
}

async fn judge(context: &CaseContext, case: &TestCase, baseline: Value, candidate: Value) -> Verdict {
    // Large list bodies make the diff CPU-bound
    let compared = tokio::task::spawn_blocking(move || {
        let diff = diff_values(&baseline, &candidate);
        (diff, baseline, candidate)
    })
    .await;
    let (diff, baseline, candidate) = match compared {
        Ok(compared) => compared,
        Err(err) => return Verdict::Fatal(HarnessError::from(err).in_case(case)),
    };
    if diff.is_empty() {
        debug!("Match for {}", case);
        return Verdict::Match;
    }

    warn!(
        "There is a difference between baseline and candidate for {} ({}):\n{}",
        case,
        case.request_path(),
        diff
    );

    match context.recorder.record(case, &baseline, &candidate).await {
        Ok(artifacts) => Verdict::Mismatch {
            diff,
            baseline,
            candidate,
            artifacts,
        },
        Err(err) => Verdict::Fatal(err.in_case(case)),
    }
}
