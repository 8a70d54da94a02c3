//! Readiness probe for both targets

use crate::client::LookupClient;
use crate::config::HealthPolicy;
use crate::error::{HarnessError, HarnessResult};
use tracing::{debug, info};

/// Wait until both targets answer their liveness endpoint
///
/// Both targets are checked in every attempt and must succeed in the same
/// attempt. Returns the number of attempts used. Fails with
/// [`HarnessError::TargetsUnreachable`] once `policy.attempts` are spent.
pub async fn probe(
    baseline: &LookupClient,
    candidate: &LookupClient,
    policy: &HealthPolicy,
) -> HarnessResult<u32> {
    let mut last_failure = String::new();

    for attempt in 1..=policy.attempts {
        let (base, cand) = tokio::join!(
            baseline.is_healthy(&policy.path, policy.check_timeout),
            candidate.is_healthy(&policy.path, policy.check_timeout)
        );

        match (base, cand) {
            (Ok(()), Ok(())) => {
                info!(
                    "Targets ready after {} attempt(s): baseline={} candidate={}",
                    attempt,
                    baseline.base_url(),
                    candidate.base_url()
                );
                return Ok(attempt);
            }
            (base, cand) => {
                last_failure = [(baseline.name(), base), (candidate.name(), cand)]
                    .into_iter()
                    .filter_map(|(name, result)| result.err().map(|e| format!("{}: {}", name, e)))
                    .collect::<Vec<_>>()
                    .join("; ");
                debug!(attempt, "Health probe failed: {}", last_failure);
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(HarnessError::TargetsUnreachable {
        attempts: policy.attempts,
        detail: last_failure,
    })
}
