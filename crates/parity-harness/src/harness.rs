//! Run controller: probe, then compare release by release

use crate::case::ReleaseKey;
use crate::catalog::CatalogSource;
use crate::client::LookupClient;
use crate::config::HarnessConfig;
use crate::dispatch::{Dispatcher, ReleaseReport};
use crate::error::{HarnessResult, Severity};
use crate::health;
use crate::recorder::MismatchRecorder;
use crate::sample::Sampler;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

/// A release that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct AbandonedRelease {
    pub release: ReleaseKey,
    pub reason: String,
}

/// Result of a complete run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub releases: Vec<ReleaseReport>,
    pub abandoned: Vec<AbandonedRelease>,
}

impl RunSummary {
    /// Whether every requested release was processed
    ///
    /// Mismatches do not make a run incomplete.
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty()
    }

    pub fn total_mismatches(&self) -> usize {
        self.releases.iter().map(|r| r.mismatched.len()).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.releases.iter().map(|r| r.skipped.len()).sum()
    }

    /// Log one line per release and a total
    pub fn log_summary(&self) {
        for report in &self.releases {
            info!(
                "{}: {} sampled of {}, {} matched, {} mismatched, {} skipped",
                report.release,
                report.sampled,
                report.catalog_size,
                report.matched,
                report.mismatched.len(),
                report.skipped.len()
            );
        }
        for abandoned in &self.abandoned {
            error!("{}: abandoned ({})", abandoned.release, abandoned.reason);
        }
        info!(
            "Results: {} release(s) compared, {} abandoned, {} mismatch(es), {} skipped",
            self.releases.len(),
            self.abandoned.len(),
            self.total_mismatches(),
            self.total_skipped()
        );
    }
}

/// Drives both targets through the sampled catalogs
pub struct Harness {
    config: HarnessConfig,
    catalog: Arc<dyn CatalogSource>,
    sampler: Sampler,
    baseline: LookupClient,
    candidate: LookupClient,
    dispatcher: Dispatcher,
}

impl Harness {
    /// Create a harness from a validated config
    pub fn new(config: HarnessConfig, catalog: Arc<dyn CatalogSource>) -> HarnessResult<Self> {
        config.validate()?;

        let sampler = Sampler::new(config.sample_rate)?.with_seed(config.seed);
        let baseline = LookupClient::baseline(&config)?;
        let candidate = LookupClient::candidate(&config)?;
        let dispatcher = Dispatcher::new(
            baseline.clone(),
            candidate.clone(),
            MismatchRecorder::new(&config.artifact_dir),
            config.workers,
        );

        Ok(Self {
            config,
            catalog,
            sampler,
            baseline,
            candidate,
            dispatcher,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Wait for both targets, failing the run if they never come up
    pub async fn wait_for_targets(&self) -> HarnessResult<u32> {
        health::probe(&self.baseline, &self.candidate, &self.config.health).await
    }

    /// Compare one release: load, sample, reset artifacts, dispatch
    pub async fn run_release(&self, release: &ReleaseKey) -> HarnessResult<ReleaseReport> {
        let span = info_span!(
            "release",
            kind = %release.kind,
            family = %release.family,
            release = %release.release,
            arch = ?release.arch
        );

        async {
            let catalog = self.catalog.load(release).await?;
            let sampled = self.sampler.sample(&catalog);
            info!(
                "Comparing {} of {} identifiers (rate {}) with {} workers",
                sampled.len(),
                catalog.len(),
                self.sampler.rate(),
                self.dispatcher.workers()
            );

            self.dispatcher.recorder().reset(release).await?;

            let cases = sampled.into_iter().map(|id| release.case(id)).collect();
            self.dispatcher
                .dispatch(release.clone(), catalog.len(), cases)
                .await
        }
        .instrument(span)
        .await
    }

    /// Probe the targets, then compare every release in order
    ///
    /// A missing catalog abandons that release only. Any other failure stops
    /// the run and is returned.
    pub async fn run(&self, releases: &[ReleaseKey]) -> HarnessResult<RunSummary> {
        self.wait_for_targets().await?;

        let mut summary = RunSummary::default();
        for release in releases {
            match self.run_release(release).await {
                Ok(report) => summary.releases.push(report),
                Err(err) if err.severity() == Severity::Release => {
                    error!("Skipping {}: {}", release, err);
                    summary.abandoned.push(AbandonedRelease {
                        release: release.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(summary)
    }
}
