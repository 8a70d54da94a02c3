//! Parity runner
//!
//! Compares CVE or package lookups between a baseline and a candidate
//! server for one or more releases of an OS family.

mod cli;

use anyhow::{bail, Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use cli::Cli;
use parity_harness::{FileCatalog, Harness, HarnessConfig, RunSummary};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.apply(HarnessConfig::from_env());
    let releases = cli.release_keys();

    info!(
        "Comparing {} against {} for {} release(s) at sample rate {}",
        config.targets.baseline,
        config.targets.candidate,
        releases.len(),
        config.sample_rate
    );

    let catalog = Arc::new(FileCatalog::new(&config.catalog_dir));
    let harness = Harness::new(config, catalog).context("invalid configuration")?;

    let summary = match harness.run(&releases).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run aborted: {}", e);
            return Err(e.into());
        }
    };

    summary.log_summary();

    if let Some(path) = &cli.summary {
        write_summary(path, &summary).await?;
        info!("Summary written to {:?}", path);
    }

    if !summary.is_complete() {
        bail!("{} release(s) abandoned", summary.abandoned.len());
    }

    Ok(())
}

async fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path, json + "\n")
        .await
        .with_context(|| format!("failed to write summary to {:?}", path))?;
    Ok(())
}
