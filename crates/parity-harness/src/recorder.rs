//! Mismatch evidence on disk
//!
//! Layout:
//!
//! ```text
//! {root}/{family}/{release}[/{arch}]/{cveid|package}/{identifier}/old.json
//! {root}/{family}/{release}[/{arch}]/{cveid|package}/{identifier}/new.json
//! ```
//!
//! `old.json` holds the baseline body and `new.json` the candidate body,
//! both pretty-printed. The identifier directory is percent-encoded so every
//! test case owns a distinct directory and concurrent writers never touch the
//! same file.

use crate::case::{path_segment, ReleaseKey, TestCase};
use crate::error::{HarnessError, HarnessResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const BASELINE_FILE: &str = "old.json";
pub const CANDIDATE_FILE: &str = "new.json";

/// Paths written for one mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub baseline: PathBuf,
    pub candidate: PathBuf,
}

/// Writes both bodies of a mismatched test case
#[derive(Debug, Clone)]
pub struct MismatchRecorder {
    root: PathBuf,
}

impl MismatchRecorder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by a (family, release, arch) tuple
    ///
    /// Each component is percent-encoded, so the result always lies
    /// below the root.
    pub fn release_dir(&self, key: &ReleaseKey) -> PathBuf {
        scoped_dir(&self.root, &key.family, &key.release, key.arch.as_deref())
    }

    /// Directory owned by a single test case
    pub fn case_dir(&self, case: &TestCase) -> PathBuf {
        scoped_dir(&self.root, &case.family, &case.release, case.arch.as_deref())
            .join(case.kind.as_str())
            .join(case.artifact_name())
    }

    /// Clear and recreate the release directory
    ///
    /// Called once per release before any test case is dispatched, so a run
    /// never mixes its artifacts with a previous run's.
    pub async fn reset(&self, key: &ReleaseKey) -> HarnessResult<PathBuf> {
        let dir = self.release_dir(key);

        match fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Cleared artifact directory {:?}", dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(HarnessError::Artifact { path: dir, source }),
        }
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| HarnessError::Artifact {
                path: dir.clone(),
                source,
            })?;

        Ok(dir)
    }

    /// Write both bodies of a mismatch
    pub async fn record(
        &self,
        case: &TestCase,
        baseline: &Value,
        candidate: &Value,
    ) -> HarnessResult<ArtifactPaths> {
        let dir = self.case_dir(case);
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| HarnessError::Artifact {
                path: dir.clone(),
                source,
            })?;

        let paths = ArtifactPaths {
            baseline: dir.join(BASELINE_FILE),
            candidate: dir.join(CANDIDATE_FILE),
        };
        write_pretty(&paths.baseline, baseline).await?;
        write_pretty(&paths.candidate, candidate).await?;

        debug!("Recorded mismatch for {} in {:?}", case, dir);
        Ok(paths)
    }
}

fn scoped_dir(root: &Path, family: &str, release: &str, arch: Option<&str>) -> PathBuf {
    let mut dir = root.join(path_segment(family)).join(path_segment(release));
    if let Some(arch) = arch {
        dir.push(path_segment(arch));
    }
    dir
}

async fn write_pretty(path: &Path, body: &Value) -> HarnessResult<()> {
    let mut content =
        serde_json::to_string_pretty(body).map_err(|source| HarnessError::ArtifactEncode {
            path: path.to_path_buf(),
            source,
        })?;
    content.push('\n');

    fs::write(path, content)
        .await
        .map_err(|source| HarnessError::Artifact {
            path: path.to_path_buf(),
            source,
        })
}
