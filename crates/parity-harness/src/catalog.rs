//! Identifier catalogs
//!
//! A catalog is the ordered list of identifiers (CVE IDs or package names)
//! known for one release. On disk it is a plain text file with one
//! identifier per line:
//!
//! ```text
//! {root}/{cveid|package}/{family}/{family}_{release}.txt
//! ```

use crate::case::{path_segment, ReleaseKey};
use crate::error::{HarnessError, HarnessResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Source of identifier lists
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Load every identifier for a release, in catalog order
    ///
    /// Fails with [`HarnessError::CatalogNotFound`] when no list exists.
    async fn load(&self, key: &ReleaseKey) -> HarnessResult<Vec<String>>;
}

/// Catalog backed by text files under a root directory
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
}

impl FileCatalog {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of the list for a release
    pub fn file_path(&self, key: &ReleaseKey) -> PathBuf {
        let family = path_segment(&key.family);
        let release = path_segment(&key.release);
        self.root
            .join(key.kind.as_str())
            .join(&family)
            .join(format!("{}_{}.txt", family, release))
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn load(&self, key: &ReleaseKey) -> HarnessResult<Vec<String>> {
        let path = self.file_path(key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HarnessError::CatalogNotFound { path });
            }
            Err(source) => return Err(HarnessError::CatalogRead { path, source }),
        };

        let identifiers = parse_lines(&content);
        debug!(
            "Loaded catalog {:?} ({} identifiers)",
            path,
            identifiers.len()
        );
        Ok(identifiers)
    }
}

fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    lists: HashMap<ReleaseKey, Vec<String>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the identifiers for a release
    pub fn with_release<I, S>(mut self, key: ReleaseKey, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists
            .insert(key, identifiers.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn load(&self, key: &ReleaseKey) -> HarnessResult<Vec<String>> {
        self.lists
            .get(key)
            .cloned()
            .ok_or_else(|| HarnessError::CatalogNotFound {
                path: PathBuf::from(format!("memory:{}", key)),
            })
    }
}
