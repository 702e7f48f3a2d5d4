use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::associate::{self, AssociationMap, AssociationStrategy};
use crate::catalog::{self, LogEntry, LogPattern};
use crate::config::LinkResolution;
use crate::error::Result;
use crate::pull;

/// A read-only view of the log files under `root`.
///
/// Nothing is cached: every accessor lists the filesystem again, and constructing a
/// `Directory` performs no I/O at all.
#[derive(Debug, Clone)]
pub struct Directory {
    root: PathBuf,
    pattern: LogPattern,
    resolution: LinkResolution,
}

impl Directory {
    pub fn new(root: PathBuf, pattern: LogPattern, resolution: LinkResolution) -> Self {
        Self {
            root: catalog::normalize(&root),
            pattern,
            resolution,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn files(&self) -> Result<Vec<PathBuf>> {
        catalog::list(&self.root, &self.pattern).await
    }

    #[instrument(skip(self), fields(root = ?self.root))]
    pub async fn logs(&self) -> Result<Vec<LogEntry>> {
        let mut logs = vec![];
        for file in self.files().await? {
            logs.push(LogEntry::inspect(&file, self.resolution).await?);
        }
        Ok(logs)
    }

    pub async fn associations(&self, strategy: AssociationStrategy) -> Result<AssociationMap> {
        associate::associate(self, strategy).await
    }

    /// Copies every association into this directory, mirroring the relative names.
    pub async fn pull(&self, associations: &AssociationMap) -> Result<pull::Summary> {
        pull::pull(&self.root, associations).await
    }
}
