use anyhow::Context;
use std::path::Path;
use tracing::instrument;

use crate::associate::{AssociationMap, AssociationStrategy};
use crate::catalog::{self, LogPattern};
use crate::compress;
use crate::config::LinkResolution;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::pull;
use crate::rm;

/// Transient directory where pulled logs are compressed before delivery.
///
/// The directory is removed by [`StagingArea::destroy`]; if that never completes (an early
/// return, a timeout or a panic) it is removed when the value is dropped.
#[derive(Debug)]
pub struct StagingArea {
    dir: Directory,
    destroyed: bool,
}

impl StagingArea {
    /// Creates a new, empty directory `rstage-<pid>-<random>` under `parent`.
    #[instrument(skip(pattern))]
    pub async fn create(parent: &Path, pattern: LogPattern) -> Result<Self> {
        let root = loop {
            let root = parent.join(format!(
                "rstage-{}-{:08x}",
                std::process::id(),
                rand::random::<u32>()
            ));
            let mut builder = tokio::fs::DirBuilder::new();
            builder.mode(0o700);
            match builder.create(&root).await {
                Ok(()) => break root,
                Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!("{:?} already exists, retrying", &root);
                }
                Err(error) => {
                    return Err(Error::resource(anyhow::Error::new(error).context(format!(
                        "failed creating staging directory {:?}",
                        &root
                    ))));
                }
            }
        };
        tracing::info!("staging in {:?}", &root);
        Ok(Self {
            // staging only ever holds regular files
            dir: Directory::new(root, pattern, LinkResolution::SingleHop),
            destroyed: false,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.root()
    }

    pub async fn pull(&self, associations: &AssociationMap) -> Result<pull::Summary> {
        self.dir.pull(associations).await
    }

    /// Compresses every staged log not already named `*.gz`. Running it again is a no-op.
    #[instrument(skip(self), fields(root = ?self.root()))]
    pub async fn compress(&self) -> Result<compress::Summary> {
        let mut summary = compress::Summary::default();
        for entry in self.dir.logs().await? {
            if entry.is_compressed() {
                summary.files_unchanged += 1;
                continue;
            }
            summary = summary + compress::gzip(&entry.path).await?;
        }
        Ok(summary)
    }

    /// Everything currently staged, nothing excluded.
    pub async fn associations(&self) -> Result<AssociationMap> {
        self.dir.associations(AssociationStrategy::Raw).await
    }

    pub async fn listing(&self) -> Result<String> {
        catalog::tree(self.root()).await
    }

    #[instrument(skip(self), fields(root = ?self.root()))]
    pub async fn destroy(&mut self) -> Result<rm::Summary> {
        if self.destroyed {
            return Ok(rm::Summary::default());
        }
        let summary = rm::rm(self.dir.root())
            .await
            .with_context(|| format!("failed removing staging directory {:?}", self.dir.root()))
            .map_err(Error::resource)?;
        self.destroyed = true;
        tracing::info!("removed staging directory");
        Ok(summary)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        let root = self.dir.root();
        tracing::warn!("staging directory {:?} was not destroyed, removing it now", root);
        if let Err(error) = std::fs::remove_dir_all(root) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::error!("failed removing staging directory {:?}: {}", root, error);
            }
        }
    }
}
