//! Local -> staging -> remote pipeline
//!
//! A transfer runs these steps in order, each one blocking until done:
//!
//! 1. associate the local directory, excluding symbolic links and their targets
//! 2. pull the associations into a fresh staging directory
//! 3. compress everything staged that is not compressed yet
//! 4. pull the staging directory's content into the remote directory
//! 5. print the staging listing and remove the staging directory
//!
//! The first failure aborts the remaining steps, except step 5 which always runs.

use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::associate::AssociationStrategy;
use crate::catalog::{self, LogPattern};
use crate::compress;
use crate::config::{LinkResolution, TimeoutConfig};
use crate::directory::Directory;
use crate::error::{Result, with_timeout};
use crate::pull;
use crate::rm;
use crate::staging::StagingArea;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base for relative local, remote and staging paths
    pub working_dir: PathBuf,
    /// Where the staging directory is created
    pub staging_parent: PathBuf,
    pub pattern: LogPattern,
    pub link_resolution: LinkResolution,
    pub timeouts: TimeoutConfig,
    /// Print the staging directory content to stdout before removing it
    pub print_listing: bool,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Summary {
    pub staged: pull::Summary,
    pub compressed: compress::Summary,
    pub delivered: pull::Summary,
    pub cleaned: rm::Summary,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "staged:\n{}\n\ncompressed:\n{}\n\ndelivered:\n{}\n\ncleaned up:\n{}",
            &self.staged, &self.compressed, &self.delivered, &self.cleaned
        )
    }
}

async fn deliver(
    local: &Directory,
    remote: &Directory,
    staging: &StagingArea,
    timeouts: &TimeoutConfig,
) -> Result<Summary> {
    let associations = local
        .associations(AssociationStrategy::ExcludeLinks)
        .await?;
    tracing::info!(
        "staging {} log file(s) from {:?}",
        associations.len(),
        local.root()
    );
    let staged = with_timeout("staging pull", timeouts.copy, staging.pull(&associations)).await?;
    let compressed = with_timeout("compression", timeouts.compress, staging.compress()).await?;
    let associations = staging.associations().await?;
    tracing::info!(
        "delivering {} log file(s) to {:?}",
        associations.len(),
        remote.root()
    );
    let delivered = with_timeout("remote pull", timeouts.copy, remote.pull(&associations)).await?;
    Ok(Summary {
        staged,
        compressed,
        delivered,
        ..Default::default()
    })
}

/// Moves the logs of `local` into `remote` through a compressing staging directory.
///
/// The staging directory is removed on every path out of this function. When both the
/// pipeline and the cleanup fail, the pipeline error is returned and the cleanup error logged.
#[instrument(skip(settings))]
pub async fn transfer(local: &Path, remote: &Path, settings: &Settings) -> Result<Summary> {
    let local = Directory::new(
        catalog::absolute(local, &settings.working_dir),
        settings.pattern.clone(),
        settings.link_resolution,
    );
    let remote = Directory::new(
        catalog::absolute(remote, &settings.working_dir),
        settings.pattern.clone(),
        settings.link_resolution,
    );
    let staging_parent = catalog::absolute(&settings.staging_parent, &settings.working_dir);
    let mut staging = StagingArea::create(&staging_parent, settings.pattern.clone()).await?;
    let outcome = deliver(&local, &remote, &staging, &settings.timeouts).await;
    if settings.print_listing {
        match staging.listing().await {
            Ok(listing) => println!("{}", listing),
            Err(error) => tracing::warn!("failed listing staging directory: {:#}", &error),
        }
    }
    let cleanup = with_timeout("cleanup", settings.timeouts.cleanup, staging.destroy()).await;
    match (outcome, cleanup) {
        (Ok(summary), Ok(cleaned)) => Ok(Summary { cleaned, ..summary }),
        (Ok(_), Err(error)) | (Err(error), Ok(_)) => Err(error),
        (Err(error), Err(cleanup_error)) => {
            tracing::error!("{:#}", &cleanup_error);
            Err(error)
        }
    }
}
