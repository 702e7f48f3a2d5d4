//! Mapping of log files to the relative names they are staged under
//!
//! Rotation schemes often keep a stable name (`current.log`) as a symbolic link to the dated
//! file it currently writes to. A scan of such a directory sees the same content under two
//! names. [`AssociationStrategy::ExcludeLinks`] drops both sides of every link/target pair
//! found in the scan, so no content is staged twice: the candidates are
//! `files - links - targets`, compared by normalized path.

use anyhow::Context;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::catalog::LogEntry;
use crate::directory::Directory;
use crate::error::{Error, Result};

/// Root-relative name (no leading separator) -> entry
///
/// Iteration follows path components (`a/b.log` before `a-b.log`); [`crate::pull::pull`]
/// re-sorts byte-wise to match [`crate::catalog::list`].
pub type AssociationMap = BTreeMap<PathBuf, LogEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationStrategy {
    /// Skip symbolic links and anything a link in the same scan points to
    ExcludeLinks,
    /// Every matching entry, used for directories this tool populated itself
    Raw,
}

/// Result of splitting a scan into links, targets and candidates
#[derive(Debug, Default)]
pub struct Partition {
    pub files: Vec<PathBuf>,
    pub links: Vec<PathBuf>,
    /// Deduplicated, in order of first appearance
    pub targets: Vec<PathBuf>,
    /// Entries of `files` that are neither in `links` nor in `targets`, order preserved
    pub candidates: Vec<LogEntry>,
}

#[instrument(skip(dir), fields(root = ?dir.root()))]
pub async fn partition(dir: &Directory) -> Result<Partition> {
    let logs = dir.logs().await?;
    let files: Vec<PathBuf> = logs.iter().map(|log| log.path.clone()).collect();
    let links: Vec<PathBuf> = logs
        .iter()
        .filter(|log| log.is_link())
        .map(|log| log.path.clone())
        .collect();
    let mut seen = HashSet::new();
    let targets: Vec<PathBuf> = logs
        .iter()
        .filter(|log| log.is_link())
        .filter(|log| seen.insert(log.target.clone()))
        .map(|log| log.target.clone())
        .collect();
    let candidates: Vec<LogEntry> = {
        let excluded: HashSet<&Path> = links
            .iter()
            .chain(targets.iter())
            .map(PathBuf::as_path)
            .collect();
        logs.into_iter()
            .filter(|log| !excluded.contains(log.path.as_path()))
            .collect()
    };
    tracing::debug!(
        "{} file(s), {} link(s), {} target(s), {} candidate(s)",
        files.len(),
        links.len(),
        targets.len(),
        candidates.len()
    );
    Ok(Partition {
        files,
        links,
        targets,
        candidates,
    })
}

/// Relative names of `entries`, index-aligned with the input.
pub fn names(root: &Path, entries: &[LogEntry]) -> Result<Vec<PathBuf>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .with_context(|| format!("{:?} is not under {:?}", &entry.path, root))
                .map_err(Error::resource)
        })
        .collect()
}

pub async fn associate(dir: &Directory, strategy: AssociationStrategy) -> Result<AssociationMap> {
    let entries = match strategy {
        AssociationStrategy::ExcludeLinks => partition(dir).await?.candidates,
        AssociationStrategy::Raw => dir.logs().await?,
    };
    let names = names(dir.root(), &entries)?;
    Ok(names.into_iter().zip(entries).collect())
}
