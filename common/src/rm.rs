use anyhow::Context;
use async_recursion::async_recursion;
use tracing::instrument;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files_removed: usize,
    pub symlinks_removed: usize,
    pub directories_removed: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            files_removed: self.files_removed + other.files_removed,
            symlinks_removed: self.symlinks_removed + other.symlinks_removed,
            directories_removed: self.directories_removed + other.directories_removed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files removed: {}\n\
            symlinks removed: {}\n\
            directories removed: {}",
            self.files_removed, self.symlinks_removed, self.directories_removed
        )
    }
}

/// Removes `path` and, for a directory, everything below it. Links are removed, not followed.
///
/// Removal keeps going past failing entries so that as much as possible is cleaned up; the
/// collected failures are returned together at the end.
#[instrument]
#[async_recursion]
pub async fn rm(path: &std::path::Path) -> anyhow::Result<Summary> {
    tracing::debug!("remove: {:?}", path);
    let src_metadata = tokio::fs::symlink_metadata(path)
        .await
        .with_context(|| format!("failed reading metadata from {:?}", &path))?;
    if !src_metadata.is_dir() {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("failed removing {:?}", &path))?;
        if src_metadata.file_type().is_symlink() {
            return Ok(Summary {
                symlinks_removed: 1,
                ..Default::default()
            });
        }
        return Ok(Summary {
            files_removed: 1,
            ..Default::default()
        });
    }
    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("cannot open directory {:?} for reading", path))?;
    let mut summary = Summary::default();
    let mut errors = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {:?}", &path))?
    {
        match rm(&entry.path()).await {
            Ok(entry_summary) => summary = summary + entry_summary,
            Err(error) => errors.push(error),
        }
    }
    if !errors.is_empty() {
        tracing::debug!("remove: {:?} failed with: {:?}", path, &errors);
        return Err(anyhow::anyhow!("{:?}", &errors));
    }
    tokio::fs::remove_dir(path)
        .await
        .with_context(|| format!("failed removing directory {:?}", &path))?;
    tracing::debug!("remove: {:?} succeeded!", path);
    summary.directories_removed += 1;
    Ok(summary)
}
