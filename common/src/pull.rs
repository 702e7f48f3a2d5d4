use anyhow::Context;
use async_recursion::async_recursion;
use std::path::Path;
use tracing::instrument;

use crate::associate::AssociationMap;
use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_copied: u64,
    pub files_copied: usize,
    pub directories_created: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            files_copied: self.files_copied + other.files_copied,
            directories_created: self.directories_created + other.directories_created,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes copied: {}\n\
            files copied: {}\n\
            directories created: {}",
            bytesize::ByteSize(self.bytes_copied),
            self.files_copied,
            self.directories_created,
        )
    }
}

/// Creates `dir` and any missing parents, returning how many directories were created.
async fn create_dirs(dir: &Path) -> anyhow::Result<usize> {
    let mut missing = 0;
    for ancestor in dir.ancestors() {
        if tokio::fs::try_exists(ancestor).await.unwrap_or(false) {
            break;
        }
        missing += 1;
    }
    if missing > 0 {
        tracing::debug!("creating {:?}", dir);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("cannot create directory {:?}", dir))?;
    }
    Ok(missing)
}

/// Copies `src` to `dst`, following symlinks and recursing into directories. Existing
/// destination files are overwritten.
#[instrument]
#[async_recursion]
pub async fn copy(src: &Path, dst: &Path) -> anyhow::Result<Summary> {
    let src_metadata = tokio::fs::metadata(src)
        .await
        .with_context(|| format!("failed reading metadata from {:?}", &src))?;
    if !src_metadata.is_dir() {
        tracing::debug!("copying data");
        let bytes_copied = tokio::fs::copy(src, dst)
            .await
            .with_context(|| format!("failed copying {:?} to {:?}", &src, &dst))?;
        return Ok(Summary {
            bytes_copied,
            files_copied: 1,
            ..Default::default()
        });
    }
    let mut summary = Summary::default();
    if tokio::fs::symlink_metadata(dst)
        .await
        .is_ok_and(|metadata| metadata.is_dir())
    {
        tracing::debug!("directory already exists");
    } else {
        tokio::fs::create_dir(dst)
            .await
            .with_context(|| format!("cannot create directory {:?}", dst))?;
        summary.directories_created += 1;
    }
    let mut entries = tokio::fs::read_dir(src)
        .await
        .with_context(|| format!("cannot open directory {:?} for reading", src))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {:?}", src))?
    {
        let entry_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        summary = summary + copy(&entry_path, &dst_path).await?;
    }
    Ok(summary)
}

/// Copies each association to `dest_root/name`, in the byte-wise name order used by listings.
///
/// Stops at the first failure; the returned [`Error::Copy`] carries what was copied so far.
#[instrument(skip(associations), fields(count = associations.len()))]
pub async fn pull(dest_root: &Path, associations: &AssociationMap) -> Result<Summary> {
    // the map orders by path components, which puts `a/b.log` before `a-b.log`
    let mut ordered: Vec<_> = associations.iter().collect();
    ordered.sort_by(|(a, _), (b, _)| a.as_os_str().cmp(b.as_os_str()));
    let mut summary = Summary::default();
    for (name, entry) in ordered {
        let dst = dest_root.join(name);
        if let Some(parent) = dst.parent() {
            summary.directories_created += create_dirs(parent)
                .await
                .map_err(move |err| Error::copy(err, summary))?;
        }
        let copied = copy(&entry.path, &dst)
            .await
            .map_err(move |err| Error::copy(err, summary))?;
        summary = summary + copied;
    }
    tracing::debug!("pulled {} file(s) into {:?}", summary.files_copied, dest_root);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntryKind, LogEntry};
    use crate::testutils;
    use tracing_test::traced_test;

    fn entry(path: std::path::PathBuf) -> LogEntry {
        LogEntry {
            target: path.clone(),
            path,
            kind: EntryKind::Plain,
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn pull_mirrors_relative_layout() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_log_dir().await?;
        let src = tmp_dir.join("src");
        let dst = tmp_dir.join("dst");
        let mut associations = AssociationMap::new();
        associations.insert("app.log".into(), entry(src.join("app.log")));
        associations.insert(
            "nested/worker.log".into(),
            entry(src.join("nested/worker.log")),
        );
        let summary = pull(&dst, &associations).await?;
        assert_eq!(summary.files_copied, 2);
        assert_eq!(summary.bytes_copied, 9);
        // dst and dst/nested
        assert_eq!(summary.directories_created, 2);
        assert_eq!(
            testutils::list_files(&dst),
            vec!["app.log", "nested/worker.log"]
        );
        assert_eq!(
            tokio::fs::read_to_string(dst.join("nested/worker.log")).await?,
            "worker"
        );
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn pull_overwrites_existing_files() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_log_dir().await?;
        let src = tmp_dir.join("src");
        let dst = tmp_dir.join("dst");
        tokio::fs::create_dir(&dst).await?;
        tokio::fs::write(dst.join("app.log"), "stale content").await?;
        let mut associations = AssociationMap::new();
        associations.insert("app.log".into(), entry(src.join("app.log")));
        let summary = pull(&dst, &associations).await?;
        assert_eq!(summary.directories_created, 0);
        assert_eq!(tokio::fs::read_to_string(dst.join("app.log")).await?, "app");
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn pull_follows_symlinks() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_log_dir().await?;
        let src = tmp_dir.join("src");
        let dst = tmp_dir.join("dst");
        let mut associations = AssociationMap::new();
        associations.insert("current.log".into(), entry(src.join("current.log")));
        pull(&dst, &associations).await?;
        let metadata = tokio::fs::symlink_metadata(dst.join("current.log")).await?;
        assert!(metadata.is_file());
        assert_eq!(
            tokio::fs::read_to_string(dst.join("current.log")).await?,
            "current"
        );
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn copy_recurses_into_directories() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_log_dir().await?;
        let src = tmp_dir.join("src");
        let dst = tmp_dir.join("copy");
        let summary = copy(&src.join("nested"), &dst).await?;
        assert_eq!(summary.files_copied, 3);
        assert_eq!(summary.directories_created, 1);
        assert_eq!(
            testutils::list_files(&dst),
            vec!["latest.log", "worker.2.log", "worker.log"]
        );
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn pull_aborts_on_first_failure() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_log_dir().await?;
        let src = tmp_dir.join("src");
        let dst = tmp_dir.join("dst");
        tokio::fs::create_dir(&dst).await?;
        // "b" is a file, so nothing can be created under it
        tokio::fs::write(dst.join("b"), "not a directory").await?;
        let mut associations = AssociationMap::new();
        associations.insert("a.log".into(), entry(src.join("app.log")));
        associations.insert("b/x.log".into(), entry(src.join("nested/worker.log")));
        associations.insert("c.log".into(), entry(src.join("app.log")));
        match pull(&dst, &associations).await {
            Err(Error::Copy { summary, .. }) => assert_eq!(summary.files_copied, 1),
            other => panic!("expected a copy error, got {:?}", other),
        }
        assert!(!dst.join("c.log").exists());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn pull_follows_listing_order() -> Result<(), anyhow::Error> {
        let tmp_dir = testutils::setup_log_dir().await?;
        let src = tmp_dir.join("src");
        let dst = tmp_dir.join("dst");
        tokio::fs::create_dir(&dst).await?;
        tokio::fs::write(dst.join("a"), "not a directory").await?;
        let mut associations = AssociationMap::new();
        associations.insert("a/b.log".into(), entry(src.join("app.log")));
        associations.insert("a-b.log".into(), entry(src.join("app.log")));
        // `a-b.log` sorts first byte-wise, so it lands before `a/b.log` fails
        match pull(&dst, &associations).await {
            Err(Error::Copy { summary, .. }) => assert_eq!(summary.files_copied, 1),
            other => panic!("expected a copy error, got {:?}", other),
        }
        assert_eq!(tokio::fs::read_to_string(dst.join("a-b.log")).await?, "app");
        Ok(())
    }
}
