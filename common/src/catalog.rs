//! Listing of log files under a directory root and symbolic link inspection
//!
//! Paths handled here are always absolute and lexically normalized (no `.` or `..`
//! components), which lets callers compare them for identity without touching the filesystem.
//! Links are never followed while walking: a symbolic link to a directory is reported as an
//! entry, not traversed.

use anyhow::{Context, anyhow};
use async_recursion::async_recursion;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

use crate::config::{LOG_PATTERNS, LinkResolution, MAX_LINK_HOPS};
use crate::error::{Error, Result};

/// Compiled set of glob patterns matched against root-relative paths
#[derive(Debug, Clone)]
pub struct LogPattern {
    set: globset::GlobSet,
}

impl LogPattern {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> anyhow::Result<Self> {
        let mut builder = globset::GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = globset::GlobBuilder::new(pattern)
                .literal_separator(true) // * doesn't match /
                .build()
                .with_context(|| format!("invalid glob pattern: {}", pattern))?;
            builder.add(glob);
        }
        let set = builder.build().context("failed compiling glob patterns")?;
        Ok(Self { set })
    }

    /// Patterns selecting `*.log` and `*.log.gz` at any depth
    pub fn logs() -> anyhow::Result<Self> {
        Self::new(&LOG_PATTERNS)
    }

    /// Hidden entries, or anything under a hidden directory, never match.
    pub fn is_match(&self, relative_path: &Path) -> bool {
        !is_hidden(relative_path) && self.set.is_match(relative_path)
    }
}

fn is_hidden(relative_path: &Path) -> bool {
    relative_path.components().any(|component| {
        matches!(component, Component::Normal(name) if name.as_encoded_bytes().starts_with(b"."))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Plain,
    Symlink,
    Compressed,
}

/// A log file found by a directory scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Where a symlink points to (absolute), or `path` itself for anything else
    pub target: PathBuf,
}

impl LogEntry {
    #[instrument]
    pub async fn inspect(path: &Path, resolution: LinkResolution) -> Result<Self> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .with_context(|| format!("failed reading metadata from {:?}", &path))
            .map_err(Error::resource)?;
        if metadata.file_type().is_symlink() {
            let target = resolve_link(path, resolution).await?;
            return Ok(Self {
                path: path.to_path_buf(),
                kind: EntryKind::Symlink,
                target,
            });
        }
        let kind = if is_compressed(path) {
            EntryKind::Compressed
        } else {
            EntryKind::Plain
        };
        Ok(Self {
            path: path.to_path_buf(),
            kind,
            target: path.to_path_buf(),
        })
    }

    pub fn is_link(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    /// Judged by name only, a link called `*.gz` counts as compressed too
    pub fn is_compressed(&self) -> bool {
        is_compressed(&self.path)
    }
}

pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
}

/// Collapses `.` and `..` components without consulting the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." at the root stays at the root
                normalized.pop();
            }
            Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

/// Resolves `path` against `base` (when relative) and normalizes the result.
pub fn absolute(path: &Path, base: &Path) -> PathBuf {
    normalize(&base.join(path))
}

async fn read_link_once(path: &Path) -> Result<PathBuf> {
    let stored = tokio::fs::read_link(path)
        .await
        .with_context(|| format!("failed reading symlink {:?}", &path))
        .map_err(Error::resource)?;
    // relative targets are relative to the directory holding the link
    let parent = path.parent().unwrap_or_else(|| Path::new("/"));
    Ok(absolute(&stored, parent))
}

/// Returns the absolute path `path` (a symbolic link) points to.
///
/// With [`LinkResolution::SingleHop`] exactly one level is resolved, so a link to a link yields
/// the second link. [`LinkResolution::Chain`] keeps going until it reaches a path that is not a
/// link (or does not exist) and fails after [`MAX_LINK_HOPS`] levels.
#[instrument]
pub async fn resolve_link(path: &Path, resolution: LinkResolution) -> Result<PathBuf> {
    let mut current = read_link_once(path).await?;
    if resolution == LinkResolution::SingleHop {
        return Ok(current);
    }
    let mut hops = 1;
    loop {
        match tokio::fs::symlink_metadata(&current).await {
            Ok(metadata) if metadata.file_type().is_symlink() => {}
            _ => return Ok(current),
        }
        if hops == MAX_LINK_HOPS {
            return Err(Error::resource(anyhow!(
                "too many levels of symbolic links resolving {:?}",
                path
            )));
        }
        tracing::trace!("following {:?}", &current);
        current = read_link_once(&current).await?;
        hops += 1;
    }
}

async fn check_root(root: &Path) -> Result<()> {
    match tokio::fs::metadata(root).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(Error::resource(anyhow!("{:?} is not a directory", root))),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
            path: root.to_path_buf(),
        }),
        Err(error) => Err(Error::resource(
            anyhow::Error::new(error).context(format!("failed reading metadata from {:?}", root)),
        )),
    }
}

#[async_recursion]
async fn walk(dir: &Path, entries: &mut Vec<(PathBuf, std::fs::FileType)>) -> anyhow::Result<()> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot open directory {:?} for reading", dir))?;
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .with_context(|| format!("failed traversing directory {:?}", dir))?
    {
        let entry_path = entry.path();
        // DirEntry::file_type does not follow symlinks
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("failed reading file type of {:?}", &entry_path))?;
        entries.push((entry_path.clone(), file_type));
        if file_type.is_dir() {
            walk(&entry_path, entries).await?;
        }
    }
    Ok(())
}

async fn walk_root(root: &Path) -> Result<Vec<(PathBuf, std::fs::FileType)>> {
    check_root(root).await?;
    let mut entries = vec![];
    walk(root, &mut entries).await.map_err(Error::resource)?;
    entries.sort_by(|(a, _), (b, _)| a.as_os_str().cmp(b.as_os_str()));
    Ok(entries)
}

/// Lists every non-directory entry under `root` whose relative path matches `pattern`.
///
/// Results are absolute paths sorted byte-wise, so repeated scans of an unchanged tree produce
/// the same sequence. Fails with [`Error::NotFound`] when `root` does not exist.
#[instrument(skip(pattern))]
pub async fn list(root: &Path, pattern: &LogPattern) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = walk_root(root)
        .await?
        .into_iter()
        .filter(|(path, file_type)| {
            !file_type.is_dir()
                && path
                    .strip_prefix(root)
                    .is_ok_and(|relative| pattern.is_match(relative))
        })
        .map(|(path, _)| path)
        .collect();
    tracing::debug!("found {} matching file(s)", files.len());
    Ok(files)
}

/// Renders the whole content of `root` (matching or not), one relative path per line.
#[instrument]
pub async fn tree(root: &Path) -> Result<String> {
    let entries = walk_root(root).await?;
    let mut out = format!("{}\n", root.display());
    let (mut directories, mut files) = (0, 0);
    for (path, file_type) in &entries {
        let relative = path.strip_prefix(root).unwrap_or(path);
        if file_type.is_dir() {
            directories += 1;
            out.push_str(&format!("  {}/\n", relative.display()));
        } else {
            files += 1;
            out.push_str(&format!("  {}\n", relative.display()));
        }
    }
    out.push_str(&format!(
        "\n{} director{}, {} file{}",
        directories,
        if directories == 1 { "y" } else { "ies" },
        files,
        if files == 1 { "" } else { "s" }
    ));
    Ok(out)
}
