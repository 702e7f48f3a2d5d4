use anyhow::Context;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files_compressed: usize,
    /// Already carrying the compressed extension
    pub files_unchanged: usize,
    /// Left as-is because the compressed name was already taken
    pub files_skipped: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            files_compressed: self.files_compressed + other.files_compressed,
            files_unchanged: self.files_unchanged + other.files_unchanged,
            files_skipped: self.files_skipped + other.files_skipped,
            bytes_in: self.bytes_in + other.bytes_in,
            bytes_out: self.bytes_out + other.bytes_out,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files compressed: {}\n\
            files already compressed: {}\n\
            files skipped: {}\n\
            bytes before compression: {}\n\
            bytes after compression: {}",
            self.files_compressed,
            self.files_unchanged,
            self.files_skipped,
            bytesize::ByteSize(self.bytes_in),
            bytesize::ByteSize(self.bytes_out),
        )
    }
}

/// `path` with `.gz` appended to its file name
pub fn compressed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

const CHUNK_SIZE: usize = 128 * 1024;

fn encode(
    mut reader: std::fs::File,
    writer: std::fs::File,
    src_metadata: &std::fs::Metadata,
    cancel: &CancellationToken,
) -> anyhow::Result<(u64, u64)> {
    let mut encoder = flate2::write::GzEncoder::new(
        std::io::BufWriter::new(writer),
        flate2::Compression::default(),
    );
    let mut buf = vec![0; CHUNK_SIZE];
    let mut bytes_in = 0;
    loop {
        if cancel.is_cancelled() {
            anyhow::bail!("compression cancelled");
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error).context("failed reading data"),
        };
        encoder
            .write_all(&buf[..n])
            .context("failed compressing data")?;
        bytes_in += n as u64;
    }
    let mut buffered = encoder.finish().context("failed finishing gzip stream")?;
    buffered.flush().context("failed flushing compressed data")?;
    let file = buffered.into_inner().map_err(|err| err.into_error())?;
    file.set_permissions(src_metadata.permissions())
        .context("failed setting permissions")?;
    file.set_modified(src_metadata.modified()?)
        .context("failed setting modification time")?;
    let bytes_out = file.metadata()?.len();
    Ok((bytes_in, bytes_out))
}

/// Compresses `src` into a new `dst`. Checks `cancel` between chunks and removes the partial
/// output when it fires.
fn gzip_blocking(
    src: &Path,
    dst: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<(u64, u64)> {
    if cancel.is_cancelled() {
        anyhow::bail!("compression of {:?} cancelled before it started", src);
    }
    let reader = std::fs::File::open(src)
        .with_context(|| format!("cannot open {:?} for reading", src))?;
    let src_metadata = reader
        .metadata()
        .with_context(|| format!("failed reading metadata from {:?}", src))?;
    let writer = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .with_context(|| format!("cannot create {:?}", dst))?;
    match encode(reader, writer, &src_metadata, cancel) {
        Ok(sizes) => Ok(sizes),
        Err(error) => {
            if let Err(rm_error) = std::fs::remove_file(dst) {
                tracing::warn!("failed removing partial output {:?}: {}", dst, rm_error);
            }
            Err(error.context(format!("failed compressing {:?} into {:?}", src, dst)))
        }
    }
}

/// Replaces `path` with a gzip-compressed `<path>.gz`, keeping permissions and mtime.
///
/// If `<path>.gz` already exists the file is left alone and counted as skipped. Dropping the
/// returned future (e.g. on timeout) stops the compression at the next chunk.
#[instrument]
pub async fn gzip(path: &Path) -> Result<Summary> {
    let dst = compressed_path(path);
    if tokio::fs::symlink_metadata(&dst).await.is_ok() {
        tracing::warn!("{:?} already exists, leaving {:?} uncompressed", &dst, path);
        return Ok(Summary {
            files_skipped: 1,
            ..Default::default()
        });
    }
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let (bytes_in, bytes_out) = {
        let src = path.to_path_buf();
        tokio::task::spawn_blocking(move || gzip_blocking(&src, &dst, &cancel))
            .await
            .context("compression task failed")
            .map_err(Error::resource)?
            .map_err(Error::resource)?
    };
    tokio::fs::remove_file(path)
        .await
        .with_context(|| format!("failed removing {:?} after compression", path))
        .map_err(Error::resource)?;
    tracing::debug!("compressed {} -> {} bytes", bytes_in, bytes_out);
    Ok(Summary {
        files_compressed: 1,
        bytes_in,
        bytes_out,
        ..Default::default()
    })
}
