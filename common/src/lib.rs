//! Common library for `rstage` - log catalog, link association, staging and transfer
//!
//! `rstage` moves rotated log files from a local directory into a remote directory. Files are
//! first pulled into a temporary staging directory, compressed there with gzip, and then
//! pulled into the remote directory, which mirrors the local relative layout.
//!
//! # Association
//!
//! Log rotation commonly leaves a stable name pointing at the file currently written to:
//!
//! ```text
//! current.log -> current.20240101.log
//! ```
//!
//! Copying both names would ship the same content twice. When associating a local directory
//! every symbolic link is skipped, and so is every file some link in the same scan points to
//! (see [`associate`]). Only files that take part in no link relationship are transferred.
//!
//! # Modules
//!
//! - [`catalog`] - listing of `*.log` / `*.log.gz` files and symbolic link resolution
//! - [`directory`] - read-only directory view, recomputed on every access
//! - [`associate`] - relative name -> file mapping, with or without link exclusion
//! - [`pull`] - copying an association map into a destination root
//! - [`compress`] - in-place gzip compression
//! - [`rm`] - recursive removal
//! - [`staging`] - the transient staging directory
//! - [`transfer`] - the local -> staging -> remote pipeline
//!
//! # Error Handling
//!
//! All operations return [`Error`]. Failures are not retried: the first one aborts the
//! pipeline, but the staging directory is removed regardless.

pub mod associate;
pub mod catalog;
pub mod compress;
pub mod config;
pub mod directory;
pub mod error;
pub mod pull;
pub mod rm;
pub mod staging;
pub mod testutils;
pub mod transfer;

pub use catalog::LogPattern;
pub use config::{LinkResolution, OutputConfig, TimeoutConfig};
pub use error::Error;
pub use transfer::{Settings as TransferSettings, Summary as TransferSummary, transfer};

/// Sets up logging and a single-threaded runtime, then runs `func` to completion.
///
/// Returns `None` if the runtime could not be started or `func` failed; the failure is logged.
/// With `print_summary` the returned value is printed to stdout.
pub fn run<Fut, Summary>(output: OutputConfig, func: impl FnOnce() -> Fut) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(output.log_level()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to start the runtime: {:#}", &error);
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(summary) => {
            if output.print_summary {
                println!("{}", &summary);
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", &error);
            None
        }
    }
}
