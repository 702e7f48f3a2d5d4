//! Error kinds shared by all rstage operations

use crate::pull;

/// Error type for rstage operations.
///
/// # Logging Convention
/// The Display implementation shows the full error chain, so it can be logged with any format
/// specifier:
/// ```ignore
/// tracing::error!("operation failed: {:#}", &error); // ✅ Shows full chain
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A directory root does not exist at the time it is listed.
    #[error("{path:?} does not exist")]
    NotFound { path: std::path::PathBuf },
    /// A pull failed part-way; `summary` holds what was copied before the failure.
    #[error("{source:#}")]
    Copy {
        #[source]
        source: anyhow::Error,
        summary: pull::Summary,
    },
    /// Any other I/O failure: staging creation, link inspection, compression or cleanup.
    #[error("{source:#}")]
    Resource {
        #[source]
        source: anyhow::Error,
    },
    #[error("{operation} did not finish within {}", humantime::format_duration(*.timeout))]
    Timeout {
        operation: &'static str,
        timeout: std::time::Duration,
    },
}

impl Error {
    #[must_use]
    pub fn resource(source: anyhow::Error) -> Self {
        Error::Resource { source }
    }

    #[must_use]
    pub fn copy(source: anyhow::Error, summary: pull::Summary) -> Self {
        Error::Copy { source, summary }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Runs `fut` under an optional deadline, mapping expiry to [`Error::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    timeout: Option<std::time::Duration>,
    fut: F,
) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match timeout {
        Some(timeout) => match tokio::time::timeout(timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout { operation, timeout }),
        },
        None => fut.await,
    }
}
