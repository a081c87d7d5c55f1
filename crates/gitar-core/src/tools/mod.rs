//! External collaborators: archive fetcher, recompressor and notifier.
//!
//! The pipeline only sees the traits; the implementations here wrap the
//! `aria2c`, `xz` and mailer executables or libcurl. All calls are blocking.

mod aria2;
mod fetch;
mod mailer;
mod xz;

use crate::retry::ErrorKind;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

pub use aria2::Aria2Fetcher;
pub use fetch::CurlFetcher;
pub use mailer::CommandNotifier;
pub use xz::XzRecompressor;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} not found on PATH")]
    NotFound {
        tool: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("{tool} exited with {status}")]
    Failed { tool: String, status: ExitStatus },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("download {url} failed: {source}")]
    Curl {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("download {url} returned HTTP {status}")]
    Http { url: String, status: u32 },
}

impl ToolError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        ToolError::Io {
            context: context.into(),
            source,
        }
    }

    /// Retry classification when the same tool call may be attempted again.
    pub fn retry_kind(&self) -> ErrorKind {
        match self {
            ToolError::Failed { .. } | ToolError::Spawn { .. } | ToolError::Io { .. } => {
                ErrorKind::ToolFailed
            }
            ToolError::Curl { source, .. } => crate::retry::classify_curl_error(source),
            ToolError::Http { status, .. } => crate::retry::classify_http_status(*status),
            ToolError::NotFound { .. } => ErrorKind::Other,
        }
    }
}

/// Downloads `url` into `dir/file_name`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, dir: &Path, file_name: &str) -> Result<(), ToolError>;
}

/// Reads a gzip stream from `src` and writes the same payload xz-compressed to `dst`.
pub trait Recompressor: Send + Sync {
    fn gzip_to_xz(&self, src: &Path, dst: &Path) -> Result<(), ToolError>;
}

/// Sends `file` with `subject`.
pub trait Notifier: Send + Sync {
    fn send(&self, file: &Path, subject: &str) -> Result<(), ToolError>;
}

/// Locate `program` on PATH, or accept it as-is when it already names a path.
pub(crate) fn locate(program: &str) -> Result<PathBuf, ToolError> {
    which::which(program).map_err(|source| ToolError::NotFound {
        tool: program.to_string(),
        source,
    })
}

/// Run a prepared command to completion, inheriting stdio.
pub(crate) fn run_status(tool: &str, cmd: &mut std::process::Command) -> Result<(), ToolError> {
    tracing::debug!(?cmd, "running {tool}");
    let status = cmd.status().map_err(|source| ToolError::Spawn {
        tool: tool.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status,
        });
    }
    Ok(())
}
