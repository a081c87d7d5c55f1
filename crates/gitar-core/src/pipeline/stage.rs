//! Staging: fetch the tarball into the temp area, recompress to xz, place it.

use crate::resolver::ResolvedArchive;
use crate::storage;
use crate::tools::{Fetcher, Recompressor, ToolError};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("download failed: {0}")]
    Fetch(#[source] ToolError),
    #[error("recompress failed: {0}")]
    Recompress(#[source] ToolError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StageError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Byte sizes of the fetched and recompressed artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staged {
    pub gzip_bytes: u64,
    pub xz_bytes: u64,
}

/// Temp file names for an archive: `(<name>-<commit>.tar.gz, <name>-<commit>.tar.xz)`.
pub fn temp_names(archive: &ResolvedArchive) -> (String, String) {
    let stem = format!("{}-{}", archive.name, archive.commit);
    (format!("{stem}.tar.gz"), format!("{stem}.tar.xz"))
}

fn file_len(path: &Path) -> Result<u64, StageError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| StageError::io(format!("stat {}", path.display()), e))
}

/// Run the staging sequence. The caller holds the commit lock.
///
/// Temp files are removed on failure; nothing is written to `dest` unless
/// every step succeeded.
pub fn stage(
    fetcher: &dyn Fetcher,
    recompressor: &dyn Recompressor,
    temp_dir: &Path,
    archive: &ResolvedArchive,
    dest: &Path,
) -> Result<Staged, StageError> {
    std::fs::create_dir_all(temp_dir)
        .map_err(|e| StageError::io(format!("create {}", temp_dir.display()), e))?;
    let (gz_name, xz_name) = temp_names(archive);
    let gz_path = temp_dir.join(&gz_name);
    let xz_path = temp_dir.join(&xz_name);
    // aria2c leaves `<out>.aria2` beside an interrupted download.
    let control_path = temp_dir.join(format!("{gz_name}.aria2"));
    let _cleanup = TempFiles([gz_path.clone(), xz_path.clone(), control_path.clone()]);

    for stale in [&gz_path, &xz_path, &control_path] {
        storage::remove_if_exists(stale)
            .map_err(|e| StageError::io(format!("remove stale {}", stale.display()), e))?;
    }

    tracing::info!(url = %archive.tar_url, "downloading");
    fetcher
        .fetch(&archive.tar_url, temp_dir, &gz_name)
        .map_err(StageError::Fetch)?;
    let gzip_bytes = file_len(&gz_path)?;
    tracing::info!(
        "downloaded {} ({})",
        gz_path.display(),
        storage::human_size(gzip_bytes)
    );

    recompressor
        .gzip_to_xz(&gz_path, &xz_path)
        .map_err(StageError::Recompress)?;
    let xz_bytes = file_len(&xz_path)?;
    tracing::info!(
        "recompressed {} ({})",
        xz_path.display(),
        storage::human_size(xz_bytes)
    );
    storage::remove_if_exists(&gz_path)
        .map_err(|e| StageError::io(format!("remove {}", gz_path.display()), e))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StageError::io(format!("create {}", parent.display()), e))?;
    }
    storage::move_file(&xz_path, dest).map_err(|e| {
        StageError::io(
            format!("move {} to {}", xz_path.display(), dest.display()),
            e,
        )
    })?;
    tracing::info!(dest = %dest.display(), "archive placed");

    Ok(Staged {
        gzip_bytes,
        xz_bytes,
    })
}

/// Removes leftover temp files when staging ends, whatever the outcome.
struct TempFiles([PathBuf; 3]);

impl Drop for TempFiles {
    fn drop(&mut self) {
        for p in &self.0 {
            if let Err(e) = storage::remove_if_exists(p) {
                tracing::warn!(path = %p.display(), "temp cleanup failed: {e}");
            }
        }
    }
}
