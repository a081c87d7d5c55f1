//! File placement helpers for staged archives.

use std::io;
use std::path::Path;

/// True if `path` exists and is not a directory.
pub fn file_exists(path: &Path) -> io::Result<bool> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(!meta.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a file if present.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Move `src` to `dst`: a plain rename when both are on the same filesystem,
/// copy then remove otherwise.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "rename failed ({e}), falling back to copy"
            );
            std::fs::copy(src, dst)?;
            std::fs::remove_file(src)
        }
    }
}

/// Human-readable size in binary units (`512 B`, `1.50 KiB`, `3.00 MiB`).
pub fn human_size(bytes: u64) -> String {
    const SCALE: u64 = 1024;
    const UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    if bytes < SCALE {
        return format!("{bytes} B");
    }
    let mut div = SCALE;
    let mut exp = 0;
    let mut n = bytes / SCALE;
    while n >= SCALE {
        div *= SCALE;
        exp += 1;
        n /= SCALE;
    }
    format!("{:.2} {}iB", bytes as f64 / div as f64, UNITS[exp])
}
