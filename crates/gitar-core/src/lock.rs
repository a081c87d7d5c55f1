//! Commit-scoped cross-process lock.
//!
//! An advisory exclusive lock (`flock` on Unix, `LockFileEx` on Windows via
//! `fs2`) on `<temp>/<commit>.lock`. Acquisition is try-once: if another
//! process holds the lock the caller gets [`LockError::Held`] immediately.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("locked: {} (another gitar run is staging this commit)", path.display())]
    Held { path: PathBuf },
    #[error("cannot open lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lock file path for a commit.
pub fn lock_path(temp_dir: &Path, commit: &str) -> PathBuf {
    temp_dir.join(format!("{commit}.lock"))
}

/// RAII guard: holds the lock until dropped.
///
/// The lock file stays on disk after release; unlinking it would let two
/// processes lock different inodes at the same path.
#[derive(Debug)]
pub struct CommitLock {
    file: File,
    path: PathBuf,
}

impl CommitLock {
    /// Try once to take the lock for `commit` under `temp_dir` (created if missing).
    pub fn try_acquire(temp_dir: &Path, commit: &str) -> Result<Self, LockError> {
        let path = lock_path(temp_dir, commit);
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(temp_dir).map_err(io_err)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_err)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "commit lock acquired");
                Ok(Self { file, path })
            }
            Err(e) if is_contended(&e) => Err(LockError::Held { path }),
            Err(e) => Err(io_err(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for CommitLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::error!(path = %self.path.display(), "unlock failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn second_acquire_fails_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let first = CommitLock::try_acquire(dir.path(), SHA).unwrap();
        assert!(first.path().exists());
        match CommitLock::try_acquire(dir.path(), SHA) {
            Err(LockError::Held { path }) => assert_eq!(path, lock_path(dir.path(), SHA)),
            other => panic!("expected Held, got {other:?}"),
        }
    }

    #[test]
    fn released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _guard = CommitLock::try_acquire(dir.path(), SHA).unwrap();
        }
        assert!(lock_path(dir.path(), SHA).exists());
        let again = CommitLock::try_acquire(dir.path(), SHA);
        assert!(again.is_ok());
    }

    #[test]
    fn handle_opened_before_release_excludes_later_acquirers() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(dir.path(), SHA);
        let first = CommitLock::try_acquire(dir.path(), SHA).unwrap();
        let early = OpenOptions::new().write(true).open(&path).unwrap();
        drop(first);

        early.try_lock_exclusive().unwrap();
        match CommitLock::try_acquire(dir.path(), SHA) {
            Err(LockError::Held { .. }) => {}
            other => panic!("two holders of the same commit lock: {other:?}"),
        }
        FileExt::unlock(&early).unwrap();
        assert!(CommitLock::try_acquire(dir.path(), SHA).is_ok());
    }

    #[test]
    fn different_commits_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let _a = CommitLock::try_acquire(dir.path(), "aaaa").unwrap();
        let _b = CommitLock::try_acquire(dir.path(), "bbbb").unwrap();
    }

    #[test]
    fn creates_missing_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("tmp").join("gitar");
        let guard = CommitLock::try_acquire(&temp, SHA).unwrap();
        assert!(guard.path().starts_with(&temp));
    }
}
