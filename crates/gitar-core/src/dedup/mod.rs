//! Persistent dedup facts (SQLite via sqlx).
//!
//! Append-only ledger of "already processed" markers in three independent
//! namespaces. Facts are never cleared by normal operation and have no TTL.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// File name of the store under the data directory.
pub const STORE_FILE: &str = "gitar.sqlite";

/// Independent fact spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Repositories seen (`github:owner/repo`).
    Repo,
    /// Commits whose archive has been placed in the repo tree.
    CommitDownloaded,
    /// Commits whose archive has been mailed.
    CommitMailed,
}

impl Namespace {
    fn table(self) -> &'static str {
        match self {
            Namespace::Repo => "git_repo",
            Namespace::CommitDownloaded => "commit_downloaded",
            Namespace::CommitMailed => "commit_mailed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("dedup store: {0}")]
pub struct DedupError(#[from] sqlx::Error);

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed fact store.
#[derive(Clone)]
pub struct DedupStore {
    pool: Pool<Sqlite>,
}

impl DedupStore {
    /// Open (or create) the store at `<data_dir>/gitar.sqlite`.
    pub async fn open_in(data_dir: impl AsRef<Path>) -> Result<Self, DedupError> {
        Self::open_at(data_dir.as_ref().join(STORE_FILE)).await
    }

    /// Open (or create) the store at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self, DedupError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DedupError(sqlx::Error::Io(e)))?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await?;
        let store = DedupStore { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "dedup store opened");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), DedupError> {
        for ns in [Namespace::Repo, Namespace::CommitDownloaded, Namespace::CommitMailed] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS [{}] ([{}] TEXT NOT NULL PRIMARY KEY)",
                ns.table(),
                key_column(ns)
            ))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Whether `key` has been recorded in `ns`.
    pub async fn exists(&self, ns: Namespace, key: &str) -> Result<bool, DedupError> {
        let sql = format!(
            "SELECT count(*) FROM [{}] WHERE [{}] = ?1",
            ns.table(),
            key_column(ns)
        );
        let (count,): (i64,) = sqlx::query_as(&sql).bind(key).fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    /// Record `key` in `ns`. Recording an existing key is a no-op.
    pub async fn set(&self, ns: Namespace, key: &str) -> Result<(), DedupError> {
        let sql = format!(
            "INSERT OR IGNORE INTO [{}] ([{}]) VALUES (?1)",
            ns.table(),
            key_column(ns)
        );
        sqlx::query(&sql).bind(key).execute(&self.pool).await?;
        Ok(())
    }
}

fn key_column(ns: Namespace) -> &'static str {
    match ns {
        Namespace::Repo => "repo",
        Namespace::CommitDownloaded | Namespace::CommitMailed => "id",
    }
}

#[cfg(test)]
/// Open an in-memory store for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<DedupStore, DedupError> {
    // Single connection to avoid the pool handing back a different empty DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = DedupStore { pool };
    store.migrate().await?;
    Ok(store)
}
