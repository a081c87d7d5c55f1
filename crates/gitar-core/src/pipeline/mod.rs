//! Download orchestration.
//!
//! One invocation walks: resolve, dedup check, commit lock, stage, record the
//! download, optional notify. Listing calls and external tools block, so they
//! run on the blocking pool; dedup facts are async (sqlx).

mod notify;
mod stage;


use crate::config::{FetchTool, GitarConfig, PathsConfig};
use crate::dedup::{DedupError, DedupStore, Namespace};
use crate::listing::{CurlListingClient, ListingClient};
use crate::lock::{CommitLock, LockError};
use crate::reference::{self, ParseError, Platform, RepoReference};
use crate::resolver::{ArchiveResolver, ResolveError, ResolvedArchive};
use crate::retry::RetryPolicy;
use crate::storage;
use crate::tools::{
    Aria2Fetcher, CommandNotifier, CurlFetcher, Fetcher, Notifier, Recompressor, XzRecompressor,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use notify::NotifyError;
pub use stage::{temp_names, StageError, Staged};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Dedup(#[from] DedupError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// External collaborators used while staging and notifying.
#[derive(Clone)]
pub struct Toolbox {
    pub fetcher: Arc<dyn Fetcher>,
    pub recompressor: Arc<dyn Recompressor>,
    pub notifier: Arc<dyn Notifier>,
}

impl Toolbox {
    pub fn from_config(cfg: &GitarConfig) -> Self {
        let fetcher: Arc<dyn Fetcher> = match cfg.download.tool {
            FetchTool::Aria2c => Arc::new(Aria2Fetcher::new(cfg.download.max_tries)),
            FetchTool::Curl => Arc::new(CurlFetcher::new(cfg.download.max_tries)),
        };
        Self {
            fetcher,
            recompressor: Arc::new(XzRecompressor::new(cfg.compress.program.clone())),
            notifier: Arc::new(CommandNotifier::new(
                cfg.notify.program.clone(),
                cfg.notify.profile.clone(),
            )),
        }
    }
}

/// Where archives land and where staging happens.
#[derive(Debug, Clone)]
pub struct Layout {
    pub repo_root: PathBuf,
    pub temp_dir: PathBuf,
}

impl Layout {
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            repo_root: paths.repo.clone(),
            temp_dir: paths.temp.clone(),
        }
    }

    /// `<repo_root>/<platform>/<owner>/<repo>/<name>.tar.xz`
    pub fn destination(&self, r: &RepoReference, archive: &ResolvedArchive) -> PathBuf {
        self.repo_root
            .join(r.platform.as_str())
            .join(&r.owner)
            .join(&r.repo)
            .join(format!("{}.tar.xz", archive.name))
    }
}

/// How the archive came to be on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// The commit was already recorded as downloaded; nothing was touched.
    AlreadyRecorded,
    /// The destination file already existed.
    AlreadyOnDisk,
    /// Fetched and recompressed in this run.
    Staged { gzip_bytes: u64, xz_bytes: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyOutcome {
    AlreadySent,
    Sent { attempts: u32 },
}

/// Outcome of a successful [`DownloadOrchestrator::run`].
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub reference: RepoReference,
    pub archive: ResolvedArchive,
    pub destination: PathBuf,
    pub disposition: Disposition,
    pub notification: Option<NotifyOutcome>,
}

/// Listing client built from config: API timeout plus per-platform tokens.
pub fn listing_client(cfg: &GitarConfig) -> CurlListingClient {
    CurlListingClient::new(Duration::from_secs(cfg.listing.timeout_secs))
        .with_token(Platform::GitHub, cfg.github.token.clone())
        .with_token(Platform::Gitee, cfg.gitee.token.clone())
}

/// Parse `url` and resolve it to a commit-pinned archive. Touches no local state.
pub async fn resolve(
    listing: Arc<dyn ListingClient>,
    retry: RetryPolicy,
    url: &str,
) -> Result<(RepoReference, ResolvedArchive), PipelineError> {
    let reference = reference::parse(url)?;
    tracing::debug!(?reference, "parsed");
    let archive = tokio::task::spawn_blocking({
        let reference = reference.clone();
        move || ArchiveResolver::new(&*listing, retry).resolve(&reference)
    })
    .await??;
    tracing::info!(name = %archive.name, commit = %archive.commit, "resolved");
    Ok((reference, archive))
}

pub struct DownloadOrchestrator {
    store: DedupStore,
    listing: Arc<dyn ListingClient>,
    tools: Toolbox,
    layout: Layout,
    listing_retry: RetryPolicy,
    notify_retry: RetryPolicy,
}

impl DownloadOrchestrator {
    pub fn new(
        store: DedupStore,
        listing: Arc<dyn ListingClient>,
        tools: Toolbox,
        layout: Layout,
    ) -> Self {
        Self {
            store,
            listing,
            tools,
            layout,
            listing_retry: RetryPolicy::listing(5),
            notify_retry: RetryPolicy::notify(999, Duration::from_secs(7200)),
        }
    }

    /// Store under `paths.data`, curl listing client, tools and retry limits from `cfg`.
    pub async fn from_config(cfg: &GitarConfig) -> Result<Self, PipelineError> {
        let store = DedupStore::open_in(&cfg.paths.data).await?;
        Ok(Self::new(
            store,
            Arc::new(listing_client(cfg)),
            Toolbox::from_config(cfg),
            Layout::from_config(&cfg.paths),
        )
        .with_listing_retry(RetryPolicy::listing(cfg.listing.max_attempts))
        .with_notify_retry(RetryPolicy::notify(
            cfg.notify.max_attempts,
            Duration::from_secs(cfg.notify.max_delay_secs),
        )))
    }

    pub fn with_listing_retry(mut self, retry: RetryPolicy) -> Self {
        self.listing_retry = retry;
        self
    }

    pub fn with_notify_retry(mut self, retry: RetryPolicy) -> Self {
        self.notify_retry = retry;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub async fn resolve(
        &self,
        url: &str,
    ) -> Result<(RepoReference, ResolvedArchive), PipelineError> {
        resolve(Arc::clone(&self.listing), self.listing_retry, url).await
    }

    /// Resolve `url`, place its archive in the repo tree and, when `notify` is
    /// set, mail it. Download and mail are recorded as separate facts.
    pub async fn run(&self, url: &str, notify: bool) -> Result<DownloadReport, PipelineError> {
        let (reference, archive) = self.resolve(url).await?;
        self.store
            .set(Namespace::Repo, &reference.repo_key())
            .await?;

        let destination = self.layout.destination(&reference, &archive);
        let commit = archive.commit.as_str();

        let downloaded = self
            .store
            .exists(Namespace::CommitDownloaded, commit)
            .await?;
        if downloaded && !notify {
            tracing::warn!(commit, "commit already downloaded, nothing to do");
            return Ok(DownloadReport {
                reference,
                archive,
                destination,
                disposition: Disposition::AlreadyRecorded,
                notification: None,
            });
        }

        let disposition = self.place(&archive, &destination).await?;

        if !downloaded {
            self.store
                .set(Namespace::CommitDownloaded, commit)
                .await?;
        }

        let notification = if notify {
            Some(self.notify(&reference, &archive, &destination).await?)
        } else {
            None
        };

        Ok(DownloadReport {
            reference,
            archive,
            destination,
            disposition,
            notification,
        })
    }

    /// Make sure the archive exists at `destination`, staging it under the
    /// commit lock when it does not.
    async fn place(
        &self,
        archive: &ResolvedArchive,
        destination: &Path,
    ) -> Result<Disposition, PipelineError> {
        if on_disk(destination)? {
            tracing::info!(dest = %destination.display(), "archive already on disk");
            return Ok(Disposition::AlreadyOnDisk);
        }

        let _lock = CommitLock::try_acquire(&self.layout.temp_dir, &archive.commit)?;
        // A concurrent run may have finished between the check and the lock.
        if on_disk(destination)? {
            tracing::info!(dest = %destination.display(), "archive placed by another run");
            return Ok(Disposition::AlreadyOnDisk);
        }

        let staged = tokio::task::spawn_blocking({
            let tools = self.tools.clone();
            let temp_dir = self.layout.temp_dir.clone();
            let archive = archive.clone();
            let destination = destination.to_path_buf();
            move || {
                stage::stage(
                    &*tools.fetcher,
                    &*tools.recompressor,
                    &temp_dir,
                    &archive,
                    &destination,
                )
            }
        })
        .await??;

        Ok(Disposition::Staged {
            gzip_bytes: staged.gzip_bytes,
            xz_bytes: staged.xz_bytes,
        })
    }

    async fn notify(
        &self,
        reference: &RepoReference,
        archive: &ResolvedArchive,
        destination: &Path,
    ) -> Result<NotifyOutcome, PipelineError> {
        let commit = archive.commit.as_str();
        if self.store.exists(Namespace::CommitMailed, commit).await? {
            tracing::warn!(commit, "archive already mailed, skipping");
            return Ok(NotifyOutcome::AlreadySent);
        }

        let subject = mail_subject(reference, archive);
        let attempts = notify::send_with_retry(
            Arc::clone(&self.tools.notifier),
            &self.notify_retry,
            destination.to_path_buf(),
            subject,
        )
        .await?;
        self.store.set(Namespace::CommitMailed, commit).await?;
        tracing::info!(commit, attempts, "archive mailed");
        Ok(NotifyOutcome::Sent { attempts })
    }
}

/// `<platform>:<owner>/<name>.tar.xz`
pub fn mail_subject(reference: &RepoReference, archive: &ResolvedArchive) -> String {
    format!(
        "{}:{}/{}.tar.xz",
        reference.platform, reference.owner, archive.name
    )
}

fn on_disk(path: &Path) -> Result<bool, StageError> {
    storage::file_exists(path)
        .map_err(|e| StageError::io(format!("check {}", path.display()), e))
}
