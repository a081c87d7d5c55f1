//! Archive resolution: turn a [`RepoReference`] into a commit-pinned
//! [`ResolvedArchive`].
//!
//! Precedence, first applicable wins:
//! 1. release/tag named in the reference,
//! 2. branch,
//! 3. commit (no remote call),
//! 4. auto-discovery: best release, else best branch.
//!
//! Every listing call runs under the listing retry policy, which retries
//! timeouts only.

mod archive;
mod pages;
mod select;

use crate::listing::{ListingClient, ListingError, RemoteBranch, RemoteTag};
use crate::reference::{Platform, RepoReference};
use crate::retry::{run_with_retry, RetryPolicy};
use serde::Serialize;

pub use archive::{branch_archive_name, commit_archive_name, short_sha, tag_archive_name};
pub use pages::{Search, MAX_PAGES};
pub use select::{best_branch, best_release, WELL_KNOWN_BRANCHES};

/// Commit-pinned downloadable archive. `commit` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArchive {
    pub platform: Platform,
    pub name: String,
    pub commit: String,
    pub tar_url: String,
    pub zip_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no tags fetched")]
    NoTagsFetched,
    #[error("no matched tag: {0}")]
    NoMatchedTag(String),
    #[error("no branches fetched")]
    NoBranchesFetched,
    #[error("no matched branch: {0}")]
    NoMatchedBranch(String),
    #[error("no commit found")]
    NoCommitFound,
    #[error("could not resolve archive: repository has no releases or branches")]
    NoResolvableRef,
    #[error(transparent)]
    Listing(#[from] ListingError),
}

/// Resolver bound to a listing client and a retry policy for its calls.
pub struct ArchiveResolver<'a, C: ListingClient + ?Sized> {
    client: &'a C,
    retry: RetryPolicy,
}

impl<'a, C: ListingClient + ?Sized> ArchiveResolver<'a, C> {
    pub fn new(client: &'a C, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn resolve(&self, r: &RepoReference) -> Result<ResolvedArchive, ResolveError> {
        if let Some(tag) = r.tag_name() {
            return self.resolve_by_tag(r, tag);
        }
        if let Some(branch) = r.branch.as_deref() {
            return self.resolve_by_branch(r, branch);
        }
        if let Some(commit) = r.commit.as_deref() {
            return archive::by_commit(r, commit);
        }

        let release =
            best_release(|page| self.call(|c| c.list_releases(r.platform, &r.owner, &r.repo, page)))?;
        if let Some(release) = release {
            tracing::debug!(tag = %release.tag_name, "auto-selected release");
            return self.resolve_by_tag(r, &release.tag_name);
        }

        let branch =
            best_branch(|page| self.call(|c| c.list_branches(r.platform, &r.owner, &r.repo, page)))?;
        match branch {
            Some(branch) => {
                tracing::debug!(branch = %branch.name, "auto-selected branch");
                archive::by_branch(r, &branch)
            }
            None => Err(ResolveError::NoResolvableRef),
        }
    }

    fn resolve_by_tag(&self, r: &RepoReference, tag: &str) -> Result<ResolvedArchive, ResolveError> {
        let fetch = |page| self.call(|c| c.list_tags(r.platform, &r.owner, &r.repo, page));
        match pages::find(fetch, |t: &RemoteTag| t.name == tag)? {
            Search::Found(found) => archive::by_tag(r, tag, &found.commit_sha),
            Search::Exhausted { fetched_any: false } => Err(ResolveError::NoTagsFetched),
            Search::Exhausted { .. } => Err(ResolveError::NoMatchedTag(tag.to_string())),
        }
    }

    fn resolve_by_branch(
        &self,
        r: &RepoReference,
        branch: &str,
    ) -> Result<ResolvedArchive, ResolveError> {
        let fetch = |page| self.call(|c| c.list_branches(r.platform, &r.owner, &r.repo, page));
        match pages::find(fetch, |b: &RemoteBranch| b.name == branch)? {
            Search::Found(found) => archive::by_branch(r, &found),
            Search::Exhausted { fetched_any: false } => Err(ResolveError::NoBranchesFetched),
            Search::Exhausted { .. } => Err(ResolveError::NoMatchedBranch(branch.to_string())),
        }
    }

    fn call<T>(
        &self,
        f: impl Fn(&C) -> Result<Vec<T>, ListingError>,
    ) -> Result<Vec<T>, ListingError> {
        run_with_retry(&self.retry, ListingError::retry_kind, |_| f(self.client))
    }
}

#[cfg(test)]
mod tests;
