//! Remote listing API: tags, branches and releases of a repository.
//!
//! [`ListingClient`] is the seam the resolver depends on; [`CurlListingClient`]
//! talks to the GitHub and Gitee REST APIs, tests substitute in-memory fakes.

mod http;

use crate::reference::Platform;
use crate::retry::ErrorKind;

pub use http::CurlListingClient;

/// Items requested per listing page.
pub const PER_PAGE: u32 = 100;

/// A tag and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTag {
    pub name: String,
    pub commit_sha: String,
}

/// A branch and its head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    pub name: String,
    pub commit_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub tag_name: String,
    pub draft: bool,
    pub prerelease: bool,
}

/// Failure of a single listing call.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing request timed out: {url}")]
    Timeout { url: String },
    #[error("listing request {url} returned HTTP {status}")]
    Http { url: String, status: u32 },
    #[error("listing request {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("listing response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid listing url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ListingError {
    /// Only timeouts are transient for listing calls; everything else
    /// propagates without retry.
    pub fn retry_kind(&self) -> ErrorKind {
        match self {
            ListingError::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Other,
        }
    }
}

/// Paginated listing of a repository's refs. Pages are 1-based; an empty page
/// means the listing is exhausted.
pub trait ListingClient: Send + Sync {
    fn list_tags(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<RemoteTag>, ListingError>;

    fn list_branches(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<RemoteBranch>, ListingError>;

    fn list_releases(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<RemoteRelease>, ListingError>;
}
