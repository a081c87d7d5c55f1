//! libcurl-backed listing client for the GitHub and Gitee REST APIs.

use super::{ListingClient, ListingError, RemoteBranch, RemoteRelease, RemoteTag, PER_PAGE};
use crate::reference::Platform;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const GITHUB_API: &str = "https://api.github.com";
pub const GITEE_API: &str = "https://gitee.com/api/v5";

const USER_AGENT: &str = concat!("gitar/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct CommitRef {
    #[serde(default)]
    sha: String,
}

#[derive(Deserialize)]
struct WireRef {
    name: String,
    commit: CommitRef,
}

#[derive(Deserialize)]
struct WireRelease {
    tag_name: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
}

/// Blocking listing client. Each call carries its own connect and total
/// timeout; a timed-out call surfaces as [`ListingError::Timeout`].
#[derive(Debug, Clone)]
pub struct CurlListingClient {
    github_api: String,
    gitee_api: String,
    github_token: Option<String>,
    gitee_token: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
}

impl Default for CurlListingClient {
    fn default() -> Self {
        Self {
            github_api: GITHUB_API.to_string(),
            gitee_api: GITEE_API.to_string(),
            github_token: None,
            gitee_token: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl CurlListingClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout,
            ..Self::default()
        }
    }

    pub fn with_token(mut self, platform: Platform, token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        match platform {
            Platform::GitHub => self.github_token = token,
            Platform::Gitee => self.gitee_token = token,
        }
        self
    }

    /// Override the REST base for a platform (e.g. a local test server).
    pub fn with_api_base(mut self, platform: Platform, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        match platform {
            Platform::GitHub => self.github_api = base,
            Platform::Gitee => self.gitee_api = base,
        }
        self
    }

    fn endpoint(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        kind: &str,
        page: u32,
    ) -> Result<Url, ListingError> {
        let base = match platform {
            Platform::GitHub => &self.github_api,
            Platform::Gitee => &self.gitee_api,
        };
        let mut url = Url::parse(&format!("{base}/repos/{owner}/{repo}/{kind}"))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &PER_PAGE.to_string());
        if let (Platform::Gitee, Some(token)) = (platform, &self.gitee_token) {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, platform: Platform, url: Url) -> Result<T, ListingError> {
        let url_str = url.to_string();
        let transport = |source: curl::Error| {
            if source.is_operation_timedout() {
                ListingError::Timeout {
                    url: url_str.clone(),
                }
            } else {
                ListingError::Transport {
                    url: url_str.clone(),
                    source,
                }
            }
        };

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).map_err(transport)?;
        easy.follow_location(true).map_err(transport)?;
        easy.connect_timeout(self.connect_timeout).map_err(transport)?;
        easy.timeout(self.timeout).map_err(transport)?;
        easy.useragent(USER_AGENT).map_err(transport)?;

        let mut headers = curl::easy::List::new();
        headers
            .append(&format!("Accept: {}", accept(platform)))
            .map_err(transport)?;
        if let (Platform::GitHub, Some(token)) = (platform, &self.github_token) {
            headers
                .append(&format!("Authorization: Bearer {token}"))
                .map_err(transport)?;
        }
        easy.http_headers(headers).map_err(transport)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(transport)?;
            transfer.perform().map_err(transport)?;
        }

        let status = easy.response_code().map_err(transport)?;
        if !(200..300).contains(&status) {
            return Err(ListingError::Http {
                url: url_str,
                status,
            });
        }
        tracing::debug!(url = %url_str, bytes = body.len(), "listing page fetched");
        serde_json::from_slice(&body).map_err(|source| ListingError::Decode {
            url: url_str,
            source,
        })
    }
}

/// Media type requested from each platform's API.
fn accept(platform: Platform) -> &'static str {
    match platform {
        Platform::GitHub => "application/vnd.github+json",
        Platform::Gitee => "application/json",
    }
}

impl ListingClient for CurlListingClient {
    fn list_tags(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<RemoteTag>, ListingError> {
        let url = self.endpoint(platform, owner, repo, "tags", page)?;
        let items: Vec<WireRef> = self.get_json(platform, url)?;
        Ok(items
            .into_iter()
            .map(|t| RemoteTag {
                name: t.name,
                commit_sha: t.commit.sha,
            })
            .collect())
    }

    fn list_branches(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<RemoteBranch>, ListingError> {
        let url = self.endpoint(platform, owner, repo, "branches", page)?;
        let items: Vec<WireRef> = self.get_json(platform, url)?;
        Ok(items
            .into_iter()
            .map(|b| RemoteBranch {
                name: b.name,
                commit_sha: b.commit.sha,
            })
            .collect())
    }

    fn list_releases(
        &self,
        platform: Platform,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<RemoteRelease>, ListingError> {
        let url = self.endpoint(platform, owner, repo, "releases", page)?;
        let items: Vec<WireRelease> = self.get_json(platform, url)?;
        Ok(items
            .into_iter()
            .map(|r| RemoteRelease {
                tag_name: r.tag_name,
                draft: r.draft,
                prerelease: r.prerelease,
            })
            .collect())
    }
}
