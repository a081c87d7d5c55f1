//! Repository reference parsing.
//!
//! Turns a human-supplied repository URL (SSH shorthand, plain HTTPS, release
//! page, tree of a commit or of a ref) into a typed [`RepoReference`]. No I/O.

mod patterns;

use serde::Serialize;
use std::fmt;

pub use patterns::UrlShape;

/// Hosting platforms gitar knows how to resolve archives for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    GitHub,
    Gitee,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::GitHub, Platform::Gitee];

    /// Short lowercase name, used in paths, dedup keys and mail subjects.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::GitHub => "github",
            Platform::Gitee => "gitee",
        }
    }

    pub fn host(self) -> &'static str {
        match self {
            Platform::GitHub => "github.com",
            Platform::Gitee => "gitee.com",
        }
    }

    /// Base of the web archive endpoint; a ref or SHA plus `.tar.gz`/`.zip` follows.
    pub(crate) fn archive_base(self, owner: &str, repo: &str) -> String {
        match self {
            Platform::GitHub => format!("https://github.com/{owner}/{repo}/archive"),
            Platform::Gitee => format!("https://gitee.com/{owner}/{repo}/repository/archive"),
        }
    }

    /// Archive URL stem for a tag (GitHub uses the fully qualified ref so the
    /// downloaded filename keeps the tag name). Each `/`-separated segment of
    /// the tag is percent-encoded.
    pub(crate) fn tag_archive_stem(self, owner: &str, repo: &str, tag: &str) -> String {
        let base = self.archive_base(owner, repo);
        let tag = tag
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        match self {
            Platform::GitHub => format!("{base}/refs/tags/{tag}"),
            Platform::Gitee => format!("{base}/{tag}"),
        }
    }

    pub(crate) fn commit_archive_stem(self, owner: &str, repo: &str, sha: &str) -> String {
        format!("{}/{sha}", self.archive_base(owner, repo))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a URL could not be turned into a [`RepoReference`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("url is empty")]
    EmptyInput,
    #[error("unsupported url {0}: host is neither github.com nor gitee.com")]
    UnsupportedHost(String),
    #[error("unsupported {platform} url {url}")]
    UnsupportedUrlShape { platform: Platform, url: String },
}

/// Parsed description of which part of a repository the user wants.
///
/// `release` and `tag` come from the same capture on release pages and are
/// treated as one. At most one of {release/tag, branch, commit} is set by the
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReference {
    pub platform: Platform,
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub release: Option<String>,
    pub tag: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub ref_name: Option<String>,
}

impl RepoReference {
    fn bare(platform: Platform, owner: &str, repo: &str) -> Self {
        Self {
            platform,
            host: platform.host().to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            release: None,
            tag: None,
            branch: None,
            commit: None,
            ref_name: None,
        }
    }

    /// Tag to resolve, if the reference names a release or tag. Release wins
    /// when both are present.
    pub fn tag_name(&self) -> Option<&str> {
        self.release
            .as_deref()
            .or(self.tag.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Key for the `repo` dedup namespace: `github:owner/repo`.
    pub fn repo_key(&self) -> String {
        format!("{}:{}/{}", self.platform, self.owner, self.repo)
    }
}

/// Parse a repository URL.
///
/// The platform is picked by host substring, then the platform's URL shapes
/// are tried in order and the first match wins.
pub fn parse(url: &str) -> Result<RepoReference, ParseError> {
    if url.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let platform = Platform::ALL
        .into_iter()
        .find(|p| url.contains(p.host()))
        .ok_or_else(|| ParseError::UnsupportedHost(url.to_string()))?;
    parse_for(platform, url)
}

fn parse_for(platform: Platform, url: &str) -> Result<RepoReference, ParseError> {
    let unsupported = || ParseError::UnsupportedUrlShape {
        platform,
        url: url.to_string(),
    };

    let (shape, caps) = patterns::for_platform(platform)
        .match_url(url)
        .ok_or_else(unsupported)?;
    // Owner and repo become path components of the archive destination.
    if [&caps[1], &caps[2]].into_iter().any(|part| part == "." || part == "..") {
        return Err(unsupported());
    }
    let mut info = RepoReference::bare(platform, &caps[1], &caps[2]);

    match shape {
        UrlShape::Ssh | UrlShape::Https => {}
        UrlShape::ReleaseTag => {
            let tag = decode_ref(&caps[3]).ok_or_else(unsupported)?;
            info.release = Some(tag.clone());
            info.tag = Some(tag);
        }
        UrlShape::TreeCommit => {
            info.commit = Some(caps[3].to_ascii_lowercase());
        }
        UrlShape::TreeRef => {
            let name = decode_ref(&caps[3]).ok_or_else(unsupported)?;
            info.branch = Some(name.clone());
            info.ref_name = Some(name);
        }
    }
    Ok(info)
}

/// Percent-decode a ref captured from a URL path. Invalid UTF-8 or an empty
/// result is rejected.
fn decode_ref(raw: &str) -> Option<String> {
    urlencoding::decode(raw)
        .ok()
        .map(|s| s.into_owned())
        .filter(|s| !s.is_empty())
}
