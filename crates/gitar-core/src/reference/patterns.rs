//! Per-platform URL shapes, tried in declaration order.

use super::Platform;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Owner, repo and plain ref characters.
const NAME: &str = "[A-Za-z0-9_.-]";
/// Ref characters as they appear in a URL path (percent-escapes allowed).
const REF: &str = "(?:[A-Za-z0-9_.-]|%[0-9A-Fa-f]{2})";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlShape {
    /// `git@host:owner/repo.git`
    Ssh,
    /// `https://host/owner/repo[.git]`
    Https,
    /// `https://host/owner/repo/releases/tag/<ref>`
    ReleaseTag,
    /// `https://host/owner/repo/tree/<40-hex sha>`
    TreeCommit,
    /// `https://host/owner/repo/tree/<ref>`
    TreeRef,
}

pub struct PlatformPatterns {
    shapes: Vec<(UrlShape, Regex)>,
}

impl PlatformPatterns {
    fn new(host: &str) -> Self {
        let h = regex::escape(host);
        let repo_root = format!("^https://{h}/({NAME}+)/({NAME}+)");
        // TreeCommit must stay ahead of TreeRef: a 40-char hex string is also a
        // valid ref name.
        let shapes = [
            (UrlShape::Ssh, format!(r"^git@{h}:({NAME}+)/({NAME}+)\.git$")),
            (UrlShape::Https, format!(r"^https://{h}/({NAME}+)/({NAME}+?)(?:\.git)?$")),
            (UrlShape::ReleaseTag, format!("{repo_root}/releases/tag/({REF}+)$")),
            (UrlShape::TreeCommit, format!("{repo_root}/tree/([0-9a-fA-F]{{40}})$")),
            (UrlShape::TreeRef, format!("{repo_root}/tree/({REF}+)$")),
        ];
        Self {
            shapes: shapes
                .into_iter()
                .map(|(shape, re)| (shape, Regex::new(&re).expect("invalid regex")))
                .collect(),
        }
    }

    /// First matching shape and its captures (1 = owner, 2 = repo, 3 = ref/sha).
    pub fn match_url<'u>(&self, url: &'u str) -> Option<(UrlShape, Captures<'u>)> {
        self.shapes
            .iter()
            .find_map(|(shape, re)| re.captures(url).map(|c| (*shape, c)))
    }
}

static GITHUB: LazyLock<PlatformPatterns> =
    LazyLock::new(|| PlatformPatterns::new(Platform::GitHub.host()));
static GITEE: LazyLock<PlatformPatterns> =
    LazyLock::new(|| PlatformPatterns::new(Platform::Gitee.host()));

pub fn for_platform(platform: Platform) -> &'static PlatformPatterns {
    match platform {
        Platform::GitHub => &GITHUB,
        Platform::Gitee => &GITEE,
    }
}
