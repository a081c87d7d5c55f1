//! Archive naming and URL construction.

use super::{ResolveError, ResolvedArchive};
use crate::listing::RemoteBranch;
use crate::reference::RepoReference;

/// First seven characters of a SHA (or the whole string if shorter).
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// `<repo>-<tag>`, or the tag alone when it already starts with the repo name.
pub fn tag_archive_name(repo: &str, tag: &str) -> String {
    let name = if tag.starts_with(repo) {
        tag.to_string()
    } else {
        format!("{repo}-{tag}")
    };
    name.replace('/', "-")
}

/// `<repo>-<branch>-<sha7>`
pub fn branch_archive_name(repo: &str, branch: &str, sha: &str) -> String {
    format!("{repo}-{branch}-{}", short_sha(sha)).replace('/', "-")
}

/// `<repo>-<sha7>`
pub fn commit_archive_name(repo: &str, sha: &str) -> String {
    format!("{repo}-{}", short_sha(sha))
}

// Tag archives use the tag URL so the downloaded filename stays readable.
pub(super) fn by_tag(
    r: &RepoReference,
    tag: &str,
    sha: &str,
) -> Result<ResolvedArchive, ResolveError> {
    let stem = r.platform.tag_archive_stem(&r.owner, &r.repo, tag);
    validated(ResolvedArchive {
        platform: r.platform,
        name: tag_archive_name(&r.repo, tag),
        commit: sha.to_string(),
        tar_url: format!("{stem}.tar.gz"),
        zip_url: format!("{stem}.zip"),
    })
}

// Branch archives are pinned to the SHA seen in the listing, not the branch
// name, so the stored artifact matches the recorded commit.
pub(super) fn by_branch(
    r: &RepoReference,
    branch: &RemoteBranch,
) -> Result<ResolvedArchive, ResolveError> {
    let sha = branch.commit_sha.as_str();
    let stem = r.platform.commit_archive_stem(&r.owner, &r.repo, sha);
    validated(ResolvedArchive {
        platform: r.platform,
        name: branch_archive_name(&r.repo, &branch.name, sha),
        commit: sha.to_string(),
        tar_url: format!("{stem}.tar.gz"),
        zip_url: format!("{stem}.zip"),
    })
}

pub(super) fn by_commit(r: &RepoReference, sha: &str) -> Result<ResolvedArchive, ResolveError> {
    let stem = r.platform.commit_archive_stem(&r.owner, &r.repo, sha);
    validated(ResolvedArchive {
        platform: r.platform,
        name: commit_archive_name(&r.repo, sha),
        commit: sha.to_string(),
        tar_url: format!("{stem}.tar.gz"),
        zip_url: format!("{stem}.zip"),
    })
}

fn validated(arc: ResolvedArchive) -> Result<ResolvedArchive, ResolveError> {
    if arc.commit.is_empty() {
        return Err(ResolveError::NoCommitFound);
    }
    Ok(arc)
}
