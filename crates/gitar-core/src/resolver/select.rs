//! Auto-discovery when the reference names no tag, branch or commit.

use super::pages;
use crate::listing::{ListingError, RemoteBranch, RemoteRelease};

/// Branch names preferred by auto-discovery, in no particular order.
pub const WELL_KNOWN_BRANCHES: [&str; 5] = ["master", "main", "trunk", "release", "develop"];

/// First release that is neither draft nor prerelease. If none exists, the
/// first non-prerelease seen, else the first release seen, else `None`.
pub fn best_release<F>(fetch: F) -> Result<Option<RemoteRelease>, ListingError>
where
    F: FnMut(u32) -> Result<Vec<RemoteRelease>, ListingError>,
{
    let mut seen = Vec::new();
    let stable = pages::scan(fetch, |rel: RemoteRelease| {
        if !rel.draft && !rel.prerelease {
            Some(rel)
        } else {
            seen.push(rel);
            None
        }
    })?;
    if stable.is_some() {
        return Ok(stable);
    }
    if let Some(i) = seen.iter().position(|r| !r.prerelease) {
        return Ok(Some(seen.swap_remove(i)));
    }
    Ok(seen.into_iter().next())
}

/// First branch with a well-known name. If none exists, the first
/// `release/*` or `release-*` branch, else the first branch, else `None`.
pub fn best_branch<F>(fetch: F) -> Result<Option<RemoteBranch>, ListingError>
where
    F: FnMut(u32) -> Result<Vec<RemoteBranch>, ListingError>,
{
    let mut seen = Vec::new();
    let known = pages::scan(fetch, |b: RemoteBranch| {
        if WELL_KNOWN_BRANCHES.contains(&b.name.as_str()) {
            Some(b)
        } else {
            seen.push(b);
            None
        }
    })?;
    if known.is_some() {
        return Ok(known);
    }
    if let Some(i) = seen
        .iter()
        .position(|b| b.name.starts_with("release/") || b.name.starts_with("release-"))
    {
        return Ok(Some(seen.swap_remove(i)));
    }
    Ok(seen.into_iter().next())
}
