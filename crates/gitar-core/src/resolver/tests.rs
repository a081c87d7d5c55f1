use super::*;
use crate::listing::RemoteRelease;
use crate::reference::parse;
use crate::retry::Backoff;
use std::sync::Mutex;
use std::time::Duration;

const SHA_A: &str = "aaaaaaa111111111111111111111111111111111";
const SHA_B: &str = "bbbbbbb222222222222222222222222222222222";

/// In-memory listing: fixed pages per kind, optional leading timeouts, call counts.
#[derive(Default)]
struct FakeListing {
    tags: Vec<Vec<RemoteTag>>,
    branches: Vec<Vec<RemoteBranch>>,
    releases: Vec<Vec<RemoteRelease>>,
    timeouts_before_success: Mutex<u32>,
    calls: Mutex<Vec<(&'static str, u32)>>,
}

impl FakeListing {
    fn page<T: Clone>(&self, kind: &'static str, data: &[Vec<T>], page: u32) -> Result<Vec<T>, ListingError> {
        self.calls.lock().unwrap().push((kind, page));
        let mut pending = self.timeouts_before_success.lock().unwrap();
        if *pending > 0 {
            *pending -= 1;
            return Err(ListingError::Timeout { url: kind.into() });
        }
        Ok(data.get(page as usize - 1).cloned().unwrap_or_default())
    }

    fn calls_of(&self, kind: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl ListingClient for FakeListing {
    fn list_tags(&self, _: Platform, _: &str, _: &str, page: u32) -> Result<Vec<RemoteTag>, ListingError> {
        self.page("tags", &self.tags, page)
    }

    fn list_branches(&self, _: Platform, _: &str, _: &str, page: u32) -> Result<Vec<RemoteBranch>, ListingError> {
        self.page("branches", &self.branches, page)
    }

    fn list_releases(&self, _: Platform, _: &str, _: &str, page: u32) -> Result<Vec<RemoteRelease>, ListingError> {
        self.page("releases", &self.releases, page)
    }
}

fn tag(name: &str, sha: &str) -> RemoteTag {
    RemoteTag {
        name: name.into(),
        commit_sha: sha.into(),
    }
}

fn branch(name: &str, sha: &str) -> RemoteBranch {
    RemoteBranch {
        name: name.into(),
        commit_sha: sha.into(),
    }
}

fn release(tag: &str, prerelease: bool) -> RemoteRelease {
    RemoteRelease {
        tag_name: tag.into(),
        draft: false,
        prerelease,
    }
}

fn no_wait(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: Backoff::Exponential {
            base: Duration::ZERO,
            max: Duration::ZERO,
        },
    }
}

fn resolve(fake: &FakeListing, url: &str) -> Result<ResolvedArchive, ResolveError> {
    ArchiveResolver::new(fake, no_wait(3)).resolve(&parse(url).unwrap())
}

#[test]
fn explicit_tag_beats_auto_discovered_release() {
    let fake = FakeListing {
        tags: vec![vec![tag("v2.0", SHA_B), tag("v1.0", SHA_A)]],
        releases: vec![vec![release("v2.0", false)]],
        ..Default::default()
    };
    let arc = resolve(&fake, "https://github.com/o/foo/releases/tag/v1.0").unwrap();
    assert_eq!(arc.commit, SHA_A);
    assert_eq!(arc.name, "foo-v1.0");
    assert_eq!(arc.tar_url, "https://github.com/o/foo/archive/refs/tags/v1.0.tar.gz");
    assert_eq!(arc.zip_url, "https://github.com/o/foo/archive/refs/tags/v1.0.zip");
    assert_eq!(fake.calls_of("releases"), 0);
}

#[test]
fn tag_found_on_second_page() {
    let fake = FakeListing {
        tags: vec![vec![tag("a", SHA_B)], vec![tag("foo-1.2", SHA_A)]],
        ..Default::default()
    };
    let arc = resolve(&fake, "https://github.com/o/foo/releases/tag/foo-1.2").unwrap();
    assert_eq!(arc.name, "foo-1.2");
    assert_eq!(fake.calls_of("tags"), 2);
}

#[test]
fn missing_tag_errors() {
    let fake = FakeListing::default();
    assert!(matches!(
        resolve(&fake, "https://github.com/o/foo/releases/tag/v9"),
        Err(ResolveError::NoTagsFetched)
    ));

    let fake = FakeListing {
        tags: vec![vec![tag("v1", SHA_A)]],
        ..Default::default()
    };
    match resolve(&fake, "https://github.com/o/foo/releases/tag/v9") {
        Err(ResolveError::NoMatchedTag(t)) => assert_eq!(t, "v9"),
        other => panic!("expected NoMatchedTag, got {other:?}"),
    }
}

#[test]
fn tag_with_empty_sha_has_no_commit() {
    let fake = FakeListing {
        tags: vec![vec![tag("v1", "")]],
        ..Default::default()
    };
    assert!(matches!(
        resolve(&fake, "https://github.com/o/foo/releases/tag/v1"),
        Err(ResolveError::NoCommitFound)
    ));
}

#[test]
fn branch_resolves_to_commit_pinned_urls() {
    let fake = FakeListing {
        branches: vec![vec![branch("main", SHA_B), branch("feature/x", SHA_A)]],
        ..Default::default()
    };
    let arc = resolve(&fake, "https://github.com/o/foo/tree/feature%2Fx").unwrap();
    assert_eq!(arc.name, "foo-feature-x-aaaaaaa");
    assert_eq!(arc.commit, SHA_A);
    assert_eq!(arc.tar_url, format!("https://github.com/o/foo/archive/{SHA_A}.tar.gz"));
}

#[test]
fn missing_branch_errors() {
    let fake = FakeListing::default();
    assert!(matches!(
        resolve(&fake, "https://github.com/o/foo/tree/dev"),
        Err(ResolveError::NoBranchesFetched)
    ));
    let fake = FakeListing {
        branches: vec![vec![branch("main", SHA_A)]],
        ..Default::default()
    };
    assert!(matches!(
        resolve(&fake, "https://github.com/o/foo/tree/dev"),
        Err(ResolveError::NoMatchedBranch(_))
    ));
}

#[test]
fn commit_needs_no_remote_call() {
    let fake = FakeListing::default();
    let arc = resolve(&fake, &format!("https://gitee.com/o/foo/tree/{SHA_A}")).unwrap();
    assert_eq!(arc.name, "foo-aaaaaaa");
    assert_eq!(arc.platform, Platform::Gitee);
    assert_eq!(arc.tar_url, format!("https://gitee.com/o/foo/repository/archive/{SHA_A}.tar.gz"));
    assert!(fake.calls.lock().unwrap().is_empty());
}

#[test]
fn auto_discovery_prefers_stable_release() {
    let fake = FakeListing {
        releases: vec![vec![release("v2-rc", true), release("v1", false)]],
        tags: vec![vec![tag("v2-rc", SHA_B), tag("v1", SHA_A)]],
        branches: vec![vec![branch("main", SHA_B)]],
        ..Default::default()
    };
    let arc = resolve(&fake, "https://github.com/o/foo").unwrap();
    assert_eq!(arc.name, "foo-v1");
    assert_eq!(arc.commit, SHA_A);
    assert_eq!(fake.calls_of("branches"), 0);
}

#[test]
fn auto_discovery_falls_back_to_best_branch() {
    let fake = FakeListing {
        branches: vec![vec![branch("feature", SHA_B), branch("trunk", SHA_A)]],
        ..Default::default()
    };
    let arc = resolve(&fake, "git@github.com:o/foo.git").unwrap();
    assert_eq!(arc.name, "foo-trunk-aaaaaaa");
    assert_eq!(arc.commit, SHA_A);
}

#[test]
fn empty_repository_is_unresolvable() {
    let fake = FakeListing::default();
    assert!(matches!(
        resolve(&fake, "https://github.com/o/foo"),
        Err(ResolveError::NoResolvableRef)
    ));
}

#[test]
fn timeouts_are_retried_transparently() {
    let fake = FakeListing {
        tags: vec![vec![tag("v1", SHA_A)]],
        timeouts_before_success: Mutex::new(2),
        ..Default::default()
    };
    let arc = resolve(&fake, "https://github.com/o/foo/releases/tag/v1").unwrap();
    assert_eq!(arc.commit, SHA_A);
    assert_eq!(fake.calls_of("tags"), 3);
}

#[test]
fn persistent_timeouts_surface_after_ceiling() {
    let fake = FakeListing {
        tags: vec![vec![tag("v1", SHA_A)]],
        timeouts_before_success: Mutex::new(10),
        ..Default::default()
    };
    let err = resolve(&fake, "https://github.com/o/foo/releases/tag/v1").unwrap_err();
    assert!(matches!(err, ResolveError::Listing(ListingError::Timeout { .. })));
    assert_eq!(fake.calls_of("tags"), 3);
}

/// Listing that always fails with a non-timeout error.
struct Forbidden(Mutex<u32>);

impl ListingClient for Forbidden {
    fn list_tags(&self, _: Platform, _: &str, _: &str, _: u32) -> Result<Vec<RemoteTag>, ListingError> {
        *self.0.lock().unwrap() += 1;
        Err(ListingError::Http {
            url: "tags".into(),
            status: 403,
        })
    }

    fn list_branches(&self, _: Platform, _: &str, _: &str, _: u32) -> Result<Vec<RemoteBranch>, ListingError> {
        unreachable!()
    }

    fn list_releases(&self, _: Platform, _: &str, _: &str, _: u32) -> Result<Vec<RemoteRelease>, ListingError> {
        unreachable!()
    }
}

#[test]
fn non_timeout_errors_are_not_retried() {
    let client = Forbidden(Mutex::new(0));
    let r = parse("https://github.com/o/foo/releases/tag/v1").unwrap();
    let err = ArchiveResolver::new(&client, no_wait(5)).resolve(&r).unwrap_err();
    assert!(matches!(err, ResolveError::Listing(ListingError::Http { status: 403, .. })));
    assert_eq!(*client.0.lock().unwrap(), 1);
}
