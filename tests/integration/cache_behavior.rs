//! Expiry, eviction and backoff of the resolution cache.

use std::sync::Arc;

use anyhow::Result;
use chrono::TimeDelta;
use wflens::resolver::{ResolutionCache, Resolver};
use wflens::test_utils::{ManualClock, StaticFetcher, fixtures};

use crate::common::TestProject;

const CHECKOUT_URL: &str = "https://raw.githubusercontent.com/actions/checkout/v4/action.yml";

struct Setup {
    clock: Arc<ManualClock>,
    remote: Arc<StaticFetcher>,
    resolver: Resolver,
}

fn setup(project: &TestProject, remote: StaticFetcher) -> Setup {
    let clock = Arc::new(ManualClock::default());
    let remote = Arc::new(remote);
    let cache = Arc::new(ResolutionCache::with_clock(
        Some(project.cache_path().to_path_buf()),
        clock.clone(),
    ));
    let resolver = Resolver::new(cache, remote.clone(), Arc::new(StaticFetcher::new()));
    Setup { clock, remote, resolver }
}

/// An expired entry is replaced and its content file deleted
#[tokio::test]
async fn test_expired_entry_is_replaced_and_file_removed() -> Result<()> {
    let project = TestProject::new()?;
    let s = setup(&project, StaticFetcher::new().with(CHECKOUT_URL, fixtures::CHECKOUT_ACTION));

    let first = s.resolver.resolve_raw("actions/checkout@v4").await;
    let path = s.resolver.cache().content_path(first.reference()).expect("remote reference has a content path");
    assert!(path.exists());

    // Still fresh an hour later
    s.clock.advance(TimeDelta::hours(1));
    assert!(Arc::ptr_eq(&first, &s.resolver.cache().get_or_create("actions/checkout@v4")));

    s.clock.advance(TimeDelta::hours(24));
    let second = s.resolver.cache().get_or_create("actions/checkout@v4");

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!first.is_available(), "stale handle must be invalidated");
    assert!(!path.exists());
    assert!(s.resolver.cache().contexts().is_empty());

    s.resolver.resolve(&second).await;
    assert!(second.is_available());
    assert_eq!(s.remote.fetch_count(), 2);
    assert!(path.exists());
    Ok(())
}

/// Failed references are not retried until the failure window passes
#[tokio::test]
async fn test_failure_backoff() -> Result<()> {
    let project = TestProject::new()?;
    let s = setup(&project, StaticFetcher::new());

    let entry = s.resolver.resolve_raw("actions/missing@v1").await;
    assert!(!entry.is_available());
    assert_eq!(s.remote.fetch_count(), 1);

    s.clock.advance(TimeDelta::minutes(5));
    s.resolver.resolve(&entry).await;
    assert_eq!(s.remote.fetch_count(), 1);

    s.clock.advance(TimeDelta::minutes(6));
    let retried = s.resolver.resolve_raw("actions/missing@v1").await;
    assert!(!retried.is_available());
    assert_eq!(s.remote.fetch_count(), 2);
    assert!(
        s.remote.fetched_locations().iter().all(|l| l == "https://raw.githubusercontent.com/actions/missing/v1/action.yml")
    );
    Ok(())
}

/// Invalidating a stale handle leaves its replacement in place
#[tokio::test]
async fn test_delete_cache_ignores_replaced_entries() -> Result<()> {
    let project = TestProject::new()?;
    let s = setup(&project, StaticFetcher::new().with(CHECKOUT_URL, fixtures::CHECKOUT_ACTION));
    let cache = s.resolver.cache();

    let stale = s.resolver.resolve_raw("actions/checkout@v4").await;
    s.clock.advance(TimeDelta::days(2));
    let live = s.resolver.resolve_raw("actions/checkout@v4").await;
    assert!(live.is_available());

    let path = cache.content_path(live.reference()).expect("content path");
    cache.delete_cache(&stale);
    assert_eq!(cache.len(), 1);
    assert!(path.exists());
    assert!(s.resolver.context(&live).is_some());
    assert!(cache.get("actions/checkout@v4").is_some_and(|e| Arc::ptr_eq(&e, &live)));

    cache.delete_cache(&live);
    assert!(cache.is_empty());
    assert!(!live.is_available());
    assert!(!path.exists());
    Ok(())
}

/// Purging removes content files and nothing else
#[tokio::test]
async fn test_purge_content_dir() -> Result<()> {
    let project = TestProject::new()?;
    let s = setup(
        &project,
        StaticFetcher::new()
            .with(CHECKOUT_URL, fixtures::CHECKOUT_ACTION)
            .with("https://raw.githubusercontent.com/actions/cache/v4/action.yml", "inputs:\n  path: {}\n"),
    );
    s.resolver.resolve_raw("actions/checkout@v4").await;
    s.resolver.resolve_raw("actions/cache@v4").await;
    std::fs::write(project.cache_path().join("notes.txt"), "keep")?;

    let removed = s.resolver.cache().purge_content_dir().await?;

    assert_eq!(removed, 2);
    assert!(project.cache_path().join("notes.txt").exists());
    Ok(())
}
