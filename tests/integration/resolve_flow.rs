//! Resolving each reference kind against served or on-disk content.

use std::sync::Arc;

use anyhow::Result;
use wflens::reference::ReferenceKind;
use wflens::resolver::{FileSystemFetcher, ResolutionCache, Resolver};
use wflens::test_utils::{StaticFetcher, fixtures, init_test_logging};

use crate::common::TestProject;

const CHECKOUT_URL: &str = "https://raw.githubusercontent.com/actions/checkout/v4/action.yml";
const DEPLOY_URL: &str = "https://raw.githubusercontent.com/org/repo/main/.github/workflows/deploy.yml";

fn remote() -> StaticFetcher {
    StaticFetcher::new().with(CHECKOUT_URL, fixtures::CHECKOUT_ACTION).with(DEPLOY_URL, fixtures::REUSABLE_WORKFLOW)
}

/// Every reference of a caller workflow resolves to the interface it declares
#[tokio::test]
async fn test_resolve_caller_workflow_references() -> Result<()> {
    init_test_logging(None);
    let project = TestProject::new()?;
    project.write_file(".github/actions/build/action.yml", fixtures::LOCAL_ACTION)?;

    let resolver = Resolver::new(
        Arc::new(ResolutionCache::new(Some(project.cache_path().to_path_buf()))),
        Arc::new(remote()),
        Arc::new(FileSystemFetcher::new(project.project_path())),
    );

    let checkout = resolver.resolve_raw("actions/checkout@v4").await;
    assert!(checkout.is_available());
    assert_eq!(checkout.reference().kind(), ReferenceKind::Action);
    assert_eq!(
        checkout.inputs().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["fetch-depth", "ref", "repository", "token"]
    );
    assert_eq!(checkout.outputs().get("commit").map(String::as_str), Some("The commit SHA that was checked out"));

    let deploy = resolver.resolve_raw("org/repo/.github/workflows/deploy.yml@main").await;
    assert!(deploy.is_available());
    assert_eq!(deploy.reference().kind(), ReferenceKind::ReusableWorkflow);
    assert_eq!(deploy.inputs().keys().map(String::as_str).collect::<Vec<_>>(), vec!["dry-run", "environment"]);
    assert_eq!(deploy.outputs().get("url").map(String::as_str), Some("Deployed URL"));

    let local = resolver.resolve_raw("./.github/actions/build").await;
    assert!(local.is_available());
    assert_eq!(local.inputs().get("target").map(String::as_str), Some("Cargo target to build"));

    // Parsed content stays reachable for further navigation
    let context = resolver.context(&deploy).expect("context for resolved workflow");
    assert_eq!(context.job_names(), vec!["deploy"]);
    Ok(())
}

/// A second resolver sharing the content directory does not fetch again
#[tokio::test]
async fn test_content_directory_survives_restart() -> Result<()> {
    let project = TestProject::new()?;
    let content_dir = project.cache_path().to_path_buf();

    let first = Resolver::new(
        Arc::new(ResolutionCache::new(Some(content_dir.clone()))),
        Arc::new(remote()),
        Arc::new(StaticFetcher::new()),
    );
    assert!(first.resolve_raw("actions/checkout@v4").await.is_available());

    let offline = Arc::new(StaticFetcher::new());
    let second = Resolver::new(
        Arc::new(ResolutionCache::new(Some(content_dir))),
        offline.clone(),
        Arc::new(StaticFetcher::new()),
    );
    let entry = second.resolve_raw("actions/checkout@v4").await;

    assert!(entry.is_available());
    assert_eq!(offline.fetch_count(), 0);
    assert!(entry.inputs().contains_key("fetch-depth"));
    Ok(())
}

/// Local references may not read outside the project root
#[tokio::test]
async fn test_local_reference_outside_project_is_unavailable() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(".github/actions/build/action.yml", fixtures::LOCAL_ACTION)?;

    let resolver = Resolver::new(
        Arc::new(ResolutionCache::new(None)),
        Arc::new(StaticFetcher::new()),
        Arc::new(FileSystemFetcher::new(project.project_path())),
    );

    let escaped = resolver.resolve_raw("./.github/../../secrets").await;
    assert_eq!(escaped.reference().kind(), ReferenceKind::LocalPath);
    assert!(!escaped.is_available());
    assert!(escaped.inputs().is_empty());
    Ok(())
}

/// Unparsable references never reach a fetcher
#[tokio::test]
async fn test_unparsable_references_are_not_fetched() {
    let remote = Arc::new(StaticFetcher::new());
    let local = Arc::new(StaticFetcher::new());
    let resolver = Resolver::new(Arc::new(ResolutionCache::new(None)), remote.clone(), local.clone());

    for raw in ["docker://alpine:3", "actions/checkout", "no-slash@v1"] {
        let entry = resolver.resolve_raw(raw).await;
        assert_eq!(entry.reference().kind(), ReferenceKind::Unparsable, "{raw}");
        assert!(!entry.is_available());
        assert!(entry.expires_at().is_none());
    }
    assert_eq!(remote.fetch_count() + local.fetch_count(), 0);
}

/// Duplicate references resolved together share one fetch
#[tokio::test]
async fn test_resolve_all_fetches_each_reference_once() {
    let remote = Arc::new(remote().with_delay(std::time::Duration::from_millis(20)));
    let resolver =
        Resolver::new(Arc::new(ResolutionCache::new(None)), remote.clone(), Arc::new(StaticFetcher::new()));

    let entries: Vec<_> = ["actions/checkout@v4", "actions/checkout@v4", "org/repo/.github/workflows/deploy.yml@main"]
        .into_iter()
        .map(|raw| resolver.cache().get_or_create(raw))
        .collect();
    assert!(Arc::ptr_eq(&entries[0], &entries[1]));

    resolver.resolve_all(&entries).await;

    assert!(entries.iter().all(|e| e.is_available()));
    assert_eq!(remote.fetch_count(), 2);
}
