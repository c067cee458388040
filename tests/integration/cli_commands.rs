//! The `wflens` binary end to end, restricted to local references.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use wflens::test_utils::fixtures;

use crate::common::TestProject;

const LOCAL_ONLY_WORKFLOW: &str = r#"name: Local
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: ./.github/actions/build
        with:
          target: wflens
          verbose: true
  release:
    needs: [build, publish]
    runs-on: ubuntu-latest
    steps:
      - run: echo done
"#;

#[test]
fn test_help_lists_commands() -> Result<()> {
    Command::cargo_bin("wflens")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("cache"));
    Ok(())
}

#[test]
fn test_resolve_local_action_text() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(".github/actions/build/action.yml", fixtures::LOCAL_ACTION)?;

    project
        .run_wflens(&["resolve", "./.github/actions/build"])?
        .assert_success()
        .assert_stdout_contains("./.github/actions/build (local) resolved")
        .assert_stdout_contains("target")
        .assert_stdout_contains("Cargo target to build");
    Ok(())
}

#[test]
fn test_resolve_local_action_json() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(".github/actions/build/action.yml", fixtures::LOCAL_ACTION)?;
    let root = project.project_path().display().to_string();

    let output = project.run_wflens(&["resolve", "./.github/actions/build", "--format", "json", "--project-root", &root])?;
    output.assert_success();

    let reports: Value = serde_json::from_str(&output.stdout)?;
    let report = &reports[0];
    assert_eq!(report["reference"]["kind"], "local_path");
    assert_eq!(report["reference"]["name"], "build");
    assert_eq!(report["is_available"], true);
    assert_eq!(report["inputs"]["target"], "Cargo target to build");
    assert!(report["marketplace_url"].is_null());
    assert!(report["expires_at"].is_string());
    Ok(())
}

#[test]
fn test_resolve_unparsable_reference_fails() -> Result<()> {
    let project = TestProject::new()?;

    project
        .run_wflens(&["resolve", "no-at-sign"])?
        .assert_failure()
        .assert_stdout_contains("unparsable")
        .assert_stderr_contains("Invalid reference 'no-at-sign'");
    Ok(())
}

#[test]
fn test_resolve_missing_local_action_fails() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(".github/actions/build/action.yml", fixtures::LOCAL_ACTION)?;

    project
        .run_wflens(&["resolve", "./.github/actions/build", "./.github/actions/missing"])?
        .assert_failure()
        .assert_stdout_contains("./.github/actions/missing (local) unavailable")
        .assert_stderr_contains("1 of 2 references could not be resolved: ./.github/actions/missing");
    Ok(())
}

#[test]
fn test_inspect_summarizes_jobs() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(".github/workflows/ci.yml", fixtures::CALLER_WORKFLOW)?;

    project
        .run_wflens(&["inspect", ".github/workflows/ci.yml"])?
        .assert_success()
        .assert_stdout_contains("deploy (needs build, lint)")
        .assert_stdout_contains("uses org/repo/.github/workflows/deploy.yml@main")
        .assert_stdout_contains("- actions/checkout@v4");
    Ok(())
}

#[test]
fn test_inspect_resolve_reports_unknown_inputs_and_needs() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file(".github/actions/build/action.yml", fixtures::LOCAL_ACTION)?;
    project.write_file(".github/workflows/local.yml", LOCAL_ONLY_WORKFLOW)?;

    let output = project.run_wflens(&["inspect", ".github/workflows/local.yml", "--resolve", "--format", "json"])?;
    output.assert_success();

    let report: Value = serde_json::from_str(&output.stdout)?;
    assert_eq!(report["unknown_needs"], serde_json::json!([["release", "publish"]]));
    assert_eq!(report["references"][0]["is_available"], true);
    let unknown = report["unknown_inputs"].as_array().expect("unknown_inputs array");
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0]["input"], "verbose");
    assert_eq!(unknown[0]["job"], "build");
    assert_eq!(unknown[0]["line"], 10);
    Ok(())
}

#[test]
fn test_inspect_missing_file_fails() -> Result<()> {
    let project = TestProject::new()?;

    project
        .run_wflens(&["inspect", "nope.yml"])?
        .assert_failure()
        .assert_stderr_contains("nope.yml");
    Ok(())
}

#[test]
fn test_cache_path_and_clean() -> Result<()> {
    let project = TestProject::new()?;
    std::fs::write(project.cache_path().join("checkout_v4-0011223344556677.yml"), "name: x\n")?;

    project
        .run_wflens(&["cache", "path"])?
        .assert_success()
        .assert_stdout_contains(&project.cache_path().display().to_string());

    project
        .run_wflens(&["cache", "clean"])?
        .assert_success()
        .assert_stdout_contains("Removed 1 cached files");
    assert!(!project.cache_path().join("checkout_v4-0011223344556677.yml").exists());
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let project = TestProject::new()?;
    std::fs::write(project.config_path(), "[resolver]\nfetch_timeout_secs = 0\n")?;

    project
        .run_wflens(&["cache", "path"])?
        .assert_failure()
        .assert_stderr_contains("fetch_timeout_secs must be greater than zero");
    Ok(())
}
