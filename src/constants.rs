//! Global constants used throughout the wflens codebase.
//!
//! This module contains workflow field names, cache retention windows, and
//! the GitHub hosts used to build fetch and browse URLs. Defining them
//! centrally keeps the navigation filters and the resolver in agreement.

use std::time::Duration;

/// Key of the top-level block holding all jobs of a workflow.
pub const FIELD_JOBS: &str = "jobs";

/// Key of the step list inside a job.
pub const FIELD_STEPS: &str = "steps";

/// Key of the trigger block of a workflow.
pub const FIELD_ON: &str = "on";

/// Key of a step's (or job's) external reference.
pub const FIELD_USES: &str = "uses";

/// Key of the parameter block passed to a `uses` reference.
pub const FIELD_WITH: &str = "with";

/// Key of a job's dependency list.
pub const FIELD_NEEDS: &str = "needs";

/// Key of a declared inputs block.
pub const FIELD_INPUTS: &str = "inputs";

/// Key of a declared outputs block.
pub const FIELD_OUTPUTS: &str = "outputs";

/// Key of a declared secrets block.
pub const FIELD_SECRETS: &str = "secrets";

/// Key of an environment variable block.
pub const FIELD_ENV: &str = "env";

/// Directory marker that identifies a local reference.
pub const CONTROL_DIR: &str = ".github";

/// Path of workflow files inside a repository.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// File names probed for an action manifest, in order.
pub const ACTION_MANIFESTS: [&str; 2] = ["action.yml", "action.yaml"];

/// Host serving raw repository content.
pub const RAW_CONTENT_HOST: &str = "https://raw.githubusercontent.com";

/// Host for browsing repositories.
pub const GITHUB_HOST: &str = "https://github.com";

/// Retention of a successfully resolved reference (one day).
///
/// After this window the entry is evicted on the next lookup and resolved
/// again, which picks up moved tags and branches.
pub const SUCCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Retention of a failed resolution (ten minutes).
///
/// Failed lookups are retried sooner than successful ones, but not on every
/// keystroke.
pub const FAILURE_TTL: Duration = Duration::from_secs(10 * 60);

/// Timeout for a single remote fetch (30 seconds).
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with remote fetches.
pub const USER_AGENT: &str = concat!("wflens/", env!("CARGO_PKG_VERSION"));

/// Extension of files in the on-disk content cache.
pub const CACHE_FILE_EXTENSION: &str = "yml";
