//! Command-line interface for wflens.
//!
//! # Available Commands
//!
//! - `resolve` - Resolve `uses:` references and print their declared inputs and outputs
//! - `inspect` - Summarize the jobs, steps and dependencies of a workflow file
//! - `cache` - Show or clean the directory holding fetched content
//!
//! # Command Usage Patterns
//!
//! ```bash
//! # What does an action accept?
//! wflens resolve actions/checkout@v4
//!
//! # Several at once, machine readable
//! wflens resolve actions/setup-node@v4 org/repo/.github/workflows/ci.yml@main --format json
//!
//! # Walk a workflow and check every `with:` against the referenced action
//! wflens inspect .github/workflows/ci.yml --resolve
//!
//! # Start from scratch
//! wflens cache clean
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging on stderr
//! - `--quiet` / `-q`: no logging
//! - `--config <PATH>`: alternative global config file (also `WFLENS_CONFIG_PATH`)
//! - `--project-root <DIR>`: directory local `./.github/...` references are read from

mod cache;
mod inspect;
mod resolve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;
use crate::resolver::Resolver;

/// Output format of commands that print results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

/// Settings derived from global flags, applied before any command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive, `None` disables logging
    pub log_level: Option<String>,
    /// Explicit global config path
    pub config_path: Option<PathBuf>,
    /// Root for local references
    pub project_root: Option<PathBuf>,
}

/// Main CLI structure for wflens.
#[derive(Parser, Debug)]
#[command(
    name = "wflens",
    about = "Resolve and inspect CI workflow references",
    version,
    long_about = "wflens resolves `uses:` references of CI workflows into the inputs and outputs they declare, and summarizes workflow files."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable logging
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the global configuration file
    #[arg(long, global = true, env = "WFLENS_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Directory that local references are resolved against
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve references and print their interface
    Resolve(resolve::ResolveCommand),

    /// Summarize a workflow file
    Inspect(inspect::InspectCommand),

    /// Manage the content cache
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` renders it with
    /// [`user_friendly_error`](crate::core::user_friendly_error).
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.quiet {
            None
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            project_root: self.project_root.clone(),
        }
    }

    /// Run the selected command with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the command fails.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        init_logging(config.log_level.as_deref());

        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;

        match self.command {
            Commands::Resolve(cmd) => {
                let root = project_root(config.project_root)?;
                cmd.execute(&Resolver::from_config(&global, root)?).await
            }
            Commands::Inspect(cmd) => {
                let root = match config.project_root {
                    Some(root) => root,
                    None => inspect::detect_project_root(cmd.file())?,
                };
                cmd.execute(&Resolver::from_config(&global, root)?).await
            }
            Commands::Cache(cmd) => cmd.execute(&global).await,
        }
    }
}

fn project_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("Failed to determine the current directory"),
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to this crate only.
/// `None` leaves logging off.
fn init_logging(level: Option<&str>) {
    let Some(level) = level else {
        return;
    };
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("wflens={level}"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
