//! Manage the content cache.
//!
//! ```bash
//! wflens cache path    # print the directory holding fetched content
//! wflens cache clean   # delete every cached file
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::GlobalConfig;
use crate::resolver::ResolutionCache;

/// Arguments of `wflens cache`.
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommand {
    /// Print the cache directory
    Path,
    /// Delete all cached content
    Clean,
}

impl CacheCommand {
    /// Run the cache subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be determined or read.
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        let dir = config.cache_dir()?;
        match self.command {
            CacheSubcommand::Path => println!("{}", dir.display()),
            CacheSubcommand::Clean => {
                let removed = ResolutionCache::new(Some(dir.clone())).purge_content_dir().await?;
                println!("{} Removed {} cached files from {}", "✓".green(), removed, dir.display());
            }
        }
        Ok(())
    }
}
