//! Configuration for wflens.
//!
//! Configuration is global only: there is no per-project file. The global
//! file lives at `~/.wflens/config.toml` and is described in [`global`].
//!
//! # Environment Variables
//!
//! - `WFLENS_CONFIG_PATH` - Alternative location of the global config file
//! - `WFLENS_CACHE_DIR` - Directory for fetched content, overriding the config
//! - `RUST_LOG` - Log filter, used when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```rust,no_run
//! use wflens::config::{GlobalConfig, get_cache_dir};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! let cache = config.cache_dir()?;
//! println!("Content cache: {} (default {})", cache.display(), get_cache_dir()?.display());
//! # Ok(())
//! # }
//! ```

pub mod global;

pub use global::{GlobalConfig, ResolverConfig};

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default directory for fetched content.
///
/// # Location Priority
///
/// 1. `WFLENS_CACHE_DIR` environment variable (if set)
/// 2. Platform-specific directory:
///    - Windows: `%LOCALAPPDATA%\wflens\cache`
///    - macOS/Linux: `~/.wflens/cache`
///
/// The directory is created if it doesn't exist.
///
/// # Errors
///
/// Returns an error if no home directory can be determined or the directory
/// cannot be created.
pub fn get_cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WFLENS_CACHE_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let cache_dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("wflens")
            .join("cache")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".wflens")
            .join("cache")
    };

    if !cache_dir.exists() {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
    }

    Ok(cache_dir)
}
