//! Global configuration management for wflens.
//!
//! This module handles the user configuration file (`~/.wflens/config.toml`)
//! which tunes how references are resolved: how long results are kept, how
//! long a fetch may take and where fetched content is stored.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.wflens/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\wflens\config.toml`
//!
//! The location can be overridden using the `WFLENS_CONFIG_PATH` environment
//! variable.
//!
//! # File Format
//!
//! ```toml
//! # Where fetched action.yml and workflow files are kept (~ and $VARS expand)
//! cache_dir = "~/.cache/wflens"
//!
//! [resolver]
//! success_ttl_secs = 86400   # keep resolved references for a day
//! failure_ttl_secs = 600     # retry failed references after ten minutes
//! fetch_timeout_secs = 30
//! user_agent = "wflens"
//! disk_cache = true
//! ```
//!
//! Every key is optional; a missing file yields the defaults.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wflens::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! println!("Failed lookups are retried after {:?}", config.resolver.failure_ttl());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{FAILURE_TTL, FETCH_TIMEOUT, SUCCESS_TTL, USER_AGENT};
use crate::core::WorkflowError;

const fn default_success_ttl_secs() -> u64 {
    SUCCESS_TTL.as_secs()
}

const fn default_failure_ttl_secs() -> u64 {
    FAILURE_TTL.as_secs()
}

const fn default_fetch_timeout_secs() -> u64 {
    FETCH_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

const fn default_true() -> bool {
    true
}

/// Settings of the reference resolver.
///
/// # Examples
///
/// ```rust
/// use wflens::config::ResolverConfig;
/// use std::time::Duration;
///
/// let config: ResolverConfig = toml::from_str("failure_ttl_secs = 60").unwrap();
/// assert_eq!(config.failure_ttl(), Duration::from_secs(60));
/// assert_eq!(config.success_ttl(), Duration::from_secs(86400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How long a successfully resolved reference is served from the cache.
    #[serde(default = "default_success_ttl_secs")]
    pub success_ttl_secs: u64,

    /// How long a failed reference is left alone before the next attempt.
    #[serde(default = "default_failure_ttl_secs")]
    pub failure_ttl_secs: u64,

    /// Upper bound for a single remote fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// User agent sent with remote fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Keep fetched content on disk between runs.
    #[serde(default = "default_true")]
    pub disk_cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            success_ttl_secs: default_success_ttl_secs(),
            failure_ttl_secs: default_failure_ttl_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            disk_cache: true,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub const fn success_ttl(&self) -> Duration {
        Duration::from_secs(self.success_ttl_secs)
    }

    #[must_use]
    pub const fn failure_ttl(&self) -> Duration {
        Duration::from_secs(self.failure_ttl_secs)
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Reject settings that would make the cache useless.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ConfigError`] for a zero timeout or a failure
    /// window longer than the success window.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.fetch_timeout_secs == 0 {
            return Err(WorkflowError::ConfigError {
                message: "resolver.fetch_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.failure_ttl_secs > self.success_ttl_secs {
            return Err(WorkflowError::ConfigError {
                message: format!(
                    "resolver.failure_ttl_secs ({}) exceeds resolver.success_ttl_secs ({})",
                    self.failure_ttl_secs, self.success_ttl_secs
                ),
            });
        }
        Ok(())
    }
}

/// Global configuration structure for wflens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Directory for fetched content; `~` and environment variables expand.
    ///
    /// `WFLENS_CACHE_DIR` takes precedence over this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    /// Resolver tuning.
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl GlobalConfig {
    /// Load the configuration from the default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, the file
    /// cannot be read, or it contains invalid TOML.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`ResolverConfig::validate`].
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(WorkflowError::from)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;
        config.resolver.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// Path of the configuration file.
    ///
    /// `WFLENS_CONFIG_PATH` overrides the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if the home or local data directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("WFLENS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("wflens")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".wflens")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for fetched content.
    ///
    /// Priority: `WFLENS_CACHE_DIR`, then `cache_dir` from this file, then
    /// the platform default from [`get_cache_dir`](super::get_cache_dir).
    ///
    /// # Errors
    ///
    /// Returns an error if a configured path references an undefined
    /// environment variable or no default location can be determined.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if std::env::var_os("WFLENS_CACHE_DIR").is_some() {
            return super::get_cache_dir();
        }
        match &self.cache_dir {
            Some(dir) => {
                let expanded = shellexpand::full(dir).map_err(|e| WorkflowError::ConfigError {
                    message: format!("cannot expand cache_dir '{dir}': {e}"),
                })?;
                Ok(PathBuf::from(expanded.as_ref()))
            }
            None => super::get_cache_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert!(config.cache_dir.is_none());
        assert_eq!(config.resolver.success_ttl(), SUCCESS_TTL);
        assert_eq!(config.resolver.failure_ttl(), FAILURE_TTL);
        assert!(config.resolver.disk_cache);
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[resolver]\nfetch_timeout_secs = 5\ndisk_cache = false\n").unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(config.resolver.fetch_timeout(), Duration::from_secs(5));
        assert!(!config.resolver.disk_cache);
        assert_eq!(config.resolver.success_ttl_secs, 86400);
    }

    #[tokio::test]
    async fn test_load_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[resolver\n").unwrap();
        assert!(GlobalConfig::load_from(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_inverted_windows() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[resolver]\nsuccess_ttl_secs = 60\nfailure_ttl_secs = 120\n").unwrap();
        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("failure_ttl_secs"));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let config = GlobalConfig {
            cache_dir: Some("/tmp/wflens".to_string()),
            resolver: ResolverConfig {
                failure_ttl_secs: 30,
                ..ResolverConfig::default()
            },
        };
        config.save_to(&path).await.unwrap();
        assert_eq!(GlobalConfig::load_from(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_load_with_optional_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = GlobalConfig::load_with_optional(Some(temp.path().join("absent.toml"))).await.unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        unsafe { std::env::set_var("WFLENS_CONFIG_PATH", "/custom/wflens.toml") };
        let path = GlobalConfig::default_path().unwrap();
        unsafe { std::env::remove_var("WFLENS_CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/custom/wflens.toml"));
    }

    #[test]
    #[serial]
    fn test_cache_dir_expansion() {
        unsafe { std::env::remove_var("WFLENS_CACHE_DIR") };
        unsafe { std::env::set_var("WFLENS_TEST_BASE", "/var/tmp") };
        let config = GlobalConfig {
            cache_dir: Some("$WFLENS_TEST_BASE/wflens".to_string()),
            ..GlobalConfig::default()
        };
        let dir = config.cache_dir().unwrap();
        unsafe { std::env::remove_var("WFLENS_TEST_BASE") };
        assert_eq!(dir, PathBuf::from("/var/tmp/wflens"));
    }
}
