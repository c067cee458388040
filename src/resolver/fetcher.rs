//! Content fetch collaborators.
//!
//! The resolver never talks to the network or the filesystem directly; it
//! asks a [`ContentFetcher`] for the text at a location. Two implementations
//! ship with the crate:
//!
//! - [`HttpFetcher`] downloads raw content over HTTPS with a bounded timeout
//! - [`FileSystemFetcher`] reads local references below a project root
//!
//! Tests substitute their own fetcher to count calls or serve fixtures.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::constants::{ACTION_MANIFESTS, FETCH_TIMEOUT, USER_AGENT};
use crate::core::WorkflowError;

/// Retrieves the text stored at a location.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the content at `location`.
    ///
    /// # Errors
    ///
    /// Returns a fetch-layer [`WorkflowError`] when the content cannot be
    /// retrieved. An empty body is not an error at this layer.
    async fn fetch(&self, location: &str) -> Result<String, WorkflowError>;
}

/// Fetches raw content over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Client with the default timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, WorkflowError> {
        Self::with_settings(FETCH_TIMEOUT, USER_AGENT)
    }

    /// Client with an explicit timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| WorkflowError::Other {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<String, WorkflowError> {
        debug!("Fetching {}", location);
        let response = self.client.get(location).send().await.map_err(|e| {
            WorkflowError::FetchFailed {
                location: location.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::HttpStatus {
                url: location.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| WorkflowError::FetchFailed {
            location: location.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Reads local references relative to a project root.
///
/// A location naming a directory is read through its `action.yml` (or
/// `action.yaml`). Locations that would leave the project root are rejected.
#[derive(Debug, Clone)]
pub struct FileSystemFetcher {
    root: PathBuf,
}

impl FileSystemFetcher {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a location to a path below the root.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::LocalPathOutsideProject`] for absolute paths
    /// and for paths whose `..` segments climb above the root.
    pub fn resolve_path(&self, location: &str) -> Result<PathBuf, WorkflowError> {
        let outside = || WorkflowError::LocalPathOutsideProject {
            path: location.to_string(),
        };

        let mut relative = PathBuf::new();
        for component in Path::new(location.trim()).components() {
            match component {
                Component::CurDir => {}
                Component::Normal(segment) => relative.push(segment),
                Component::ParentDir => {
                    if !relative.pop() {
                        return Err(outside());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentFetcher for FileSystemFetcher {
    async fn fetch(&self, location: &str) -> Result<String, WorkflowError> {
        let path = self.resolve_path(location)?;
        let path = if path.is_dir() {
            ACTION_MANIFESTS
                .iter()
                .map(|manifest| path.join(manifest))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| WorkflowError::FetchFailed {
                    location: location.to_string(),
                    reason: format!("no {} in {}", ACTION_MANIFESTS.join(" or "), path.display()),
                })?
        } else {
            path
        };

        debug!("Reading local reference {}", path.display());
        tokio::fs::read_to_string(&path).await.map_err(|e| WorkflowError::FetchFailed {
            location: location.to_string(),
            reason: e.to_string(),
        })
    }
}
