//! Reference resolution and caching for wflens.
//!
//! This module turns `uses:` strings into the declared interface of the
//! action or reusable workflow they point at.
//!
//! # Architecture Overview
//!
//! ```text
//! "actions/checkout@v4"
//!        │
//!        ▼
//! ResolutionCache::get_or_create ──► ResolvedEntry (Reference + state)
//!        │
//!        ▼
//! Resolver::resolve
//!   1. skip if available, unparsable, or inside the retry window
//!   2. fetch: FileSystemFetcher (local) / disk cache / HttpFetcher (remote)
//!   3. parse the content into a Document (must be a YAML mapping)
//!   4. extract inputs and outputs; if the entry is still current, write
//!      fetched content to disk and register a WorkflowContext
//!   5. stamp availability and expiry on the entry
//! ```
//!
//! # Expiry
//!
//! | Outcome                                   | `is_available` | Kept for            |
//! |-------------------------------------------|----------------|---------------------|
//! | Content fetched and parsed                | `true`         | success TTL (1 day) |
//! | Fetch failed, empty body, or not a mapping| `false`        | failure TTL (10 min)|
//! | Unparsable reference                      | `false`        | forever, never fetched |
//!
//! Failures never propagate out of [`Resolver::resolve`]. They are logged
//! with `tracing` and observable only through the entry.
//!
//! # Parameter Extraction
//!
//! For actions every entry directly under an `inputs:` (or `outputs:`) block
//! is a parameter. For reusable workflows the block must also sit under the
//! `on:` trigger, i.e. `on.<trigger>.inputs.<name>`. Entries without a key,
//! `id` or `name` are skipped and the first occurrence of a name wins.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wflens::config::GlobalConfig;
//! use wflens::resolver::Resolver;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! let resolver = Resolver::from_config(&config, std::env::current_dir()?)?;
//!
//! let entry = resolver.resolve_raw("actions/checkout@v4").await;
//! if entry.is_available() {
//!     for (name, description) in entry.inputs() {
//!         println!("{name}: {description}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod entry;
pub mod fetcher;

pub use cache::{Clock, ResolutionCache, SystemClock};
pub use entry::{ParameterMap, ResolutionSnapshot, ResolvedEntry};
pub use fetcher::{ContentFetcher, FileSystemFetcher, HttpFetcher};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::{GlobalConfig, ResolverConfig};
use crate::constants::{FIELD_INPUTS, FIELD_ON, FIELD_OUTPUTS};
use crate::context::WorkflowContext;
use crate::core::WorkflowError;
use crate::reference::Reference;
use crate::tree::Document;
use crate::tree::yaml::parse_mapping_document;

/// Resolves cache entries by fetching and parsing their content.
pub struct Resolver {
    cache: Arc<ResolutionCache>,
    remote: Arc<dyn ContentFetcher>,
    local: Arc<dyn ContentFetcher>,
    config: ResolverConfig,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver over `cache` with default retention settings.
    #[must_use]
    pub fn new(
        cache: Arc<ResolutionCache>,
        remote: Arc<dyn ContentFetcher>,
        local: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            cache,
            remote,
            local,
            config: ResolverConfig::default(),
        }
    }

    /// Replace the retention settings.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Production wiring: HTTP for remote references, the filesystem below
    /// `project_root` for local ones, and the configured content directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the cache directory
    /// cannot be determined, or the HTTP client cannot be built.
    pub fn from_config(config: &GlobalConfig, project_root: impl Into<PathBuf>) -> Result<Self> {
        config.resolver.validate()?;
        let content_dir = if config.resolver.disk_cache {
            Some(config.cache_dir()?)
        } else {
            None
        };
        let remote = HttpFetcher::with_settings(config.resolver.fetch_timeout(), &config.resolver.user_agent)?;

        Ok(Self::new(
            Arc::new(ResolutionCache::new(content_dir)),
            Arc::new(remote),
            Arc::new(FileSystemFetcher::new(project_root)),
        )
        .with_config(config.resolver.clone()))
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Parsed content of a resolved entry.
    #[must_use]
    pub fn context(&self, entry: &ResolvedEntry) -> Option<Arc<WorkflowContext>> {
        if !entry.is_available() {
            return None;
        }
        self.cache.contexts().get(&entry.reference().content_key())
    }

    /// Look up (or create) the entry for `raw` and resolve it.
    pub async fn resolve_raw(&self, raw: &str) -> Arc<ResolvedEntry> {
        let entry = self.cache.get_or_create(raw);
        self.resolve(&entry).await;
        entry
    }

    /// Resolve several entries concurrently.
    pub async fn resolve_all(&self, entries: &[Arc<ResolvedEntry>]) {
        join_all(entries.iter().map(|entry| self.resolve(entry))).await;
    }

    /// Populate `entry` from its content.
    ///
    /// Does nothing for available entries, unparsable references, and failed
    /// entries still inside their retry window. Concurrent calls for the
    /// same entry fetch once; the others wait and then find it resolved.
    pub async fn resolve(&self, entry: &ResolvedEntry) {
        if !entry.needs_resolution(self.cache.now()) {
            return;
        }
        let _guard = entry.lock_resolution().await;
        if !entry.needs_resolution(self.cache.now()) {
            return;
        }

        let reference = entry.reference();
        match self.load(reference).await {
            Ok(loaded) => {
                let document = loaded.context.document();
                let inputs = extract_parameters(document, reference, FIELD_INPUTS);
                let outputs = extract_parameters(document, reference, FIELD_OUTPUTS);
                info!(
                    "Resolved '{}': {} inputs, {} outputs",
                    reference,
                    inputs.len(),
                    outputs.len()
                );

                // A replaced or deleted entry must not publish into its successor's slot
                if self.cache.is_current(entry) {
                    if let Some(text) = &loaded.fetched {
                        self.store(reference, text).await;
                    }
                    self.cache.contexts().insert(reference.content_key(), loaded.context);
                } else {
                    debug!("Entry for '{}' left the cache while resolving, not publishing", reference);
                }
                let now = self.cache.now();
                entry.mark_resolved(inputs, outputs, expiry(now, self.config.success_ttl()));
            }
            Err(e) => {
                if e.is_fetch_failure() {
                    warn!("Failed to fetch '{}': {}", reference, e);
                } else {
                    warn!("Failed to resolve '{}': {}", reference, e);
                }
                let now = self.cache.now();
                entry.mark_failed(expiry(now, self.config.failure_ttl()));
            }
        }
    }

    async fn load(&self, reference: &Reference) -> Result<Loaded, WorkflowError> {
        let location = reference.download_location().ok_or_else(|| WorkflowError::InvalidReference {
            reference: reference.raw().to_string(),
            reason: "no download location".to_string(),
        })?;

        let (text, from_disk) = if reference.is_local() {
            (self.local.fetch(location).await?, false)
        } else {
            self.fetch_remote(reference, location).await?
        };

        if text.trim().is_empty() {
            return Err(WorkflowError::EmptyContent {
                location: location.to_string(),
            });
        }

        let document = parse_mapping_document(&reference.cache_id(), &text)?;
        Ok(Loaded {
            context: Arc::new(WorkflowContext::new(Arc::new(document))),
            fetched: (!reference.is_local() && !from_disk).then_some(text),
        })
    }

    async fn fetch_remote(&self, reference: &Reference, location: &str) -> Result<(String, bool), WorkflowError> {
        if let Some(path) = self.cache.content_path(reference).filter(|p| self.is_fresh(p)) {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    debug!("Using cached content {} for '{}'", path.display(), reference);
                    return Ok((text, true));
                }
                Err(e) => debug!("Ignoring unreadable cache file {}: {}", path.display(), e),
            }
        }
        Ok((self.remote.fetch(location).await?, false))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        let modified: DateTime<Utc> = modified.into();
        let age = self.cache.now().signed_duration_since(modified);
        TimeDelta::from_std(self.config.success_ttl()).is_ok_and(|ttl| age < ttl)
    }

    async fn store(&self, reference: &Reference, text: &str) {
        let Some(path) = self.cache.content_path(reference) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Failed to create cache directory {}: {}", parent.display(), e);
                return;
            }
        }
        match tokio::fs::write(&path, text).await {
            Ok(()) => debug!("Cached '{}' at {}", reference, path.display()),
            Err(e) => warn!("Failed to write cache file {}: {}", path.display(), e),
        }
    }
}

/// Parsed content plus the remote text still to be written to disk.
struct Loaded {
    context: Arc<WorkflowContext>,
    fetched: Option<String>,
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Declared parameters of `block` (`inputs` or `outputs`) in `document`.
fn extract_parameters(document: &Document, reference: &Reference, block: &str) -> ParameterMap {
    let candidates = document.root().find_child_nodes(|node| {
        let Some(parent) = node.parent() else {
            return false;
        };
        if parent.key() != Some(block) {
            return false;
        }
        // on.<trigger>.<block>.<name>
        !reference.is_workflow()
            || parent.parent().and_then(|trigger| trigger.parent()).and_then(|on| on.key()) == Some(FIELD_ON)
    });

    let mut parameters = ParameterMap::new();
    for node in candidates {
        let Some(name) = node.key_or_id_or_name().filter(|name| !name.is_empty()) else {
            continue;
        };
        parameters
            .entry(name.to_string())
            .or_insert_with(|| node.description().unwrap_or_default().to_string());
    }
    parameters
}
