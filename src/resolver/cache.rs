//! Process-wide map from reference strings to resolved entries.
//!
//! The cache owns the expiry policy: an entry past its `expires_at` is
//! evicted on the next [`ResolutionCache::get_or_create`] and replaced by a
//! fresh one, after its on-disk content file and parsed context are removed.
//! Lookup and replacement happen under the map's shard lock, so concurrent
//! callers asking for the same string always receive the same entry.
//!
//! # On-disk layout
//!
//! ```text
//! ~/.wflens/cache/
//! ├── checkout_v4-1f0c2a9be41d7a33.yml
//! ├── ci.yml_main-8a42ef0b9c6d1e55.yml
//! └── codeql-action_init_v3-03bd45e7a1c2f980.yml
//! ```
//!
//! File names are `{cache_id}-{storage_key}.yml`, the reference's
//! [`Reference::content_key`]. Parsed contexts use the same key, so two
//! owners publishing a same-named action never share a context or a file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use crate::constants::CACHE_FILE_EXTENSION;
use crate::context::ContextCache;
use crate::reference::Reference;

use super::entry::ResolvedEntry;

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared cache of [`ResolvedEntry`] values keyed by raw reference string.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: DashMap<String, Arc<ResolvedEntry>>,
    contexts: ContextCache,
    content_dir: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ResolutionCache {
    /// Create a cache. Without `content_dir` nothing is written to disk.
    #[must_use]
    pub fn new(content_dir: Option<PathBuf>) -> Self {
        Self::with_clock(content_dir, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    #[must_use]
    pub fn with_clock(content_dir: Option<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            contexts: ContextCache::new(),
            content_dir,
            clock,
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn content_dir(&self) -> Option<&Path> {
        self.content_dir.as_deref()
    }

    /// Parsed contexts of resolved content, keyed by [`Reference::content_key`].
    #[must_use]
    pub const fn contexts(&self) -> &ContextCache {
        &self.contexts
    }

    /// Return the live entry for `raw`, creating or replacing it as needed.
    ///
    /// A missing or expired entry is replaced by a fresh unresolved one. The
    /// stale entry's context is dropped and the stale entry itself is marked
    /// unavailable for anyone still holding it. Its content file is deleted
    /// once the map lock is released.
    pub fn get_or_create(&self, raw: &str) -> Arc<ResolvedEntry> {
        let now = self.clock.now();
        let (entry, stale_file) = match self.entries.entry(raw.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Arc::clone(occupied.get());
                }
                debug!("Cache entry for '{}' expired, replacing", raw);
                let stale_file = self.detach(occupied.get());
                let fresh = Arc::new(ResolvedEntry::new(Reference::parse(raw)));
                occupied.insert(Arc::clone(&fresh));
                (fresh, stale_file)
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(ResolvedEntry::new(Reference::parse(raw)));
                vacant.insert(Arc::clone(&fresh));
                (fresh, None)
            }
        };
        if let Some(path) = stale_file {
            remove_file_logged(&path);
        }
        entry
    }

    /// The live entry for `raw` without creating one. Expired entries are returned as-is.
    #[must_use]
    pub fn get(&self, raw: &str) -> Option<Arc<ResolvedEntry>> {
        self.entries.get(raw).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `entry` is the one currently stored for its reference.
    ///
    /// False once it has been replaced or deleted.
    #[must_use]
    pub fn is_current(&self, entry: &ResolvedEntry) -> bool {
        self.entries
            .get(entry.reference().raw())
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current.value()), entry))
    }

    /// Invalidate an entry: mark it unavailable, drop it from the map and
    /// delete its on-disk content. Never fails; deletion errors are logged.
    ///
    /// A stale handle whose slot already holds a replacement is only marked
    /// unavailable; the replacement keeps its slot, context and file.
    pub fn delete_cache(&self, entry: &ResolvedEntry) {
        let raw = entry.reference().raw();
        let replaced = self
            .entries
            .get(raw)
            .is_some_and(|current| !std::ptr::eq(Arc::as_ptr(current.value()), entry));
        if replaced {
            entry.invalidate();
            return;
        }
        let stale_file = self.detach(entry);
        self.entries.remove_if(raw, |_, current| std::ptr::eq(Arc::as_ptr(current), entry));
        if let Some(path) = stale_file {
            remove_file_logged(&path);
        }
    }

    /// Invalidate `entry` and drop its context. Returns the content file
    /// for the caller to delete outside any map lock.
    fn detach(&self, entry: &ResolvedEntry) -> Option<PathBuf> {
        entry.invalidate();
        self.contexts.remove(&entry.reference().content_key());
        self.content_path(entry.reference())
    }

    /// Drop every entry and context. Content files stay on disk.
    pub fn clear(&self) {
        self.entries.clear();
        self.contexts.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all live entries, ordered by raw reference.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<ResolvedEntry>> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| Arc::clone(e.value())).collect();
        entries.sort_by(|a, b| a.reference().raw().cmp(b.reference().raw()));
        entries
    }

    /// Location of the content file for a remote reference.
    ///
    /// `None` for local and unparsable references, or when the cache has no
    /// content directory.
    #[must_use]
    pub fn content_path(&self, reference: &Reference) -> Option<PathBuf> {
        if reference.is_local() || !reference.is_resolvable() {
            return None;
        }
        let dir = self.content_dir.as_ref()?;
        Some(dir.join(format!("{}.{CACHE_FILE_EXTENSION}", reference.content_key())))
    }

    /// Delete every content file in the content directory.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub async fn purge_content_dir(&self) -> Result<usize> {
        let Some(dir) = &self.content_dir else {
            return Ok(0);
        };
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read cache directory {}", dir.display()))?;
        while let Some(file) = read_dir.next_entry().await? {
            let path = file.path();
            if path.extension().is_some_and(|ext| ext == CACHE_FILE_EXTENSION) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove cache file {}: {}", path.display(), e),
                }
            }
        }
        debug!("Removed {} cache files from {}", removed, dir.display());
        Ok(removed)
    }
}

fn remove_file_logged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed cache file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove cache file {}: {}", path.display(), e),
    }
}
