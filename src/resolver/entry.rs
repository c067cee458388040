//! A cached reference and its resolution result.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reference::Reference;

/// Declared parameters of an action or workflow: name to description.
///
/// Keys are case-sensitive. Parameters without a description map to an
/// empty string.
pub type ParameterMap = BTreeMap<String, String>;

/// Point-in-time copy of an entry's resolution state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSnapshot {
    /// Declared inputs
    pub inputs: ParameterMap,
    /// Declared outputs
    pub outputs: ParameterMap,
    /// Whether the last resolution attempt succeeded
    pub is_available: bool,
    /// When the entry stops being served from the cache.
    ///
    /// `None` until the first resolution attempt finishes; such an entry
    /// never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Reserved for labels attached by callers
    pub tags: BTreeSet<String>,
}

/// One reference in the resolution cache.
///
/// The [`Reference`] is fixed at creation. The resolution state sits in a
/// single lock and is replaced wholesale by the resolver, so readers never
/// see inputs from one attempt paired with availability from another.
#[derive(Debug)]
pub struct ResolvedEntry {
    reference: Reference,
    state: RwLock<ResolutionSnapshot>,
    resolve_gate: tokio::sync::Mutex<()>,
}

impl ResolvedEntry {
    /// A fresh, unresolved entry.
    #[must_use]
    pub fn new(reference: Reference) -> Self {
        Self {
            reference,
            state: RwLock::new(ResolutionSnapshot::default()),
            resolve_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ResolutionSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ResolutionSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn reference(&self) -> &Reference {
        &self.reference
    }

    #[must_use]
    pub fn snapshot(&self) -> ResolutionSnapshot {
        self.read().clone()
    }

    #[must_use]
    pub fn inputs(&self) -> ParameterMap {
        self.read().inputs.clone()
    }

    #[must_use]
    pub fn outputs(&self) -> ParameterMap {
        self.read().outputs.clone()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.read().is_available
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.read().tags.clone()
    }

    /// Attach a caller-defined label.
    pub fn add_tag(&self, tag: impl Into<String>) {
        self.write().tags.insert(tag.into());
    }

    /// Whether the entry has outlived its expiry at `now`.
    ///
    /// An entry is still live at the exact instant it expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.read().expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Whether a resolution attempt would do anything at `now`.
    ///
    /// False for unparsable references, available entries and failed entries
    /// still inside their retry window.
    #[must_use]
    pub fn needs_resolution(&self, now: DateTime<Utc>) -> bool {
        if !self.reference.is_resolvable() {
            return false;
        }
        let state = self.read();
        !state.is_available && state.expires_at.is_none_or(|expires_at| expires_at < now)
    }

    pub(crate) fn mark_resolved(&self, inputs: ParameterMap, outputs: ParameterMap, expires_at: DateTime<Utc>) {
        let mut state = self.write();
        state.inputs = inputs;
        state.outputs = outputs;
        state.is_available = true;
        state.expires_at = Some(expires_at);
    }

    pub(crate) fn mark_failed(&self, expires_at: DateTime<Utc>) {
        let mut state = self.write();
        state.inputs.clear();
        state.outputs.clear();
        state.is_available = false;
        state.expires_at = Some(expires_at);
    }

    pub(crate) fn invalidate(&self) {
        self.write().is_available = false;
    }

    pub(crate) async fn lock_resolution(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.resolve_gate.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(raw: &str) -> ResolvedEntry {
        ResolvedEntry::new(Reference::parse(raw))
    }

    #[test]
    fn test_fresh_entry_is_pending() {
        let entry = entry("actions/checkout@v4");
        let now = Utc::now();
        assert!(!entry.is_available());
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired(now));
        assert!(entry.needs_resolution(now));
    }

    #[test]
    fn test_unparsable_never_needs_resolution() {
        let entry = entry("no-at-sign");
        assert!(!entry.needs_resolution(Utc::now()));
    }

    #[test]
    fn test_failure_window() {
        let entry = entry("actions/checkout@v4");
        let now = Utc::now();
        entry.mark_failed(now + Duration::minutes(10));

        assert!(!entry.needs_resolution(now + Duration::minutes(5)));
        assert!(entry.needs_resolution(now + Duration::minutes(11)));
        assert!(entry.is_expired(now + Duration::minutes(11)));
    }

    #[test]
    fn test_expiry_instant_is_still_live() {
        let entry = entry("actions/checkout@v4");
        let expires_at = Utc::now();
        entry.mark_failed(expires_at);

        assert!(!entry.is_expired(expires_at));
        assert!(!entry.needs_resolution(expires_at));
        assert!(entry.is_expired(expires_at + Duration::milliseconds(1)));
        assert!(entry.needs_resolution(expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_resolved_then_invalidated() {
        let entry = entry("actions/checkout@v4");
        let now = Utc::now();
        let mut inputs = ParameterMap::new();
        inputs.insert("ref".to_string(), "The branch".to_string());
        entry.mark_resolved(inputs, ParameterMap::new(), now + Duration::days(1));

        assert!(entry.is_available());
        assert_eq!(entry.inputs().get("ref").map(String::as_str), Some("The branch"));
        assert!(!entry.needs_resolution(now));

        entry.invalidate();
        assert!(!entry.is_available());
        assert_eq!(entry.snapshot().inputs.len(), 1);
    }

    #[test]
    fn test_tags() {
        let entry = entry("actions/checkout@v4");
        entry.add_tag("pinned");
        entry.add_tag("pinned");
        assert_eq!(entry.tags().len(), 1);
    }
}
