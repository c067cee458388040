//! Test utilities for wflens
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] - one-time `tracing` setup honoring `RUST_LOG`
//! - [`ManualClock`] - a [`Clock`] that only moves when told to
//! - [`StaticFetcher`] - a [`ContentFetcher`] serving fixed content and counting calls
//! - [`fixtures`] - action manifests and workflows used across tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wflens::resolver::{ResolutionCache, Resolver};
//! use wflens::test_utils::{ManualClock, StaticFetcher, fixtures};
//!
//! # async fn example() {
//! let clock = Arc::new(ManualClock::default());
//! let remote = Arc::new(StaticFetcher::new().with(
//!     "https://raw.githubusercontent.com/actions/checkout/v4/action.yml",
//!     fixtures::CHECKOUT_ACTION,
//! ));
//! let cache = Arc::new(ResolutionCache::with_clock(None, clock.clone()));
//! let resolver = Resolver::new(cache, remote.clone(), Arc::new(StaticFetcher::new()));
//!
//! let entry = resolver.resolve_raw("actions/checkout@v4").await;
//! assert!(entry.is_available());
//! assert_eq!(remote.fetch_count(), 1);
//! # }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::WorkflowError;
use crate::resolver::{Clock, ContentFetcher};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Runs once per process. Uses `level` when given, otherwise `RUST_LOG`;
/// with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=wflens=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Clock frozen at construction time until advanced.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl ManualClock {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fetcher answering from a fixed table.
///
/// Unknown locations fail with HTTP 404. Every call is recorded, including
/// failed ones.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `location`.
    #[must_use]
    pub fn with(mut self, location: &str, content: &str) -> Self {
        self.responses.insert(location.to_string(), content.to_string());
        self
    }

    /// Sleep before answering, to widen race windows.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fetched_locations(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, location: &str) -> Result<String, WorkflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(location.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses.get(location).cloned().ok_or_else(|| WorkflowError::HttpStatus {
            url: location.to_string(),
            status: 404,
        })
    }
}
