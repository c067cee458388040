//! wflens - CI workflow reference resolver
//!
//! wflens helps authors of CI workflow definitions in two ways:
//!
//! - it models a parsed workflow as a **positional tree** whose nodes keep
//!   their byte ranges, with navigation that understands jobs, steps,
//!   triggers and `needs:` dependencies
//! - it **resolves `uses:` references** (`owner/repo@ref`, reusable workflow
//!   paths, local `./.github/...` paths) into the inputs and outputs the
//!   target declares, with a time-bounded cache and negative-result backoff
//!
//! # Architecture Overview
//!
//! ```text
//! "actions/checkout@v4" ──► reference::Reference::parse
//!                                  │
//!                                  ▼
//!                    resolver::ResolutionCache::get_or_create
//!                                  │
//!                                  ▼
//!     resolver::Resolver::resolve ──► ContentFetcher ──► tree::yaml ──► inputs/outputs
//! ```
//!
//! # Core Modules
//!
//! - [`tree`] - Arena-backed positional tree, navigation and YAML conversion
//! - [`reference`] - Parsing of reference strings and URL derivation
//! - [`resolver`] - Resolution cache, fetch collaborators and the resolver
//! - [`context`] - Precomputed per-document navigation results
//! - [`config`] - Global configuration (`~/.wflens/config.toml`)
//! - [`core`] - Error types and user-facing error reporting
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```rust
//! use wflens::reference::{Reference, ReferenceKind};
//! use wflens::tree::yaml;
//!
//! # fn main() -> anyhow::Result<()> {
//! let doc = yaml::parse_document("ci.yml", "jobs:\n  build:\n    steps:\n      - uses: actions/checkout@v4\n")?;
//! let step = &doc.root().list_steps()[0];
//! let reference = Reference::parse(step.uses().unwrap_or_default());
//! assert_eq!(reference.kind(), ReferenceKind::Action);
//! assert_eq!(step.find_parent_job().and_then(|j| j.key()), Some("build"));
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// Workflow model
pub mod context;
pub mod tree;

// Reference resolution
pub mod reference;
pub mod resolver;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
