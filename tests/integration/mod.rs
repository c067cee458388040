//! Integration test suite for wflens
//!
//! End-to-end tests over the public library API and the `wflens` binary.
//! None of them reach the network: remote content is served by
//! [`StaticFetcher`](wflens::test_utils::StaticFetcher) and the binary is
//! only pointed at local references.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cache_behavior**: Expiry, eviction and negative-result backoff
//! - **cli_commands**: `resolve`, `inspect` and `cache` through the binary
//! - **resolve_flow**: Resolving actions, reusable workflows and local paths
//! - **tree_navigation**: Positional tree structure and workflow navigation

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cache_behavior;
mod cli_commands;
mod resolve_flow;
mod tree_navigation;
