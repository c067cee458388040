//! Core types for wflens
//!
//! This module holds the error handling shared by every other module:
//! - [`WorkflowError`] - Enumerated error types covering all failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! # Example
//!
//! ```rust
//! use wflens::core::{WorkflowError, user_friendly_error};
//!
//! let err = anyhow::Error::from(WorkflowError::EmptyContent {
//!     location: "./.github/actions/build".to_string(),
//! });
//! let friendly = user_friendly_error(err);
//! assert!(friendly.to_string().contains("Empty content"));
//! ```

pub mod error;

pub use error::{ErrorContext, WorkflowError, user_friendly_error};
