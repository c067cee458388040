//! Error handling for wflens
//!
//! This module provides the error types and user-facing error reporting for
//! wflens. Two principles drive it:
//! 1. **Strongly-typed errors** so the resolver can classify failures
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Reference parsing**: [`WorkflowError::InvalidReference`]
//! - **Fetching**: [`WorkflowError::FetchFailed`], [`WorkflowError::HttpStatus`],
//!   [`WorkflowError::EmptyContent`], [`WorkflowError::LocalPathOutsideProject`]
//! - **Content parsing**: [`WorkflowError::ContentParse`]
//! - **Configuration and files**: [`WorkflowError::ConfigError`],
//!   [`WorkflowError::FileSystemError`], [`WorkflowError::IoError`]
//!
//! Resolution failures never reach the caller of
//! [`Resolver::resolve`](crate::resolver::Resolver::resolve); they are logged
//! and recorded as a short-lived negative cache entry. The variants here are
//! surfaced by the fetch collaborators, the YAML loader, configuration loading
//! and the CLI.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wflens::core::{WorkflowError, ErrorContext, user_friendly_error};
//!
//! let error = WorkflowError::HttpStatus {
//!     url: "https://raw.githubusercontent.com/actions/checkout/v9/action.yml".to_string(),
//!     status: 404,
//! };
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for wflens operations
///
/// # Error Categories
///
/// ## Reference handling
/// - [`InvalidReference`] - A `uses` string without a recognizable `@ref`
///
/// ## Fetching
/// - [`FetchFailed`] - Network or filesystem failure while fetching content
/// - [`HttpStatus`] - The remote answered with a non-success status
/// - [`EmptyContent`] - The fetch succeeded but returned nothing
/// - [`LocalPathOutsideProject`] - A local reference escapes the project root
///
/// ## Parsing
/// - [`ContentParse`] - Fetched content is not a YAML mapping
///
/// ## Configuration and I/O
/// - [`ConfigError`] - Configuration file issues
/// - [`FileSystemError`] - Cache directory and file handling
/// - [`IoError`] - Standard I/O errors from [`std::io::Error`]
/// - [`TomlError`] - TOML parsing errors from [`toml::de::Error`]
///
/// [`InvalidReference`]: WorkflowError::InvalidReference
/// [`FetchFailed`]: WorkflowError::FetchFailed
/// [`HttpStatus`]: WorkflowError::HttpStatus
/// [`EmptyContent`]: WorkflowError::EmptyContent
/// [`LocalPathOutsideProject`]: WorkflowError::LocalPathOutsideProject
/// [`ContentParse`]: WorkflowError::ContentParse
/// [`ConfigError`]: WorkflowError::ConfigError
/// [`FileSystemError`]: WorkflowError::FileSystemError
/// [`IoError`]: WorkflowError::IoError
/// [`TomlError`]: WorkflowError::TomlError
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// A reference string could not be parsed into a descriptor.
    #[error("Invalid reference '{reference}': {reason}")]
    InvalidReference {
        /// The raw `uses` value
        reference: String,
        /// Why parsing failed
        reason: String,
    },

    /// Content could not be fetched from its location.
    #[error("Failed to fetch {location}: {reason}")]
    FetchFailed {
        /// URL or path that was fetched
        location: String,
        /// Underlying failure
        reason: String,
    },

    /// The remote host answered with a non-success status.
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// The fetch succeeded but returned no content.
    #[error("Empty content at {location}")]
    EmptyContent {
        /// URL or path that was fetched
        location: String,
    },

    /// A local reference points outside the project directory.
    #[error("Local reference '{path}' resolves outside the project directory")]
    LocalPathOutsideProject {
        /// The offending path
        path: String,
    },

    /// Fetched content is not valid structured content.
    #[error("Failed to parse {source_name}: {reason}")]
    ContentParse {
        /// Document identifier used in diagnostics
        source_name: String,
        /// Parser message
        reason: String,
    },

    /// Configuration problem.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// File system operation on the cache failed.
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// What was being done
        operation: String,
        /// Path involved
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Catch-all
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl WorkflowError {
    /// Whether the error came from the fetch layer.
    ///
    /// Fetch-layer and parse-layer failures are treated the same by the
    /// resolver; the distinction only matters for log messages.
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. }
                | Self::HttpStatus { .. }
                | Self::EmptyContent { .. }
                | Self::LocalPathOutsideProject { .. }
        )
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`WorkflowError`] with optional details and a
/// suggestion. It is how the CLI presents errors.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: WorkflowError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: WorkflowError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// [`WorkflowError`] values anywhere in the `anyhow` chain are recognized
/// first, then common standard library errors. Anything else is wrapped as
/// [`WorkflowError::Other`] with the full chain in the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(workflow_error) = error.chain().find_map(|e| e.downcast_ref::<WorkflowError>()) {
        return create_error_context(workflow_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(WorkflowError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check ownership of the file or of the wflens cache directory")
                .with_details(format!("{error:#}"));
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(WorkflowError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details(format!("{error:#}"));
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(WorkflowError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of ~/.wflens/config.toml");
    }

    ErrorContext::new(WorkflowError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: &WorkflowError) -> ErrorContext {
    match error {
        WorkflowError::InvalidReference { reference, reason } => {
            ErrorContext::new(WorkflowError::InvalidReference {
                reference: reference.clone(),
                reason: reason.clone(),
            })
            .with_suggestion("References look like 'owner/repo@ref', 'owner/repo/path@ref', 'owner/repo/.github/workflows/file.yml@ref' or './.github/actions/name'")
        }
        WorkflowError::HttpStatus { url, status } => {
            let ctx = ErrorContext::new(WorkflowError::HttpStatus {
                url: url.clone(),
                status: *status,
            });
            if *status == 404 {
                ctx.with_suggestion("Check that the repository, the ref and the path exist")
                    .with_details("Private repositories cannot be resolved without credentials")
            } else {
                ctx.with_suggestion("Retry later; the failure is cached for a few minutes")
            }
        }
        WorkflowError::FetchFailed { location, reason } => {
            ErrorContext::new(WorkflowError::FetchFailed {
                location: location.clone(),
                reason: reason.clone(),
            })
            .with_suggestion("Check your internet connection or the local path")
        }
        WorkflowError::EmptyContent { location } => ErrorContext::new(WorkflowError::EmptyContent {
            location: location.clone(),
        }),
        WorkflowError::LocalPathOutsideProject { path } => {
            ErrorContext::new(WorkflowError::LocalPathOutsideProject { path: path.clone() })
                .with_suggestion("Local references must stay inside the project, e.g. './.github/actions/name'")
        }
        WorkflowError::ContentParse { source_name, reason } => {
            ErrorContext::new(WorkflowError::ContentParse {
                source_name: source_name.clone(),
                reason: reason.clone(),
            })
            .with_details("The content must be a YAML mapping such as an action.yml or a workflow file")
        }
        WorkflowError::ConfigError { message } => ErrorContext::new(WorkflowError::ConfigError {
            message: message.clone(),
        })
        .with_suggestion("Check ~/.wflens/config.toml or the file named by WFLENS_CONFIG_PATH"),
        WorkflowError::FileSystemError { operation, path } => {
            ErrorContext::new(WorkflowError::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            })
            .with_suggestion("Run 'wflens cache clean' to reset the content cache")
        }
        WorkflowError::IoError(e) => ErrorContext::new(WorkflowError::Other {
            message: format!("IO error: {e}"),
        }),
        WorkflowError::TomlError(e) => ErrorContext::new(WorkflowError::ConfigError {
            message: e.to_string(),
        }),
        WorkflowError::Other { message } => ErrorContext::new(WorkflowError::Other {
            message: message.clone(),
        }),
    }
}
