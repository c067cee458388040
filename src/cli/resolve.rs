//! Resolve references from the command line.
//!
//! # Examples
//!
//! ```bash
//! wflens resolve actions/checkout@v4
//! wflens resolve ./.github/actions/build --project-root .
//! wflens resolve actions/setup-node@v4 actions/cache@v4 --format json
//! ```
//!
//! The command exits with an error when any reference is unparsable or
//! could not be resolved; the per-reference report is printed first.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::core::WorkflowError;
use crate::reference::{Reference, ReferenceKind};
use crate::resolver::{ResolutionSnapshot, ResolvedEntry, Resolver};

use super::OutputFormat;

/// Arguments of `wflens resolve`.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// References as written after `uses:`
    #[arg(required = true)]
    references: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// JSON shape of one resolved reference.
#[derive(Debug, Serialize)]
pub(super) struct ResolveReport<'a> {
    reference: &'a Reference,
    #[serde(flatten)]
    state: ResolutionSnapshot,
    browse_url: Option<String>,
    marketplace_url: Option<String>,
    repository_url: Option<String>,
}

impl<'a> ResolveReport<'a> {
    pub(super) fn new(entry: &'a ResolvedEntry) -> Self {
        let reference = entry.reference();
        Self {
            reference,
            state: entry.snapshot(),
            browse_url: reference.browse_url(),
            marketplace_url: reference.marketplace_url(),
            repository_url: reference.repository_url(),
        }
    }
}

impl ResolveCommand {
    /// Resolve every reference concurrently and print the results.
    ///
    /// # Errors
    ///
    /// Returns an error after printing if any reference is unavailable.
    pub async fn execute(self, resolver: &Resolver) -> Result<()> {
        let entries: Vec<Arc<ResolvedEntry>> =
            self.references.iter().map(|raw| resolver.cache().get_or_create(raw)).collect();
        resolver.resolve_all(&entries).await;

        match self.format {
            OutputFormat::Json => {
                let reports: Vec<_> = entries.iter().map(|e| ResolveReport::new(e)).collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }
            OutputFormat::Text => {
                for entry in &entries {
                    print_entry(entry);
                }
            }
        }

        let failed: Vec<&ResolvedEntry> =
            entries.iter().filter(|e| !e.is_available()).map(Arc::as_ref).collect();
        match failed.as_slice() {
            [] => Ok(()),
            [single] if single.reference().kind() == ReferenceKind::Unparsable => {
                Err(WorkflowError::InvalidReference {
                    reference: single.reference().raw().to_string(),
                    reason: "expected owner/repo[/path]@ref or ./.github/...".to_string(),
                }
                .into())
            }
            _ => {
                let names: Vec<&str> = failed.iter().map(|e| e.reference().raw()).collect();
                Err(WorkflowError::Other {
                    message: format!(
                        "{} of {} references could not be resolved: {}",
                        failed.len(),
                        entries.len(),
                        names.join(", ")
                    ),
                }
                .into())
            }
        }
    }
}

pub(super) fn print_entry(entry: &ResolvedEntry) {
    let reference = entry.reference();
    let snapshot = entry.snapshot();

    let status = if snapshot.is_available {
        "resolved".green()
    } else if reference.kind() == ReferenceKind::Unparsable {
        "unparsable".red()
    } else {
        "unavailable".yellow()
    };
    println!("{} ({}) {}", reference.raw().bold(), reference.kind(), status);

    if let Some(url) = reference.browse_url() {
        println!("  source:      {url}");
    }
    if let Some(url) = reference.marketplace_url() {
        println!("  marketplace: {url}");
    }
    if !snapshot.is_available {
        return;
    }

    print_parameters("inputs", &snapshot.inputs);
    print_parameters("outputs", &snapshot.outputs);
}

fn print_parameters(label: &str, parameters: &crate::resolver::ParameterMap) {
    if parameters.is_empty() {
        return;
    }
    println!("  {label}:");
    for (name, description) in parameters {
        if description.is_empty() {
            println!("    {}", name.cyan());
        } else {
            println!("    {}  {}", name.cyan(), description.trim().dimmed());
        }
    }
}
