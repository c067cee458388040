//! Summarize a workflow file.
//!
//! Prints every job with its dependencies and steps, flags `needs:` entries
//! naming jobs that do not exist, and with `--resolve` resolves every
//! referenced action or reusable workflow and reports `with:` keys the
//! target does not declare.
//!
//! ```bash
//! wflens inspect .github/workflows/ci.yml
//! wflens inspect .github/workflows/ci.yml --resolve --format json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::constants::{CONTROL_DIR, FIELD_WITH};
use crate::context::{ContextCache, WorkflowContext};
use crate::resolver::{ResolvedEntry, Resolver};
use crate::tree::NodeRef;
use crate::tree::yaml::parse_document;

use super::OutputFormat;
use super::resolve::{ResolveReport, print_entry};

/// Arguments of `wflens inspect`.
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Workflow or action file to read
    file: PathBuf,

    /// Resolve every `uses:` reference and check `with:` keys
    #[arg(long)]
    resolve: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct JobSummary {
    name: String,
    needs: Vec<String>,
    steps: Vec<String>,
    uses: Option<String>,
}

/// A `with:` key the referenced action or workflow does not declare.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct UnknownInput {
    uses: String,
    input: String,
    job: Option<String>,
    line: usize,
}

#[derive(Debug, Serialize)]
struct InspectReport<'a> {
    file: String,
    jobs: Vec<JobSummary>,
    unknown_needs: Vec<(String, String)>,
    references: Vec<ResolveReport<'a>>,
    unknown_inputs: Vec<UnknownInput>,
}

impl InspectCommand {
    pub(super) fn file(&self) -> &Path {
        &self.file
    }

    /// Read, summarize and optionally resolve the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub async fn execute(self, resolver: &Resolver) -> Result<()> {
        let text = tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let name = self.file.display().to_string();

        let contexts = ContextCache::new();
        let context = contexts.get_or_build(&name, || parse_document(&name, &text))?;

        let entries: Vec<Arc<ResolvedEntry>> = if self.resolve {
            let entries: Vec<_> = context
                .uses_references()
                .into_iter()
                .map(|raw| resolver.cache().get_or_create(raw))
                .collect();
            resolver.resolve_all(&entries).await;
            entries
        } else {
            Vec::new()
        };
        let by_raw: BTreeMap<&str, &ResolvedEntry> =
            entries.iter().map(|e| (e.reference().raw(), Arc::as_ref(e))).collect();
        let unknown_inputs = unknown_inputs(&context, &by_raw);

        let report = InspectReport {
            file: name,
            jobs: summarize_jobs(&context),
            unknown_needs: context.unknown_needs(),
            references: entries.iter().map(|e| ResolveReport::new(e)).collect(),
            unknown_inputs,
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report, &entries),
        }
        Ok(())
    }
}

fn summarize_jobs(context: &WorkflowContext) -> Vec<JobSummary> {
    context
        .jobs()
        .into_iter()
        .filter_map(|job| {
            let name = job.key()?.to_string();
            let steps = job
                .list_steps()
                .iter()
                .enumerate()
                .map(|(i, step)| {
                    step.id()
                        .or_else(|| step.uses_or_name())
                        .map_or_else(|| format!("step {}", i + 1), str::to_string)
                })
                .collect();
            Some(JobSummary {
                needs: context.needs_of(&name).into_iter().collect(),
                uses: job.uses().map(str::to_string),
                name,
                steps,
            })
        })
        .collect()
}

/// Keys passed through `with:` that the resolved target does not declare.
fn unknown_inputs(context: &WorkflowContext, entries: &BTreeMap<&str, &ResolvedEntry>) -> Vec<UnknownInput> {
    let document = context.document();
    let source = document.source().unwrap_or_default();
    let arguments = document
        .root()
        .find_child_nodes(|n| n.key().is_some() && n.parent().and_then(|p| p.key()) == Some(FIELD_WITH));

    let mut unknown = Vec::new();
    for argument in arguments {
        let Some(uses) = argument.find_parent_with().and_then(|with| with.parent()).and_then(|owner| owner.uses())
        else {
            continue;
        };
        let Some(entry) = entries.get(uses).filter(|e| e.is_available()) else {
            continue;
        };
        let Some(input) = argument.key() else { continue };
        if entry.inputs().contains_key(input) {
            continue;
        }
        debug!("'{}' does not declare input '{}'", uses, input);
        unknown.push(UnknownInput {
            uses: uses.to_string(),
            input: input.to_string(),
            job: argument.find_parent_job().and_then(|j| j.key()).map(str::to_string),
            line: line_of(source, &argument),
        });
    }
    unknown
}

fn line_of(source: &str, node: &NodeRef<'_>) -> usize {
    node.text_range()
        .and_then(|range| source.get(..range.start))
        .map_or(0, |prefix| prefix.matches('\n').count() + 1)
}

fn print_report(report: &InspectReport<'_>, entries: &[Arc<ResolvedEntry>]) {
    println!("{}", report.file.bold());
    for job in &report.jobs {
        print!("  {}", job.name.cyan());
        if !job.needs.is_empty() {
            print!(" (needs {})", job.needs.join(", "));
        }
        println!();
        if let Some(uses) = &job.uses {
            println!("    uses {uses}");
        }
        for step in &job.steps {
            println!("    - {step}");
        }
    }

    for (job, missing) in &report.unknown_needs {
        println!("{} job '{}' needs unknown job '{}'", "warning:".yellow(), job, missing);
    }

    if !entries.is_empty() {
        println!();
        for entry in entries {
            print_entry(entry);
        }
    }

    for unknown in &report.unknown_inputs {
        println!(
            "{} line {}: '{}' does not declare input '{}'",
            "warning:".yellow(),
            unknown.line,
            unknown.uses,
            unknown.input
        );
    }
}

/// The directory holding `.github` above `file`, else the current directory.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub(super) fn detect_project_root(file: &Path) -> Result<PathBuf> {
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir().context("Failed to determine the current directory")?.join(file)
    };
    let root = absolute
        .ancestors()
        .find(|dir| dir.file_name().is_some_and(|name| name == CONTROL_DIR))
        .and_then(Path::parent)
        .map(Path::to_path_buf);
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("Failed to determine the current directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionCache;
    use crate::test_utils::{StaticFetcher, fixtures};

    fn context() -> WorkflowContext {
        WorkflowContext::new(Arc::new(parse_document("ci.yml", fixtures::CALLER_WORKFLOW).unwrap()))
    }

    #[test]
    fn test_summarize_jobs() {
        let jobs = summarize_jobs(&context());
        let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["build", "lint", "deploy"]);
        assert_eq!(jobs[0].steps, vec!["actions/checkout@v4", "./.github/actions/build"]);
        assert_eq!(jobs[1].steps, vec!["actions/checkout@v4", "step 2"]);
        assert_eq!(jobs[2].needs, vec!["build", "lint"]);
        assert_eq!(jobs[2].uses.as_deref(), Some("org/repo/.github/workflows/deploy.yml@main"));
    }

    #[tokio::test]
    async fn test_unknown_inputs() {
        let resolver = Resolver::new(
            Arc::new(ResolutionCache::new(None)),
            Arc::new(StaticFetcher::new().with(
                "https://raw.githubusercontent.com/actions/checkout/v4/action.yml",
                "inputs:\n  ref:\n    description: Ref\n",
            )),
            Arc::new(StaticFetcher::new().with("./.github/actions/build", fixtures::LOCAL_ACTION)),
        );
        let context = context();
        let entries: Vec<_> = context
            .uses_references()
            .into_iter()
            .map(|raw| resolver.cache().get_or_create(raw))
            .collect();
        resolver.resolve_all(&entries).await;
        let by_raw = entries.iter().map(|e| (e.reference().raw(), Arc::as_ref(e))).collect();

        let unknown = unknown_inputs(&context, &by_raw);
        assert_eq!(
            unknown,
            vec![UnknownInput {
                uses: "actions/checkout@v4".to_string(),
                input: "fetch-depth".to_string(),
                job: Some("build".to_string()),
                line: 12,
            }]
        );
    }

    #[test]
    fn test_detect_project_root() {
        let root = detect_project_root(Path::new("/work/repo/.github/workflows/ci.yml")).unwrap();
        assert_eq!(root, PathBuf::from("/work/repo"));
    }
}
