//! Structure of parsed documents and workflow navigation over them.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use wflens::context::WorkflowContext;
use wflens::core::WorkflowError;
use wflens::tree::yaml::{parse_document, parse_mapping_document};
use wflens::test_utils::fixtures;

/// Every node lies inside its parent, slices its own text, and pre-order
/// visits nodes by start offset
#[test]
fn test_ranges_nest_and_follow_document_order() -> Result<()> {
    let doc = parse_document("ci.yml", fixtures::CALLER_WORKFLOW)?;
    let nodes = doc.root().all_nodes();
    assert_eq!(nodes.len(), doc.len());

    let mut previous_start = 0;
    for node in &nodes {
        let range = node.text_range().expect("parsed nodes carry ranges");
        assert!(range.start >= previous_start, "{node:?} out of order");
        previous_start = range.start;

        // Ranges slice the source back to the node's own text
        if let Some(text) = node.text() {
            assert_eq!(node.source_text(), Some(text));
        }
        if let Some(key) = node.key() {
            assert!(node.source_text().is_some_and(|t| t.starts_with(key)), "{node:?}");
        }

        if let Some(parent) = node.parent() {
            let outer = parent.text_range().expect("parent range");
            assert!(outer.start <= range.start && range.end <= outer.end, "{node:?} escapes {parent:?}");
        }
    }
    Ok(())
}

/// Offsets map back to the innermost node and its enclosing step and job
#[test]
fn test_node_at_offset() -> Result<()> {
    let source = fixtures::CALLER_WORKFLOW;
    let doc = parse_document("ci.yml", source)?;
    let offset = source.find("fetch-depth").expect("fixture mentions fetch-depth") + 2;

    let keyed = doc.node_at(offset).expect("offset inside the document");

    assert_eq!(keyed.key(), Some("fetch-depth"));
    assert!(keyed.find_parent_with().is_some());
    assert_eq!(keyed.find_parent_step().and_then(|s| s.uses()), Some("actions/checkout@v4"));
    assert_eq!(keyed.find_parent_job().and_then(|j| j.key()), Some("build"));
    assert_eq!(keyed.path(), "jobs/build/steps/with/fetch-depth");
    Ok(())
}

/// The context gathers jobs, references and the needs graph
#[test]
fn test_workflow_context() -> Result<()> {
    let context = WorkflowContext::new(Arc::new(parse_document("ci.yml", fixtures::CALLER_WORKFLOW)?));

    assert_eq!(context.job_names(), vec!["build", "lint", "deploy"]);
    assert_eq!(
        context.uses_references(),
        vec!["actions/checkout@v4", "./.github/actions/build", "org/repo/.github/workflows/deploy.yml@main"]
    );
    assert_eq!(context.needs_of("deploy"), BTreeSet::from(["build".to_string(), "lint".to_string()]));
    assert!(context.needs_of("build").is_empty());
    assert!(context.unknown_needs().is_empty());
    assert_eq!(context.job("lint").map(|j| j.list_steps().len()), Some(2));
    Ok(())
}

/// Reusable workflow interface blocks are found under `on:` only
#[test]
fn test_reusable_workflow_interface() -> Result<()> {
    let context = WorkflowContext::new(Arc::new(parse_document("deploy.yml", fixtures::REUSABLE_WORKFLOW)?));

    let inputs: Vec<_> = context.inputs().iter().filter_map(|n| n.key()).collect();
    assert_eq!(inputs, vec!["environment", "dry-run"]);
    assert_eq!(inputs.len(), context.inputs().iter().filter(|n| n.find_parent_on().is_some()).count());

    // The job-level `outputs:` block is not part of the interface
    let outputs = context.outputs();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].description(), Some("Deployed URL"));
    Ok(())
}

/// Documents that are not a mapping are rejected
#[test]
fn test_non_mapping_documents_are_parse_errors() {
    for text in ["<html><body>Not Found</body></html>", "- just\n- a list\n", "   \n"] {
        let err = parse_mapping_document("page", text).unwrap_err();
        assert!(matches!(err, WorkflowError::ContentParse { .. }), "{text:?}: {err}");
    }
}
