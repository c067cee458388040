//! Per-document navigation results.
//!
//! Walking a tree to answer "which jobs exist" or "what does `deploy` need"
//! is cheap but repeated on every query. A [`WorkflowContext`] runs those
//! walks once when a document is parsed and keeps the answers next to the
//! document. The [`ContextCache`] keeps contexts for already-parsed content
//! so that a second lookup of the same content does not parse again.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use wflens::context::WorkflowContext;
//! use wflens::tree::yaml;
//!
//! # fn main() -> anyhow::Result<()> {
//! let text = "jobs:\n  build:\n    runs-on: ubuntu-latest\n  test:\n    needs: build\n";
//! let context = WorkflowContext::new(Arc::new(yaml::parse_document("ci.yml", text)?));
//!
//! assert_eq!(context.job_names(), vec!["build", "test"]);
//! assert!(context.needs_of("test").contains("build"));
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::constants::{FIELD_ENV, FIELD_INPUTS, FIELD_NEEDS, FIELD_OUTPUTS, FIELD_SECRETS, FIELD_USES};
use crate::core::WorkflowError;
use crate::tree::{Document, NodeId, NodeRef};

/// Navigation results precomputed for one document.
#[derive(Debug)]
pub struct WorkflowContext {
    document: Arc<Document>,
    jobs: Vec<NodeId>,
    steps: Vec<NodeId>,
    uses: Vec<NodeId>,
    inputs: Vec<NodeId>,
    secrets: Vec<NodeId>,
    outputs: Vec<NodeId>,
    env: Vec<NodeId>,
    needs: BTreeMap<String, BTreeSet<String>>,
}

impl WorkflowContext {
    /// Build the context by walking `document` once per category.
    #[must_use]
    pub fn new(document: Arc<Document>) -> Self {
        let mut context = Self {
            document,
            jobs: Vec::new(),
            steps: Vec::new(),
            uses: Vec::new(),
            inputs: Vec::new(),
            secrets: Vec::new(),
            outputs: Vec::new(),
            env: Vec::new(),
            needs: BTreeMap::new(),
        };
        context.init();
        context
    }

    fn init(&mut self) {
        let document = Arc::clone(&self.document);
        let root = document.root();

        self.jobs = ids(root.list_jobs());
        self.steps = ids(root.list_steps());
        self.uses = ids(root.find_child_nodes(|n| n.key() == Some(FIELD_USES)));
        self.inputs = ids(root.find_child_nodes(|n| is_interface_entry(n, FIELD_INPUTS)));
        self.secrets = ids(root.find_child_nodes(|n| is_interface_entry(n, FIELD_SECRETS)));
        self.outputs = ids(root.find_child_nodes(|n| is_interface_entry(n, FIELD_OUTPUTS)));
        self.env = ids(root.find_child_nodes(|n| {
            n.parent().and_then(|p| p.key()) == Some(FIELD_ENV) && n.key().is_some()
        }));

        for job in root.list_jobs() {
            let Some(name) = job.key() else { continue };
            let needs = job.child(FIELD_NEEDS).map(|n| n.dependency_ids()).unwrap_or_default();
            self.needs.insert(name.to_string(), needs);
        }

        debug!(
            "Built context: {} jobs, {} steps, {} uses",
            self.jobs.len(),
            self.steps.len(),
            self.uses.len()
        );
    }

    fn resolve(&self, ids: &[NodeId]) -> Vec<NodeRef<'_>> {
        ids.iter().filter_map(|&id| self.document.node(id)).collect()
    }

    #[must_use]
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Every job, in document order.
    #[must_use]
    pub fn jobs(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.jobs)
    }

    /// Job ids in document order.
    #[must_use]
    pub fn job_names(&self) -> Vec<&str> {
        self.jobs().into_iter().filter_map(|job| job.key()).collect()
    }

    /// The job keyed `name`, ignoring ASCII case.
    #[must_use]
    pub fn job(&self, name: &str) -> Option<NodeRef<'_>> {
        self.jobs().into_iter().find(|job| job.key().is_some_and(|k| k.eq_ignore_ascii_case(name)))
    }

    /// Every step of every job, in document order.
    #[must_use]
    pub fn steps(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.steps)
    }

    /// Every `uses:` entry, for steps and reusable-workflow jobs alike.
    #[must_use]
    pub fn uses(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.uses)
    }

    /// Distinct `uses:` values in first-seen order.
    #[must_use]
    pub fn uses_references(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.uses()
            .into_iter()
            .filter_map(|node| node.text_or_child_text_no_quotes())
            .filter(|value| seen.insert(*value))
            .collect()
    }

    /// Declared inputs: top-level `inputs:` of an action, or `inputs:` of a trigger.
    #[must_use]
    pub fn inputs(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.inputs)
    }

    /// Secrets declared under a trigger such as `workflow_call`.
    #[must_use]
    pub fn secrets(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.secrets)
    }

    /// Declared outputs, top-level or under a trigger.
    #[must_use]
    pub fn outputs(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.outputs)
    }

    /// Environment variables declared at any level.
    #[must_use]
    pub fn env(&self) -> Vec<NodeRef<'_>> {
        self.resolve(&self.env)
    }

    /// Job id to the ids listed in its `needs:`.
    #[must_use]
    pub const fn needs_graph(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.needs
    }

    /// Dependencies of one job; empty for unknown jobs.
    #[must_use]
    pub fn needs_of(&self, job: &str) -> BTreeSet<String> {
        self.needs.get(job).cloned().unwrap_or_default()
    }

    /// `needs:` entries naming a job that does not exist, as `(job, missing)`.
    #[must_use]
    pub fn unknown_needs(&self) -> Vec<(String, String)> {
        self.needs
            .iter()
            .flat_map(|(job, deps)| {
                deps.iter()
                    .filter(|dep| !self.needs.contains_key(*dep))
                    .map(move |dep| (job.clone(), dep.clone()))
            })
            .collect()
    }
}

fn ids(nodes: Vec<NodeRef<'_>>) -> Vec<NodeId> {
    nodes.iter().map(NodeRef::node_id).collect()
}

/// Entries of an `inputs`/`outputs`/`secrets` block that declares an interface.
///
/// The block is either at the top level (action manifests) or below the
/// `on:` trigger block (`workflow_call`, `workflow_dispatch`). Job and step
/// level blocks of the same name are not part of the interface.
fn is_interface_entry(node: &NodeRef<'_>, block: &str) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.key() != Some(block) || node.key_or_id_or_name().is_none() {
        return false;
    }
    let top_level = parent.parent().is_some_and(|owner| owner.parent().is_none());
    top_level || parent.find_parent_on().is_some()
}

/// Session-wide map from a content identifier to its parsed context.
#[derive(Debug, Default)]
pub struct ContextCache {
    contexts: DashMap<String, Arc<WorkflowContext>>,
}

impl ContextCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<WorkflowContext>> {
        self.contexts.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a context, replacing any previous one for `id`.
    pub fn insert(&self, id: impl Into<String>, context: Arc<WorkflowContext>) {
        self.contexts.insert(id.into(), context);
    }

    /// Return the stored context or build and store one.
    ///
    /// `build` runs outside the map lock. When two callers race, both build
    /// and the first stored context wins.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `build`; nothing is stored then.
    pub fn get_or_build(
        &self,
        id: &str,
        build: impl FnOnce() -> Result<Document, WorkflowError>,
    ) -> Result<Arc<WorkflowContext>, WorkflowError> {
        if let Some(context) = self.get(id) {
            return Ok(context);
        }
        let context = Arc::new(WorkflowContext::new(Arc::new(build()?)));
        Ok(Arc::clone(self.contexts.entry(id.to_string()).or_insert(context).value()))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<WorkflowContext>> {
        self.contexts.remove(id).map(|(_, context)| context)
    }

    pub fn clear(&self) {
        self.contexts.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
