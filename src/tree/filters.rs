//! Workflow-aware navigation on top of [`NodeRef`].
//!
//! In a workflow document each concept sits exactly one level below its
//! named container: a job is a direct child of `jobs`, a step a direct child
//! of `steps`. These helpers are thin wrappers over
//! [`NodeRef::find_parent`] and [`NodeRef::find_child_nodes`] that test a
//! node's own key or its parent's key.

use std::collections::BTreeSet;

use crate::constants::{FIELD_JOBS, FIELD_NEEDS, FIELD_ON, FIELD_OUTPUTS, FIELD_STEPS, FIELD_USES, FIELD_WITH};

use super::NodeRef;

fn parent_key_is(node: &NodeRef<'_>, key: &str) -> bool {
    node.parent().and_then(|p| p.key()) == Some(key)
}

impl<'a> NodeRef<'a> {
    /// The enclosing job entry (a direct child of `jobs`).
    #[must_use]
    pub fn find_parent_job(&self) -> Option<Self> {
        self.find_parent(|node| parent_key_is(node, FIELD_JOBS))
    }

    /// The enclosing step (a direct child of `steps`).
    #[must_use]
    pub fn find_parent_step(&self) -> Option<Self> {
        self.find_parent(|node| parent_key_is(node, FIELD_STEPS))
    }

    /// The enclosing `outputs:` block.
    #[must_use]
    pub fn find_parent_outputs(&self) -> Option<Self> {
        self.find_parent(|node| node.key() == Some(FIELD_OUTPUTS))
    }

    /// The enclosing `with:` block.
    #[must_use]
    pub fn find_parent_with(&self) -> Option<Self> {
        self.find_parent(|node| node.key() == Some(FIELD_WITH))
    }

    /// The enclosing `on:` trigger block.
    #[must_use]
    pub fn find_parent_on(&self) -> Option<Self> {
        self.find_parent(|node| node.key() == Some(FIELD_ON))
    }

    /// All steps below this node, in document order.
    #[must_use]
    pub fn list_steps(&self) -> Vec<Self> {
        self.find_child_nodes(|node| parent_key_is(node, FIELD_STEPS))
    }

    /// All jobs below this node, in document order.
    #[must_use]
    pub fn list_jobs(&self) -> Vec<Self> {
        self.find_child_nodes(|node| parent_key_is(node, FIELD_JOBS))
    }

    /// The `uses:` field of a step or job.
    #[must_use]
    pub fn uses(&self) -> Option<&'a str> {
        self.field(FIELD_USES)
    }

    /// The `uses:` field, else the `name:` field.
    #[must_use]
    pub fn uses_or_name(&self) -> Option<&'a str> {
        self.uses().or_else(|| self.name())
    }

    /// Job ids referenced by a `needs:` node.
    ///
    /// Handles `needs: build` and `needs: [build, test]` alike: the node's own
    /// text (or first child's text) is one candidate and every child's text is
    /// another. Returns an empty set for any other node.
    #[must_use]
    pub fn dependency_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        if self.key() != Some(FIELD_NEEDS) {
            return ids;
        }

        if let Some(own) = self.text_or_child_text_no_quotes() {
            ids.insert(own.to_string());
        }
        for child in self.children() {
            if let Some(text) = child.text_or_child_text_no_quotes() {
                ids.insert(text.to_string());
            }
        }
        ids.retain(|id| !id.is_empty());
        ids
    }
}
