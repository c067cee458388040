//! YAML text to [`Document`] conversion.
//!
//! tree-sitter-yaml supplies the concrete syntax tree with exact byte
//! positions; this module folds it into the workflow tree shape:
//!
//! - a mapping pair becomes a node keyed by the (unquoted) key, spanning the
//!   whole pair, with the value's content as children
//! - a scalar becomes a text node holding the raw source slice, quotes kept;
//!   block scalars (`|`, `>`) also carry their folded value
//! - a sequence element holding a scalar becomes that scalar's text node;
//!   any other element becomes an anonymous node spanning the item
//! - mapping and sequence containers are flattened into their owner
//!
//! Comments, anchors and tags are dropped. Every document of a multi-document
//! stream contributes to the same root.
//!
//! Offsets are byte offsets into the input.

use std::sync::Arc;

use tracing::debug;

use crate::core::WorkflowError;

use super::{Document, Node, NodeId, remove_quotes};

/// Parse YAML text into a [`Document`].
///
/// `name` only appears in error messages.
///
/// # Errors
///
/// Returns [`WorkflowError::ContentParse`] when the grammar cannot be loaded
/// or the text contains syntax errors.
pub fn parse_document(name: &str, text: &str) -> Result<Document, WorkflowError> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&tree_sitter_yaml::LANGUAGE.into()).map_err(|e| {
        WorkflowError::ContentParse {
            source_name: name.to_string(),
            reason: format!("YAML grammar unavailable: {e}"),
        }
    })?;

    let tree = parser.parse(text, None).ok_or_else(|| WorkflowError::ContentParse {
        source_name: name.to_string(),
        reason: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let position = first_error(root)
            .map(|node| {
                let point = node.start_position();
                format!(" at line {}, column {}", point.row + 1, point.column + 1)
            })
            .unwrap_or_default();
        return Err(WorkflowError::ContentParse {
            source_name: name.to_string(),
            reason: format!("syntax error{position}"),
        });
    }

    let mut builder = Builder {
        source: text,
        document: Document::with_source(Arc::<str>::from(text)),
    };
    builder.value(root, NodeId::ROOT);

    debug!("Parsed {} into {} nodes", name, builder.document.len());
    Ok(builder.document)
}

/// Parse YAML text and require the first document to be a mapping.
///
/// Fetched action manifests and workflow files are always mappings; anything
/// else (an HTML error page served with status 200, a bare scalar) is
/// rejected here. The structure is checked with `serde_yaml` before the
/// positional tree is built.
///
/// # Errors
///
/// Returns [`WorkflowError::ContentParse`] if the text is not valid YAML, is
/// empty, or its first document is not a mapping.
pub fn parse_mapping_document(name: &str, text: &str) -> Result<Document, WorkflowError> {
    use serde::Deserialize;

    let first = serde_yaml::Deserializer::from_str(text).next().ok_or_else(|| {
        WorkflowError::ContentParse {
            source_name: name.to_string(),
            reason: "no YAML document".to_string(),
        }
    })?;
    let value = serde_yaml::Value::deserialize(first).map_err(|e| WorkflowError::ContentParse {
        source_name: name.to_string(),
        reason: e.to_string(),
    })?;
    if !value.is_mapping() {
        return Err(WorkflowError::ContentParse {
            source_name: name.to_string(),
            reason: "top-level value is not a mapping".to_string(),
        });
    }

    parse_document(name, text)
}

fn first_error(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().filter(|c| c.has_error()).find_map(first_error)
}

fn is_scalar(kind: &str) -> bool {
    matches!(
        kind,
        "plain_scalar" | "single_quote_scalar" | "double_quote_scalar" | "block_scalar" | "alias"
    )
}

struct Builder<'s> {
    source: &'s str,
    document: Document,
}

impl Builder<'_> {
    fn slice(&self, node: tree_sitter::Node<'_>) -> &str {
        self.source.get(node.start_byte()..node.end_byte()).unwrap_or_default()
    }

    fn named_children<'t>(node: tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }

    /// The scalar directly wrapped by a value node, if that is all it holds.
    fn unwrap_scalar<'t>(node: tree_sitter::Node<'t>) -> Option<tree_sitter::Node<'t>> {
        if is_scalar(node.kind()) {
            return Some(node);
        }
        if matches!(node.kind(), "flow_node" | "block_node") {
            return Self::named_children(node)
                .into_iter()
                .filter(|c| !matches!(c.kind(), "anchor" | "tag" | "comment"))
                .find(|c| is_scalar(c.kind()));
        }
        None
    }

    /// Fold the content of `node` into children of `parent`.
    fn value(&mut self, node: tree_sitter::Node<'_>, parent: NodeId) {
        match node.kind() {
            "block_mapping_pair" | "flow_pair" => self.pair(node, parent),
            "block_sequence_item" => self.item(node, parent),
            kind if is_scalar(kind) => {
                let text = self.slice(node).to_string();
                self.document.push_child(
                    parent,
                    Node::scalar(node.start_byte(), node.end_byte(), text),
                );
            }
            "flow_sequence" => {
                for element in Self::named_children(node) {
                    if element.kind() == "comment" {
                        continue;
                    }
                    self.sequence_element(element, element, parent);
                }
            }
            "anchor" | "tag" | "comment" => {}
            _ => {
                for child in Self::named_children(node) {
                    self.value(child, parent);
                }
            }
        }
    }

    fn pair(&mut self, node: tree_sitter::Node<'_>, parent: NodeId) {
        let key = node
            .child_by_field_name("key")
            .map(|key| remove_quotes(self.slice(key)).to_string());
        let value = node.child_by_field_name("value");

        let Some(key) = key else {
            // `? ` complex keys and valueless flow entries: keep the content only
            if let Some(value) = value {
                self.value(value, parent);
            }
            return;
        };

        let id = self
            .document
            .push_child(parent, Node::keyed(node.start_byte(), node.end_byte(), key));
        if let Some(value) = value {
            self.value(value, id);
        }
    }

    fn item(&mut self, node: tree_sitter::Node<'_>, parent: NodeId) {
        match Self::named_children(node).into_iter().find(|c| c.kind() != "comment") {
            Some(content) => self.sequence_element(node, content, parent),
            None => {
                self.document.push_child(parent, Node::container(node.start_byte(), node.end_byte()));
            }
        }
    }

    fn sequence_element(
        &mut self,
        item: tree_sitter::Node<'_>,
        content: tree_sitter::Node<'_>,
        parent: NodeId,
    ) {
        if let Some(scalar) = Self::unwrap_scalar(content) {
            self.value(scalar, parent);
            return;
        }
        let id = self
            .document
            .push_child(parent, Node::container(item.start_byte(), item.end_byte()));
        self.value(content, id);
    }
}
