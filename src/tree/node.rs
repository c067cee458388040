//! Arena-backed positional tree.
//!
//! A [`Document`] owns every [`Node`] of one parsed text in a flat vector.
//! Parent and child links are [`NodeId`] indices into that vector, so the
//! tree has no reference cycles and an `Arc<Document>` can be read from any
//! number of threads once construction is finished.
//!
//! Navigation happens through [`NodeRef`], a cheap `Copy` handle pairing a
//! document with a node id.

use std::sync::Arc;

use super::{fold_block_scalar, remove_quotes};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Id of the root node of every document.
    pub const ROOT: Self = Self(0);

    /// Position of the node in document construction order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
    /// First byte of the node
    pub start: usize,
    /// One past the last byte of the node
    pub end: usize,
}

impl TextRange {
    /// Length of the range in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` falls inside the range (end exclusive).
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// One element of a parsed document.
///
/// Offsets are absolute byte offsets into the source. A node built by a
/// collaborator without position information carries `-1` offsets; such
/// nodes have no [`TextRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    start_offset: i64,
    end_offset: i64,
    key: Option<String>,
    text: Option<String>,
    /// Content of a `|` or `>` block scalar after folding and chomping.
    block_value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Create a detached node.
    pub fn new(
        start_offset: i64,
        end_offset: i64,
        key: Option<impl Into<String>>,
        text: Option<impl Into<String>>,
    ) -> Self {
        let text: Option<String> = text.map(Into::into);
        Self {
            start_offset,
            end_offset,
            key: key.map(Into::into),
            block_value: text.as_deref().and_then(fold_block_scalar),
            text,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Node for a `key:` entry whose value becomes its children.
    pub fn keyed(start: usize, end: usize, key: impl Into<String>) -> Self {
        Self::new(offset(start), offset(end), Some(key), None::<String>)
    }

    /// Node for a scalar value, `text` as written in the source.
    pub fn scalar(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self::new(offset(start), offset(end), None::<String>, Some(text))
    }

    /// Node without key or text, such as a sequence item holding a mapping.
    #[must_use]
    pub fn container(start: usize, end: usize) -> Self {
        Self::new(offset(start), offset(end), None::<String>, None::<String>)
    }

    /// Whether two nodes describe the same source element.
    ///
    /// Offsets, key and text form the structural identity; links are ignored.
    #[must_use]
    pub fn same_element(&self, other: &Self) -> bool {
        self.start_offset == other.start_offset
            && self.end_offset == other.end_offset
            && self.key == other.key
            && self.text == other.text
    }

    /// Raw start offset, `-1` when unknown.
    #[must_use]
    pub const fn start_offset(&self) -> i64 {
        self.start_offset
    }

    /// Raw end offset, `-1` when unknown.
    #[must_use]
    pub const fn end_offset(&self) -> i64 {
        self.end_offset
    }

    /// The mapping key, if this node is a `key:` entry.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The raw scalar, quotes retained.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The byte range, or `None` when the offsets are not a valid range.
    #[must_use]
    pub fn text_range(&self) -> Option<TextRange> {
        if self.start_offset > -1 && self.end_offset >= self.start_offset {
            Some(TextRange {
                start: usize::try_from(self.start_offset).ok()?,
                end: usize::try_from(self.end_offset).ok()?,
            })
        } else {
            None
        }
    }
}

fn offset(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A parsed document: the node arena plus the text it was built from.
///
/// The root node always exists at [`NodeId::ROOT`]. Nodes are appended with
/// [`Document::push_child`] during a single construction pass; afterwards the
/// document is read-only.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    source: Option<Arc<str>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Node::new(-1, -1, None::<String>, None::<String>))
    }
}

impl Document {
    /// Start a document from its root node.
    #[must_use]
    pub fn new(mut root: Node) -> Self {
        root.parent = None;
        root.children.clear();
        Self {
            nodes: vec![root],
            source: None,
        }
    }

    /// Start a document spanning `source`, keeping the text for range lookups.
    #[must_use]
    pub fn with_source(source: impl Into<Arc<str>>) -> Self {
        let source = source.into();
        let mut document = Self::new(Node::container(0, source.len()));
        document.source = Some(source);
        document
    }

    /// Attach `node` as the last child of `parent`.
    ///
    /// Returns the id now representing the element. When `parent` already has
    /// a structurally identical child, that child's id is returned and nothing
    /// is added. A node identical to `parent` itself is never attached; the
    /// parent's id is returned instead.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this document.
    pub fn push_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent_node = &self.nodes[parent.0];
        if parent_node.same_element(&node) {
            return parent;
        }
        if let Some(existing) =
            parent_node.children.iter().copied().find(|id| self.nodes[id.0].same_element(&node))
        {
            return existing;
        }

        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Handle to the root node.
    #[must_use]
    pub const fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: NodeId::ROOT,
        }
    }

    /// Handle to an arbitrary node, `None` if the id is foreign.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { doc: self, id })
    }

    /// Number of nodes including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A document always holds its root, so this only reports a bare root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// The text the document was built from, if it was kept.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The innermost node whose range contains `offset`.
    #[must_use]
    pub fn node_at(&self, offset: usize) -> Option<NodeRef<'_>> {
        let mut current = self.root();
        if !current.text_range().is_some_and(|r| r.contains(offset)) {
            return None;
        }
        'descend: loop {
            for child in current.children() {
                if child.text_range().is_some_and(|r| r.contains(offset)) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }
}

/// Borrowed handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("key", &self.key_or_id_or_name())
            .field("text", &self.text_no_quotes())
            .field("children", &self.data().children.len())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a Node {
        &self.doc.nodes[self.id.0]
    }

    fn at(&self, id: NodeId) -> Self {
        Self { doc: self.doc, id }
    }

    /// Arena id of this node.
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.id
    }

    /// The owning document.
    #[must_use]
    pub const fn document(&self) -> &'a Document {
        self.doc
    }

    /// The underlying node data.
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.data()
    }

    /// The mapping key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&'a str> {
        self.data().key()
    }

    /// The raw scalar text, quotes retained.
    #[must_use]
    pub fn text(&self) -> Option<&'a str> {
        self.data().text()
    }

    /// The scalar's value: surrounding quotes removed, block scalars folded.
    #[must_use]
    pub fn text_no_quotes(&self) -> Option<&'a str> {
        let node = self.data();
        node.block_value.as_deref().or_else(|| node.text().map(remove_quotes))
    }

    /// Byte range of this node, when valid.
    #[must_use]
    pub fn text_range(&self) -> Option<TextRange> {
        self.data().text_range()
    }

    /// The slice of the document source covered by this node.
    #[must_use]
    pub fn source_text(&self) -> Option<&'a str> {
        let range = self.text_range()?;
        self.doc.source()?.get(range.start..range.end)
    }

    /// The parent node, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| self.at(id))
    }

    /// Direct children in document order.
    pub fn children(self) -> impl ExactSizeIterator<Item = NodeRef<'a>> {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| NodeRef { doc, id })
    }

    /// Position of this node among its parent's children.
    #[must_use]
    pub fn child_index(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent.data().children.iter().position(|&id| id == self.id)
    }

    /// The root of the document.
    #[must_use]
    pub fn root(&self) -> Self {
        self.doc.root()
    }

    /// First direct child whose key equals `key`, ignoring ASCII case.
    #[must_use]
    pub fn child(&self, key: &str) -> Option<Self> {
        self.children().find(|child| child.key().is_some_and(|k| k.eq_ignore_ascii_case(key)))
    }

    /// First direct child whose `id` field equals `id`, ignoring ASCII case.
    #[must_use]
    pub fn child_id(&self, id: &str) -> Option<Self> {
        self.children().find(|child| child.id().is_some_and(|v| v.eq_ignore_ascii_case(id)))
    }

    /// First direct child matching `predicate`.
    pub fn child_where(&self, mut predicate: impl FnMut(&NodeRef<'a>) -> bool) -> Option<Self> {
        self.children().find(|child| predicate(child))
    }

    /// Text of the first child.
    #[must_use]
    pub fn child_text(&self) -> Option<&'a str> {
        self.children().next().and_then(|child| child.text())
    }

    /// Text of the first child without quotes.
    #[must_use]
    pub fn child_text_no_quotes(&self) -> Option<&'a str> {
        self.children().next().and_then(|child| child.text_no_quotes())
    }

    /// Own text, falling back to the first child's text.
    #[must_use]
    pub fn text_or_child_text(&self) -> Option<&'a str> {
        self.text().or_else(|| self.child_text())
    }

    /// Own text, falling back to the first child's text, without quotes.
    #[must_use]
    pub fn text_or_child_text_no_quotes(&self) -> Option<&'a str> {
        self.text_no_quotes().or_else(|| self.child_text_no_quotes())
    }

    /// Pre-order iterator over this node and all of its descendants.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            doc: self.doc,
            stack: vec![self.id],
        }
    }

    /// Every node of the subtree, this node included, in document order.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<Self> {
        self.descendants().collect()
    }

    /// Every node of the subtree (this node included) matching `predicate`,
    /// in pre-order.
    pub fn find_child_nodes(&self, mut predicate: impl FnMut(&NodeRef<'a>) -> bool) -> Vec<Self> {
        self.descendants().filter(|node| predicate(node)).collect()
    }

    /// Nearest strict ancestor matching `predicate`.
    pub fn find_parent(&self, mut predicate: impl FnMut(&NodeRef<'a>) -> bool) -> Option<Self> {
        let mut current = self.parent();
        while let Some(node) = current {
            if predicate(&node) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// Nearest strict ancestor whose key equals `key`, ignoring ASCII case.
    #[must_use]
    pub fn find_parent_key(&self, key: &str) -> Option<Self> {
        self.find_parent(|node| node.key().is_some_and(|k| k.eq_ignore_ascii_case(key)))
    }

    /// Value of a scalar child entry such as `name: build`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&'a str> {
        self.child(key).and_then(|child| child.child_text_no_quotes())
    }

    /// The `id:` field.
    #[must_use]
    pub fn id(&self) -> Option<&'a str> {
        self.field("id")
    }

    /// The `name:` field.
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.field("name")
    }

    /// The `type:` field.
    #[must_use]
    pub fn type_name(&self) -> Option<&'a str> {
        self.field("type")
    }

    /// The `default:` field.
    #[must_use]
    pub fn default_value(&self) -> Option<&'a str> {
        self.field("default")
    }

    /// The `description:` field, or the shorthand `desc:`.
    ///
    /// Block scalar descriptions come back folded, without trailing newlines.
    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.child("description")
            .or_else(|| self.child("desc"))
            .and_then(|c| c.child_text_no_quotes())
            .map(str::trim_end)
    }

    /// The `required:` field parsed as a boolean, `false` when absent.
    #[must_use]
    pub fn required(&self) -> bool {
        self.field("required").is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// The key, else the `id:` field, else the `name:` field.
    #[must_use]
    pub fn key_or_id_or_name(&self) -> Option<&'a str> {
        self.key().or_else(|| self.id()).or_else(|| self.name())
    }

    /// Slash separated identifiers from below the root down to this node.
    ///
    /// The root is the document itself and contributes no segment, so a
    /// workflow's top-level `name:` never prefixes the path. Anonymous nodes
    /// (no key, id or name) contribute none either.
    #[must_use]
    pub fn path(&self) -> String {
        let mut segments: Vec<&str> = Vec::new();
        let mut current = *self;
        while let Some(parent) = current.parent() {
            if let Some(segment) = current.key_or_id_or_name() {
                segments.push(segment);
            }
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }
}

/// Pre-order traversal produced by [`NodeRef::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(self.doc.nodes[id.0].children.iter().rev());
        Some(NodeRef { doc: self.doc, id })
    }
}
