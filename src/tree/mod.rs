//! Arena-based XML document tree.
//!
//! This module implements the core tree representation using arena
//! allocation with typed indices. All nodes live in a contiguous
//! `Vec<NodeData>` owned by the `Document`, and are referenced by `NodeId`
//! — a newtype over `NonZeroU32`.
//!
//! This design provides O(1) node access, cache-friendly layout, and safe
//! bulk deallocation (drop the `Document` and everything is freed). The
//! back-references (`parent`, `prev_sibling`) are plain indices, so there
//! are no ownership cycles to manage.
//!
//! # Ownership
//!
//! The document exclusively owns every node. Inserting an existing subtree
//! under a new parent always **deep-clones** it ([`Document::insert_end_child`]
//! and friends); a node is never shared between two parents. Removing a
//! child unlinks its whole subtree, which becomes unreachable and is freed
//! with the document.

mod node;

pub use node::NodeKind;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::rc::Rc;

use crate::error::{ErrorKind, ParseError, SourceLocation};
use crate::parser::{self, ParseOptions};

/// A typed index into the document's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
///
/// Each node stores its kind (element, text, comment, ...), links to
/// parent, children, and siblings for tree navigation, and the source
/// location it was parsed from. Access individual nodes via
/// [`Document::node`].
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node, if any. The document root node has no parent.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
    /// Where in the source this node started. Frozen at parse time;
    /// mutation never updates it. `(0, 0)` for programmatically created
    /// nodes.
    pub location: SourceLocation,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            location: SourceLocation::default(),
        }
    }
}

/// An XML attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The attribute value (entity references resolved).
    pub value: String,
    /// Where in the source the attribute name started. `(0, 0)` for
    /// attributes set programmatically.
    pub location: SourceLocation,
}

impl Attribute {
    /// Creates an attribute with no source location.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            location: SourceLocation::default(),
        }
    }
}

/// The failure modes of the typed attribute queries.
///
/// These are local results, never stamped onto the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    /// The element has no attribute with the requested name.
    NoAttribute,
    /// The attribute exists but its value does not parse as the requested
    /// type.
    WrongType,
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAttribute => f.write_str("no such attribute"),
            Self::WrongType => f.write_str("attribute value has the wrong type"),
        }
    }
}

impl std::error::Error for AttributeError {}

/// An XML document.
///
/// The `Document` owns all nodes in an arena and provides methods for tree
/// navigation and mutation. All tree operations go through `&Document`
/// (navigation) or `&mut Document` (mutation).
///
/// # Examples
///
/// ```
/// use xmlite::Document;
///
/// let doc = Document::parse_str("<root><child/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_value(root), "root");
/// ```
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The document root node id (kind `Document`).
    root: NodeId,
    /// The document name — the file path when loaded from disk.
    name: String,
    /// The sticky error state. First error wins; cleared only by
    /// [`clear_error`](Document::clear_error).
    error: Option<ParseError>,
    /// Whether to emit the UTF-8 BOM when saving. Set automatically when
    /// the input carried one.
    write_bom: bool,
    /// The whitespace policy the document was parsed with.
    condense_whitespace: bool,
    /// The tab size used for column accounting while parsing.
    tab_size: u32,
    /// Opaque per-node user data. Cloning a node copies the handle.
    user_data: HashMap<NodeId, Rc<dyn Any>>,
}

impl Document {
    /// Creates a new empty document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32).
        nodes.push(NodeData::new(NodeKind::Document));
        // Index 1: the document root node.
        nodes.push(NodeData::new(NodeKind::Document));
        let root = NodeId::from_index(1);
        Self {
            nodes,
            root,
            name: String::new(),
            error: None,
            write_bom: false,
            condense_whitespace: true,
            tab_size: parser::DEFAULT_TAB_SIZE,
            user_data: HashMap::new(),
        }
    }

    /// Creates a new empty document with the given name.
    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.name = name.into();
        doc
    }

    // --- Parsing entry points ---

    /// Parses an XML string into a `Document` with default options.
    ///
    /// Line endings are normalized (`CR LF` and bare `CR` become `LF`) and
    /// a leading BOM character is honored before parsing.
    ///
    /// # Errors
    ///
    /// Returns the first `ParseError` when the input is malformed. To keep
    /// the partially built tree on error, use
    /// [`parser::parse_document`](crate::parser::parse_document) instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlite::Document;
    ///
    /// let doc = Document::parse_str("<root><child/></root>").unwrap();
    /// ```
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        Self::parse_str_with_options(input, &ParseOptions::default())
    }

    /// Parses an XML string with the given options.
    pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        finish(parser::parse_document(input, options))
    }

    /// Parses XML from raw bytes with default options.
    ///
    /// A UTF-8 BOM selects UTF-8 and sets the [`write_bom`](Document::write_bom)
    /// flag; otherwise the options' encoding is honored, with `Unknown`
    /// defaulting to UTF-8 and falling back to the legacy single-byte
    /// decode for input that is not valid UTF-8.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        Self::parse_bytes_with_options(input, &ParseOptions::default())
    }

    /// Parses XML from raw bytes with the given options.
    pub fn parse_bytes_with_options(
        input: &[u8],
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        finish(parser::parse_document_bytes(input, options))
    }

    /// Loads and parses an XML file.
    ///
    /// The document name is set to the path. The file is read as raw bytes
    /// and run through the [`parse_bytes`](Document::parse_bytes) pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OpeningFile`] when the file cannot be read
    /// (with no document at all), or the first parse error for malformed
    /// content.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        Self::load_file_with_options(path, &ParseOptions::default())
    }

    /// Loads and parses an XML file with the given options.
    pub fn load_file_with_options(
        path: impl AsRef<Path>,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|_| ParseError::new(ErrorKind::OpeningFile, SourceLocation::default()))?;
        let mut doc = parser::parse_document_bytes(&bytes, options);
        doc.name = path.display().to_string();
        finish(doc)
    }

    /// Serializes the document to a file.
    ///
    /// Writes the UTF-8 BOM first when [`write_bom`](Document::write_bom)
    /// is set, then the pretty-printed tree.
    pub fn save_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        crate::serial::write_document(self, &mut file)
    }

    // --- Document state ---

    /// Returns the document name (the file path when loaded from disk).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the document name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns whether the serializer will emit a UTF-8 BOM.
    #[must_use]
    pub fn write_bom(&self) -> bool {
        self.write_bom
    }

    /// Sets whether the serializer emits a UTF-8 BOM.
    pub fn set_write_bom(&mut self, write_bom: bool) {
        self.write_bom = write_bom;
    }

    /// Returns the whitespace policy this document was parsed with.
    #[must_use]
    pub fn condense_whitespace(&self) -> bool {
        self.condense_whitespace
    }

    /// Returns the tab size used for column accounting while parsing.
    #[must_use]
    pub fn tab_size(&self) -> u32 {
        self.tab_size
    }

    pub(crate) fn record_options(&mut self, options: &ParseOptions) {
        self.condense_whitespace = options.condense_whitespace;
        self.tab_size = options.tab_size;
    }

    pub(crate) fn set_write_bom_flag(&mut self, write_bom: bool) {
        self.write_bom = write_bom;
    }

    // --- Error state ---

    /// Returns the sticky error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Returns `true` when an error is stamped on the document.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the stable numeric error code, or 0 when the document is
    /// clean.
    #[must_use]
    pub fn error_code(&self) -> u8 {
        self.error.map_or(0, |e| e.code())
    }

    /// Returns the fixed error description, or `"No error"`.
    #[must_use]
    pub fn error_description(&self) -> &'static str {
        self.error.map_or("No error", |e| e.kind.description())
    }

    /// Returns the location of the error, or `(0, 0)`.
    #[must_use]
    pub fn error_location(&self) -> SourceLocation {
        self.error.map_or_else(SourceLocation::default, |e| e.location)
    }

    /// Clears the sticky error state. Parsing never clears it implicitly.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Stamps an error onto the document. The first error wins; later
    /// calls are ignored until [`clear_error`](Document::clear_error).
    pub(crate) fn set_error(&mut self, error: ParseError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    // --- Node access ---

    /// Returns the document root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the first top-level element of the document.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.first_child_element(self.root)
    }

    /// Returns a reference to the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a valid node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the value of a node: the tag name for elements, the content
    /// for text/comment/unknown nodes, the document name for the root, and
    /// `""` for declarations.
    #[must_use]
    pub fn node_value(&self, id: NodeId) -> &str {
        match &self.node(id).kind {
            NodeKind::Document => &self.name,
            NodeKind::Element { name, .. } => name,
            NodeKind::Text { content, .. }
            | NodeKind::Comment { content }
            | NodeKind::Unknown { content } => content,
            NodeKind::Declaration { .. } => "",
        }
    }

    /// Sets the value of a node (tag name, content, or document name,
    /// depending on kind). No-op for declarations.
    pub fn set_node_value(&mut self, id: NodeId, value: impl Into<String>) {
        let value = value.into();
        if matches!(self.node(id).kind, NodeKind::Document) {
            self.name = value;
            return;
        }
        match &mut self.node_mut(id).kind {
            NodeKind::Element { name, .. } => *name = value,
            NodeKind::Text { content, .. }
            | NodeKind::Comment { content }
            | NodeKind::Unknown { content } => *content = value,
            NodeKind::Declaration { .. } | NodeKind::Document => {}
        }
    }

    /// Returns the source location the node was parsed from.
    #[must_use]
    pub fn location(&self, id: NodeId) -> SourceLocation {
        self.node(id).location
    }

    pub(crate) fn set_location(&mut self, id: NodeId, location: SourceLocation) {
        self.node_mut(id).location = location;
    }

    /// Returns the total number of nodes in the arena, reachable or not
    /// (excluding the placeholder slot).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    // --- User data ---

    /// Attaches opaque user data to a node. Cloning the node copies the
    /// handle, not the data.
    pub fn set_user_data(&mut self, id: NodeId, data: Rc<dyn Any>) {
        self.user_data.insert(id, data);
    }

    /// Returns the user data attached to a node, if any.
    #[must_use]
    pub fn user_data(&self, id: NodeId) -> Option<&Rc<dyn Any>> {
        self.user_data.get(&id)
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns the first child whose value equals `value`.
    #[must_use]
    pub fn first_child_named(&self, parent: NodeId, value: &str) -> Option<NodeId> {
        self.children(parent).find(|&id| self.node_value(id) == value)
    }

    /// Returns the last child whose value equals `value`, searching
    /// backwards from the last child.
    #[must_use]
    pub fn last_child_named(&self, parent: NodeId, value: &str) -> Option<NodeId> {
        let mut current = self.last_child(parent);
        while let Some(id) = current {
            if self.node_value(id) == value {
                return Some(id);
            }
            current = self.prev_sibling(id);
        }
        None
    }

    /// Returns the next sibling whose value equals `value`.
    #[must_use]
    pub fn next_sibling_named(&self, id: NodeId, value: &str) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sib) = current {
            if self.node_value(sib) == value {
                return Some(sib);
            }
            current = self.next_sibling(sib);
        }
        None
    }

    /// Returns the previous sibling whose value equals `value`.
    #[must_use]
    pub fn prev_sibling_named(&self, id: NodeId, value: &str) -> Option<NodeId> {
        let mut current = self.prev_sibling(id);
        while let Some(sib) = current {
            if self.node_value(sib) == value {
                return Some(sib);
            }
            current = self.prev_sibling(sib);
        }
        None
    }

    /// Returns the first child that is an element.
    #[must_use]
    pub fn first_child_element(&self, parent: NodeId) -> Option<NodeId> {
        self.children(parent).find(|&id| self.node(id).kind.is_element())
    }

    /// Returns the first child element with the given tag name.
    #[must_use]
    pub fn first_child_element_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|&id| self.node(id).kind.is_element() && self.node_value(id) == name)
    }

    /// Returns the next sibling that is an element.
    #[must_use]
    pub fn next_sibling_element(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sib) = current {
            if self.node(sib).kind.is_element() {
                return Some(sib);
            }
            current = self.next_sibling(sib);
        }
        None
    }

    /// Returns the next sibling element with the given tag name.
    #[must_use]
    pub fn next_sibling_element_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(sib) = current {
            if self.node(sib).kind.is_element() && self.node_value(sib) == name {
                return Some(sib);
            }
            current = self.next_sibling(sib);
        }
        None
    }

    /// Steps through the children of `parent`: returns the first child when
    /// `previous` is `None`, otherwise the child after `previous`.
    ///
    /// ```
    /// use xmlite::Document;
    ///
    /// let doc = Document::parse_str("<r><a/><b/></r>").unwrap();
    /// let r = doc.root_element().unwrap();
    /// let mut child = None;
    /// let mut names = Vec::new();
    /// while let Some(next) = doc.iterate_children(r, child) {
    ///     names.push(doc.node_value(next).to_string());
    ///     child = Some(next);
    /// }
    /// assert_eq!(names, ["a", "b"]);
    /// ```
    #[must_use]
    pub fn iterate_children(&self, parent: NodeId, previous: Option<NodeId>) -> Option<NodeId> {
        match previous {
            None => self.first_child(parent),
            Some(prev) => {
                debug_assert_eq!(self.parent(prev), Some(parent));
                self.next_sibling(prev)
            }
        }
    }

    /// Like [`iterate_children`](Document::iterate_children), filtered by
    /// node value.
    #[must_use]
    pub fn iterate_children_named(
        &self,
        parent: NodeId,
        value: &str,
        previous: Option<NodeId>,
    ) -> Option<NodeId> {
        match previous {
            None => self.first_child_named(parent, value),
            Some(prev) => {
                debug_assert_eq!(self.parent(prev), Some(parent));
                self.next_sibling_named(prev, value)
            }
        }
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first,
    /// the node itself first).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: Some(id),
        }
    }

    /// Returns the root node when this node is attached to the document
    /// tree, or `None` for nodes in detached subtrees.
    #[must_use]
    pub fn owning_document(&self, id: NodeId) -> Option<NodeId> {
        let mut top = id;
        while let Some(parent) = self.parent(top) {
            top = parent;
        }
        (top == self.root).then_some(self.root)
    }

    /// Returns the concatenated text of the node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        if let NodeKind::Text { content, .. } = &self.node(id).kind {
            buf.push_str(content);
        } else {
            for child in self.children(id) {
                self.collect_text(child, buf);
            }
        }
    }

    /// Returns the text of an element's first child, when that child is a
    /// text node. The convenient accessor for `<tag>value</tag>` shapes.
    #[must_use]
    pub fn element_text(&self, id: NodeId) -> Option<&str> {
        let first = self.first_child(id)?;
        match &self.node(first).kind {
            NodeKind::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    // --- Mutation ---

    /// Allocates a new unattached node in the arena and returns its id.
    ///
    /// Attach it with [`append_child`](Document::append_child) or one of
    /// the insert operations.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Links an unattached node to the end of a parent's child list,
    /// transferring ownership to the parent.
    ///
    /// Returns `None` — leaving the tree unchanged — when `child` already
    /// has a parent, or when `child` is a document node (which additionally
    /// stamps [`ErrorKind::DocumentTopOnly`] on the document).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        if !self.insertable(child) {
            return None;
        }

        self.node_mut(child).parent = Some(parent);
        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
        Some(child)
    }

    /// Deep-clones `source` and appends the clone to `parent`'s children.
    ///
    /// Returns the clone's id, or `None` when `source` is a document node
    /// (stamping [`ErrorKind::DocumentTopOnly`]).
    pub fn insert_end_child(&mut self, parent: NodeId, source: NodeId) -> Option<NodeId> {
        if !self.cloneable(source) {
            return None;
        }
        let copy = self.clone_subtree(source);
        self.append_child(parent, copy)
    }

    /// Deep-clones `source` and inserts the clone before `reference` in
    /// `parent`'s child list.
    ///
    /// Returns `None` when `reference` is not a child of `parent` or when
    /// `source` is a document node.
    pub fn insert_before_child(
        &mut self,
        parent: NodeId,
        reference: NodeId,
        source: NodeId,
    ) -> Option<NodeId> {
        if self.parent(reference) != Some(parent) || !self.cloneable(source) {
            return None;
        }
        let copy = self.clone_subtree(source);

        self.node_mut(copy).parent = Some(parent);
        let prev = self.node(reference).prev_sibling;
        match prev {
            Some(p) => self.node_mut(p).next_sibling = Some(copy),
            None => self.node_mut(parent).first_child = Some(copy),
        }
        self.node_mut(copy).prev_sibling = prev;
        self.node_mut(copy).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(copy);
        Some(copy)
    }

    /// Deep-clones `source` and inserts the clone after `reference` in
    /// `parent`'s child list.
    ///
    /// Returns `None` when `reference` is not a child of `parent` or when
    /// `source` is a document node.
    pub fn insert_after_child(
        &mut self,
        parent: NodeId,
        reference: NodeId,
        source: NodeId,
    ) -> Option<NodeId> {
        if self.parent(reference) != Some(parent) || !self.cloneable(source) {
            return None;
        }
        let copy = self.clone_subtree(source);

        self.node_mut(copy).parent = Some(parent);
        let next = self.node(reference).next_sibling;
        match next {
            Some(n) => self.node_mut(n).prev_sibling = Some(copy),
            None => self.node_mut(parent).last_child = Some(copy),
        }
        self.node_mut(copy).next_sibling = next;
        self.node_mut(copy).prev_sibling = Some(reference);
        self.node_mut(reference).next_sibling = Some(copy);
        Some(copy)
    }

    /// Deep-clones `source` and replaces `reference` with the clone. The
    /// replaced subtree is destroyed.
    ///
    /// Returns `None` when `reference` is not a child of `parent` or when
    /// `source` is a document node.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        reference: NodeId,
        source: NodeId,
    ) -> Option<NodeId> {
        if self.parent(reference) != Some(parent) || !self.cloneable(source) {
            return None;
        }
        let copy = self.clone_subtree(source);

        let prev = self.node(reference).prev_sibling;
        let next = self.node(reference).next_sibling;
        self.node_mut(copy).parent = Some(parent);
        self.node_mut(copy).prev_sibling = prev;
        self.node_mut(copy).next_sibling = next;
        match prev {
            Some(p) => self.node_mut(p).next_sibling = Some(copy),
            None => self.node_mut(parent).first_child = Some(copy),
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = Some(copy),
            None => self.node_mut(parent).last_child = Some(copy),
        }

        let reference_data = self.node_mut(reference);
        reference_data.parent = None;
        reference_data.prev_sibling = None;
        reference_data.next_sibling = None;
        Some(copy)
    }

    /// Removes (and destroys) a child subtree.
    ///
    /// Returns `false` — leaving the tree unchanged — when `child` is not a
    /// child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// Detaches a node from its parent. The subtree becomes unreachable.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let data = self.node_mut(id);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
    }

    /// Deep-clones a subtree within the arena and returns the unattached
    /// clone's root. Locations and user-data handles are copied.
    pub fn clone_subtree(&mut self, source: NodeId) -> NodeId {
        let kind = self.node(source).kind.clone();
        let location = self.node(source).location;
        let copy = self.create_node(kind);
        self.node_mut(copy).location = location;
        if let Some(data) = self.user_data.get(&source).cloned() {
            self.user_data.insert(copy, data);
        }

        let children: Vec<NodeId> = self.children(source).collect();
        for child in children {
            let child_copy = self.clone_subtree(child);
            // The clone is freshly created and never a document node, so
            // this cannot fail.
            self.append_child(copy, child_copy);
        }
        copy
    }

    fn insertable(&mut self, child: NodeId) -> bool {
        if matches!(self.node(child).kind, NodeKind::Document) {
            self.set_error(ParseError::new(
                ErrorKind::DocumentTopOnly,
                SourceLocation::default(),
            ));
            return false;
        }
        self.node(child).parent.is_none()
    }

    fn cloneable(&mut self, source: NodeId) -> bool {
        if matches!(self.node(source).kind, NodeKind::Document) {
            self.set_error(ParseError::new(
                ErrorKind::DocumentTopOnly,
                SourceLocation::default(),
            ));
            return false;
        }
        true
    }

    // --- Attributes ---

    /// Returns the attributes of an element node, in insertion order.
    /// Empty for non-element nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute, overwriting the value if the name exists
    /// (insertion order and original location are kept), appending
    /// otherwise. No-op on non-element nodes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return;
        };
        let value = value.into();
        if let Some(attr) = attributes.iter_mut().find(|a| a.name == name) {
            attr.value = value;
        } else {
            attributes.push(Attribute::new(name, value));
        }
    }

    /// Parser-side upsert: duplicate attribute names on one element
    /// overwrite the value (the first occurrence keeps its location).
    pub(crate) fn insert_attribute(&mut self, id: NodeId, attr: Attribute) {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return;
        };
        if let Some(existing) = attributes.iter_mut().find(|a| a.name == attr.name) {
            existing.value = attr.value;
        } else {
            attributes.push(attr);
        }
    }

    /// Sets an attribute from an integer value.
    pub fn set_int_attribute(&mut self, id: NodeId, name: &str, value: i32) {
        self.set_attribute(id, name, value.to_string());
    }

    /// Sets an attribute from a floating point value.
    pub fn set_double_attribute(&mut self, id: NodeId, name: &str, value: f64) {
        self.set_attribute(id, name, value.to_string());
    }

    /// Removes an attribute by name. Returns `true` when it existed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return false;
        };
        let before = attributes.len();
        attributes.retain(|a| a.name != name);
        attributes.len() != before
    }

    /// Reads an attribute as an `i32`.
    ///
    /// Parsing is scanf-style: leading whitespace is skipped and the
    /// longest `[+-]?digits` prefix is taken; trailing garbage is ignored.
    ///
    /// # Errors
    ///
    /// [`AttributeError::NoAttribute`] when the attribute is missing,
    /// [`AttributeError::WrongType`] when no integer prefix parses.
    pub fn query_int_attribute(&self, id: NodeId, name: &str) -> Result<i32, AttributeError> {
        let value = self.attribute(id, name).ok_or(AttributeError::NoAttribute)?;
        scan_int(value).ok_or(AttributeError::WrongType)
    }

    /// Reads an attribute as a `u32`.
    ///
    /// The value is parsed as a signed integer and cast, so `"-1"` yields
    /// `u32::MAX` rather than an error.
    #[allow(clippy::cast_sign_loss)]
    pub fn query_unsigned_attribute(&self, id: NodeId, name: &str) -> Result<u32, AttributeError> {
        self.query_int_attribute(id, name).map(|v| v as u32)
    }

    /// Reads an attribute as a `bool`.
    ///
    /// Accepts `true`/`yes`/`1` and `false`/`no`/`0`, case-insensitively.
    pub fn query_bool_attribute(&self, id: NodeId, name: &str) -> Result<bool, AttributeError> {
        let value = self.attribute(id, name).ok_or(AttributeError::NoAttribute)?;
        if ["true", "yes", "1"].iter().any(|t| value.eq_ignore_ascii_case(t)) {
            Ok(true)
        } else if ["false", "no", "0"].iter().any(|f| value.eq_ignore_ascii_case(f)) {
            Ok(false)
        } else {
            Err(AttributeError::WrongType)
        }
    }

    /// Reads an attribute as an `f64`, scanf-style (longest valid numeric
    /// prefix, trailing garbage ignored).
    pub fn query_double_attribute(&self, id: NodeId, name: &str) -> Result<f64, AttributeError> {
        let value = self.attribute(id, name).ok_or(AttributeError::NoAttribute)?;
        scan_double(value).ok_or(AttributeError::WrongType)
    }

    /// Walks the tree with a visitor. See [`crate::serial::Visitor`].
    pub fn accept(&self, visitor: &mut dyn crate::serial::Visitor) -> bool {
        crate::serial::accept(self, self.root, visitor)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .field("root", &self.root)
            .field("error", &self.error)
            .field("write_bom", &self.write_bom)
            .field("user_data_entries", &self.user_data.len())
            .finish()
    }
}

fn finish(doc: Document) -> Result<Document, ParseError> {
    match doc.error {
        Some(err) => Err(err),
        None => Ok(doc),
    }
}

/// Parses the longest `[+-]?digits` prefix of `s` (after leading
/// whitespace) as an `i32`, like `sscanf("%d")`.
fn scan_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = bytes[sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    s[..sign + digits].parse().ok()
}

/// Parses the longest valid floating point prefix of `s` (after leading
/// whitespace) as an `f64`, like `sscanf("%lf")`.
fn scan_double(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    i += int_digits;

    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') && (int_digits > 0 || bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
        frac_digits = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        i += 1 + frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = bytes[j..].iter().take_while(|b| b.is_ascii_digit()).count();
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }

    s[..i].parse().ok()
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over a node and all its descendants.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Deeper first, then across, then up to the next unvisited branch.
        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        let mut node = current;
        loop {
            if node == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.doc.next_sibling(node) {
                self.next = Some(sibling);
                return Some(current);
            }
            match self.doc.parent(node) {
                Some(parent) => node = parent,
                None => {
                    self.next = None;
                    return Some(current);
                }
            }
        }
    }
}
