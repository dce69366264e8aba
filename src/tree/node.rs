//! Node type definitions.
//!
//! The `NodeKind` enum represents the closed set of node types in an XML
//! document tree. Each variant carries the node-type-specific payload
//! (element name and attributes, text content, declaration fields).

use super::Attribute;

/// The kind of an XML node and its associated data.
///
/// This enum carries the payload for each node type. Navigation links
/// (parent, children, siblings) and the source location are stored in
/// `NodeData`, not here.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node — there is exactly one per `Document`, always at
    /// the root of the tree. Its value is the document name (usually the
    /// file path it was loaded from), stored on the `Document` itself.
    Document,

    /// An element node, e.g., `<item id="4">`.
    Element {
        /// The element's tag name.
        name: String,
        /// Attributes on this element, in insertion order. Names are
        /// unique within one element (byte-wise, case-sensitive).
        attributes: Vec<Attribute>,
    },

    /// A text node containing character data.
    Text {
        /// The text content. Entity references are resolved at parse time;
        /// CDATA content is stored verbatim.
        content: String,
        /// `true` when the text came from (and serializes back to) a
        /// `<![CDATA[...]]>` section.
        cdata: bool,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment body (without the `<!--` and `-->` delimiters),
        /// stored verbatim.
        content: String,
    },

    /// The `<?xml ... ?>` declaration. At most one is expected, as the
    /// first node of a document, though the parser does not enforce this.
    ///
    /// All three fields use the empty string to mean "absent"; absent
    /// fields are omitted on output.
    Declaration {
        /// The `version` field (e.g., `"1.0"`).
        version: String,
        /// The `encoding` field (e.g., `"UTF-8"`).
        encoding: String,
        /// The `standalone` field (`"yes"` or `"no"`).
        standalone: String,
    },

    /// Anything in angle brackets the parser does not recognize — DOCTYPE,
    /// processing instructions, `<!`-directives. The content between `<`
    /// and `>` is stored verbatim so the construct round-trips unchanged.
    Unknown {
        /// Everything between `<` and `>`, including the leading `!` or `?`.
        content: String,
    },
}

impl NodeKind {
    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns `true` for text nodes (CDATA included).
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}
