//! Serialization: the visitor protocol and the XML pretty-printer.
//!
//! Traversal is depth-first, children in order, driven by [`accept`].
//! A visitor hook returning `false` prunes that branch — an element's
//! children are skipped when `visit_enter_element` returns `false`, and a
//! `false` from any child stops its remaining siblings — but the
//! enclosing element's `visit_exit_element` always still runs.

mod xml;

pub use xml::{serialize, write_document, Printer};

use crate::tree::{Document, NodeId, NodeKind};

/// A depth-first tree visitor.
///
/// All hooks default to `true` (keep going), so implementations only
/// override what they care about.
pub trait Visitor {
    /// Called before the document's children are visited.
    fn visit_enter_document(&mut self, doc: &Document) -> bool {
        let _ = doc;
        true
    }

    /// Called after the document's children were visited.
    fn visit_exit_document(&mut self, doc: &Document) -> bool {
        let _ = doc;
        true
    }

    /// Called before an element's children are visited. Attributes are
    /// reachable through [`Document::attributes`].
    fn visit_enter_element(&mut self, doc: &Document, element: NodeId) -> bool {
        let _ = (doc, element);
        true
    }

    /// Called after an element's children were visited (also when
    /// `visit_enter_element` returned `false`).
    fn visit_exit_element(&mut self, doc: &Document, element: NodeId) -> bool {
        let _ = (doc, element);
        true
    }

    /// Called for text nodes, CDATA included.
    fn visit_text(&mut self, doc: &Document, text: NodeId) -> bool {
        let _ = (doc, text);
        true
    }

    /// Called for comment nodes.
    fn visit_comment(&mut self, doc: &Document, comment: NodeId) -> bool {
        let _ = (doc, comment);
        true
    }

    /// Called for declaration nodes.
    fn visit_declaration(&mut self, doc: &Document, declaration: NodeId) -> bool {
        let _ = (doc, declaration);
        true
    }

    /// Called for unknown nodes.
    fn visit_unknown(&mut self, doc: &Document, unknown: NodeId) -> bool {
        let _ = (doc, unknown);
        true
    }
}

/// Walks `node` and its subtree depth-first, dispatching on node kind.
///
/// Returns the result of the final hook on `node` (the exit hook for
/// containers), which callers propagate to stop sibling traversal.
pub fn accept(doc: &Document, node: NodeId, visitor: &mut dyn Visitor) -> bool {
    match &doc.node(node).kind {
        NodeKind::Document => {
            if visitor.visit_enter_document(doc) {
                for child in doc.children(node) {
                    if !accept(doc, child, visitor) {
                        break;
                    }
                }
            }
            visitor.visit_exit_document(doc)
        }
        NodeKind::Element { .. } => {
            if visitor.visit_enter_element(doc, node) {
                for child in doc.children(node) {
                    if !accept(doc, child, visitor) {
                        break;
                    }
                }
            }
            visitor.visit_exit_element(doc, node)
        }
        NodeKind::Text { .. } => visitor.visit_text(doc, node),
        NodeKind::Comment { .. } => visitor.visit_comment(doc, node),
        NodeKind::Declaration { .. } => visitor.visit_declaration(doc, node),
        NodeKind::Unknown { .. } => visitor.visit_unknown(doc, node),
    }
}
