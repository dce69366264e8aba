//! # xmlite
//!
//! A self-contained, in-memory XML 1.0 document model: parse a byte
//! stream into a tree of typed nodes, inspect and mutate the tree, and
//! serialize it back to textual XML. Built for configuration files,
//! interchange documents, and small data files — not for streaming
//! gigabyte pipelines, schema validation, or XPath.
//!
//! Namespaces are not processed (`xmlns` is an ordinary attribute), and
//! DOCTYPEs round-trip verbatim as [`NodeKind::Unknown`] nodes.
//!
//! ## Quick Start
//!
//! ```
//! use xmlite::Document;
//!
//! let doc = Document::parse_str("<config><port>8080</port></config>").unwrap();
//! let config = doc.root_element().unwrap();
//! let port = doc.first_child_element_named(config, "port").unwrap();
//! assert_eq!(doc.element_text(port), Some("8080"));
//! ```
//!
//! Parse errors carry a stable numeric code and the source location of
//! the failure; the partially built tree can be inspected through
//! [`parser::parse_document`].

pub mod encoding;
pub mod error;
pub mod parser;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use encoding::TextEncoding;
pub use error::{ErrorKind, ParseError, SourceLocation};
pub use parser::ParseOptions;
pub use tree::{Attribute, AttributeError, Document, NodeData, NodeId, NodeKind};
