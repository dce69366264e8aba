//! XML pretty-printer.
//!
//! One [`Printer`] implementation feeds both output sinks: accumulate to a
//! `String` with [`serialize`], or stream to a writer (with the optional
//! UTF-8 BOM) with [`write_document`].
//!
//! Elements are formatted by three rules:
//!
//! 1. no children → `<name attrs />`
//! 2. exactly one non-CDATA text child → `<name attrs>text</name>` inline
//! 3. otherwise → open tag, children each on their own indented line
//!    (non-CDATA text children stay inline, with no preceding newline),
//!    then the close tag on its own line
//!
//! Attribute values are double-quoted unless the value contains `"`, in
//! which case single quotes are used and the `"` is left literal.

use std::fmt::Write as _;
use std::io;

use crate::encoding::UTF8_BOM;
use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::{accept, Visitor};

/// Serializes a document to an XML string.
///
/// # Examples
///
/// ```
/// use xmlite::Document;
/// use xmlite::serial::serialize;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// assert_eq!(serialize(&doc), "<root>\n    <child>Hello</child>\n</root>\n");
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    let mut printer = Printer::new();
    accept(doc, doc.root(), &mut printer);
    printer.into_string()
}

/// Writes a document to a byte sink, prepending the UTF-8 BOM when the
/// document's [`write_bom`](Document::write_bom) flag is set.
pub fn write_document<W: io::Write>(doc: &Document, writer: &mut W) -> io::Result<()> {
    if doc.write_bom() {
        writer.write_all(&UTF8_BOM)?;
    }
    writer.write_all(serialize(doc).as_bytes())
}

/// The pretty-printing visitor.
///
/// Builds the textual form into an internal buffer; run it over a tree
/// with [`Document::accept`] or [`accept`], then take the result with
/// [`Printer::into_string`].
pub struct Printer {
    buffer: String,
    depth: usize,
    /// Set between the open and close tag of a rule-2 element, so the
    /// single text child and the close tag stay on the open tag's line.
    simple_text: bool,
    /// True while nothing has been written on the current line.
    fresh_line: bool,
    indent: String,
    line_break: String,
}

impl Printer {
    /// A printer with the standard four-space indent and `\n` line breaks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            depth: 0,
            simple_text: false,
            fresh_line: true,
            indent: "    ".to_string(),
            line_break: "\n".to_string(),
        }
    }

    /// A printer that emits everything on one line with no indentation.
    #[must_use]
    pub fn compact() -> Self {
        let mut printer = Self::new();
        printer.indent.clear();
        printer.line_break.clear();
        printer
    }

    /// Overrides the per-level indent string.
    pub fn set_indent(&mut self, indent: &str) {
        self.indent = indent.to_string();
    }

    /// Overrides the line break string.
    pub fn set_line_break(&mut self, line_break: &str) {
        self.line_break = line_break.to_string();
    }

    /// Returns the accumulated output.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Returns the output accumulated so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Breaks the current line (if anything is on it) and indents.
    fn start_line(&mut self) {
        if !self.fresh_line {
            self.buffer.push_str(&self.line_break);
            self.fresh_line = true;
        }
        for _ in 0..self.depth {
            self.buffer.push_str(&self.indent);
        }
    }

    fn write(&mut self, s: &str) {
        self.buffer.push_str(s);
        self.fresh_line = false;
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for Printer {
    fn visit_exit_document(&mut self, _doc: &Document) -> bool {
        // Every top-level node ends with a line break.
        if !self.fresh_line {
            self.buffer.push_str(&self.line_break);
            self.fresh_line = true;
        }
        true
    }

    fn visit_enter_element(&mut self, doc: &Document, element: NodeId) -> bool {
        self.start_line();
        let mut tag = String::new();
        tag.push('<');
        tag.push_str(doc.node_value(element));
        for attr in doc.attributes(element) {
            tag.push(' ');
            write_attribute(&mut tag, attr);
        }

        let first = doc.first_child(element);
        if first.is_none() {
            tag.push_str(" />");
        } else {
            tag.push('>');
            let only_text_child = first == doc.last_child(element)
                && first.is_some_and(|id| {
                    matches!(doc.node(id).kind, NodeKind::Text { cdata: false, .. })
                });
            if only_text_child {
                self.simple_text = true;
            }
        }
        self.write(&tag);
        self.depth += 1;
        true
    }

    fn visit_exit_element(&mut self, doc: &Document, element: NodeId) -> bool {
        self.depth -= 1;
        if doc.first_child(element).is_some() {
            if self.simple_text {
                self.simple_text = false;
            } else {
                self.start_line();
            }
            let mut tag = String::new();
            tag.push_str("</");
            tag.push_str(doc.node_value(element));
            tag.push('>');
            self.write(&tag);
        }
        true
    }

    fn visit_text(&mut self, doc: &Document, text: NodeId) -> bool {
        let NodeKind::Text { content, cdata } = &doc.node(text).kind else {
            return true;
        };
        if *cdata {
            // CDATA always sits on its own line, raw, with no escaping.
            self.start_line();
            let mut section = String::new();
            section.push_str("<![CDATA[");
            section.push_str(content);
            section.push_str("]]>");
            self.write(&section);
        } else {
            // Plain text stays inline with whatever came before it.
            let mut encoded = String::new();
            encode_text(content, &mut encoded);
            self.write(&encoded);
        }
        true
    }

    fn visit_comment(&mut self, doc: &Document, comment: NodeId) -> bool {
        self.start_line();
        let mut out = String::new();
        out.push_str("<!--");
        out.push_str(doc.node_value(comment));
        out.push_str("-->");
        self.write(&out);
        true
    }

    fn visit_declaration(&mut self, doc: &Document, declaration: NodeId) -> bool {
        let NodeKind::Declaration {
            version,
            encoding,
            standalone,
        } = &doc.node(declaration).kind
        else {
            return true;
        };
        self.start_line();
        let mut out = String::new();
        out.push_str("<?xml ");
        for (field, value) in [
            ("version", version),
            ("encoding", encoding),
            ("standalone", standalone),
        ] {
            if !value.is_empty() {
                let _ = write!(out, "{field}=\"{value}\" ");
            }
        }
        out.push_str("?>");
        self.write(&out);
        true
    }

    fn visit_unknown(&mut self, doc: &Document, unknown: NodeId) -> bool {
        self.start_line();
        let mut out = String::new();
        out.push('<');
        out.push_str(doc.node_value(unknown));
        out.push('>');
        self.write(&out);
        true
    }
}

/// Writes `name="value"` (or `name='value'` when the value contains a
/// double quote) with both sides encoded.
fn write_attribute(out: &mut String, attr: &Attribute) {
    let quote = if attr.value.contains('"') { b'\'' } else { b'"' };
    encode_attribute(&attr.name, quote, out);
    out.push('=');
    out.push(quote as char);
    encode_attribute(&attr.value, quote, out);
    out.push(quote as char);
}

/// Escapes text content: the five XML specials become named entities,
/// control characters outside `\t\n\r` become uppercase hex references.
fn encode_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "&#x{:02X};", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Escapes an attribute name or value for output inside `quote`.
///
/// Like [`encode_text`], except that the quote character not in use stays
/// literal, and a `&#x` sequence already present in the value is passed
/// through unchanged — up to its `;`, or verbatim to the end when the `;`
/// is missing. Pre-encoded values round-trip this way; the unterminated
/// case is a deliberate compatibility quirk.
fn encode_attribute(text: &str, quote: u8, out: &mut String) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &text[i..];
        if rest.starts_with("&#x") {
            let end = rest.find(';').map_or(text.len(), |p| i + p + 1);
            out.push_str(&text[i..end]);
            i = end;
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote == b'"' => out.push_str("&quot;"),
            '\'' if quote == b'\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "&#x{:02X};", c as u32);
            }
            c => out.push(c),
        }
        i += ch.len_utf8();
    }
}
