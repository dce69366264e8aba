//! XML document parser.
//!
//! A hand-rolled recursive descent parser that builds a [`Document`] tree
//! from a byte buffer or string. The parser is hand-rolled (not
//! combinator-based) because error reporting needs exact source locations
//! and the grammar is small enough that the direct style stays readable.
//!
//! Parsing never panics and never aborts early without a verdict: the
//! first failure stamps the document with a sticky error (kind +
//! location), the partially built tree is kept, and
//! [`parse_document`] hands the whole thing back for inspection. The
//! `Result`-returning entry points on [`Document`] are thin wrappers that
//! trade the partial tree for idiomatic error handling.

pub(crate) mod input;
mod xml;

use crate::encoding::{decode_input, has_utf8_bom, normalize_eol, TextEncoding};
use crate::error::{ErrorKind, ParseError};
use crate::tree::Document;

/// Default column step for tabs when computing error locations.
pub(crate) const DEFAULT_TAB_SIZE: u32 = 4;

/// Parse options controlling whitespace handling, location tracking, and
/// input encoding.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use xmlite::{ParseOptions, TextEncoding};
///
/// let opts = ParseOptions::default()
///     .condense_whitespace(false)
///     .tab_size(8)
///     .encoding(TextEncoding::Legacy);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// If true (the default), runs of whitespace inside text nodes are
    /// collapsed to a single space and leading/trailing runs are dropped.
    /// CDATA sections are never condensed.
    pub condense_whitespace: bool,
    /// Column step for `\t` when tracking source locations (default 4).
    pub tab_size: u32,
    /// The input encoding. `Unknown` (the default) means UTF-8 unless a
    /// BOM says otherwise.
    pub encoding: TextEncoding,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            condense_whitespace: true,
            tab_size: DEFAULT_TAB_SIZE,
            encoding: TextEncoding::Unknown,
        }
    }
}

impl ParseOptions {
    /// Enables or disables whitespace condensation in text nodes.
    #[must_use]
    pub fn condense_whitespace(mut self, yes: bool) -> Self {
        self.condense_whitespace = yes;
        self
    }

    /// Sets the tab size used for column accounting.
    #[must_use]
    pub fn tab_size(mut self, tab_size: u32) -> Self {
        self.tab_size = tab_size;
        self
    }

    /// Sets the input encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Parses an XML string into a `Document`, keeping the partial tree on
/// error.
///
/// Always returns a document; check [`Document::error`] for the sticky
/// error state. A leading BOM character sets the document's
/// [`write_bom`](Document::write_bom) flag, and line endings are
/// normalized first.
#[must_use]
pub fn parse_document(source: &str, options: &ParseOptions) -> Document {
    let (source, had_bom) = match source.strip_prefix('\u{FEFF}') {
        Some(rest) => (rest, true),
        None => (source, false),
    };
    let encoding = active_encoding(options.encoding);
    let text = normalize_eol(source);
    let mut doc = parse_normalized(&text, options, encoding);
    if had_bom {
        doc.set_write_bom_flag(true);
    }
    doc
}

/// Parses XML from raw bytes, keeping the partial tree on error.
///
/// A UTF-8 BOM wins over the options' encoding and sets the document's
/// [`write_bom`](Document::write_bom) flag. Input that is not valid UTF-8
/// falls back to the legacy single-byte decode.
#[must_use]
pub fn parse_document_bytes(bytes: &[u8], options: &ParseOptions) -> Document {
    let mut encoding = options.encoding;
    let mut content = bytes;
    let mut had_bom = false;
    if has_utf8_bom(bytes) {
        had_bom = true;
        encoding = TextEncoding::Utf8;
        content = &bytes[3..];
    }
    let decoded = decode_input(content, encoding);
    let text = normalize_eol(&decoded);
    let mut doc = parse_normalized(&text, options, active_encoding(encoding));
    if had_bom {
        doc.set_write_bom_flag(true);
    }
    doc
}

/// Resolves `Unknown` to UTF-8; the parser itself only distinguishes
/// UTF-8 from legacy (for numeric character references).
fn active_encoding(encoding: TextEncoding) -> TextEncoding {
    match encoding {
        TextEncoding::Legacy => TextEncoding::Legacy,
        TextEncoding::Utf8 | TextEncoding::Unknown => TextEncoding::Utf8,
    }
}

/// Runs the parser proper over normalized, decoded text.
fn parse_normalized(text: &str, options: &ParseOptions, encoding: TextEncoding) -> Document {
    let mut doc = Document::new();
    doc.record_options(options);

    // A NUL anywhere in the stream is rejected up front, with the
    // location of the first occurrence.
    if let Some(pos) = text.bytes().position(|b| b == 0) {
        let mut cursor = input::ParserInput::new(text, options.tab_size, encoding);
        cursor.advance(pos);
        doc.set_error(ParseError::new(ErrorKind::EmbeddedNull, cursor.location()));
        return doc;
    }

    xml::DocParser::new(text, options, encoding, doc).parse()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ParseOptions::default();
        assert!(opts.condense_whitespace);
        assert_eq!(opts.tab_size, 4);
        assert_eq!(opts.encoding, TextEncoding::Unknown);
    }

    #[test]
    fn test_builder() {
        let opts = ParseOptions::default()
            .condense_whitespace(false)
            .tab_size(8)
            .encoding(TextEncoding::Legacy);
        assert!(!opts.condense_whitespace);
        assert_eq!(opts.tab_size, 8);
        assert_eq!(opts.encoding, TextEncoding::Legacy);
    }

    #[test]
    fn test_embedded_null_is_rejected_with_location() {
        let doc = parse_document("<r>a\u{0}b</r>", &ParseOptions::default());
        let err = doc.error().unwrap();
        assert_eq!(err.kind, ErrorKind::EmbeddedNull);
        assert_eq!(err.location.row, 1);
        assert_eq!(err.location.column, 5);
        // Nothing was parsed.
        assert!(doc.root_element().is_none());
    }

    #[test]
    fn test_bom_char_sets_flag() {
        let doc = parse_document("\u{FEFF}<r/>", &ParseOptions::default());
        assert!(!doc.has_error());
        assert!(doc.write_bom());
    }

    #[test]
    fn test_bytes_bom_sets_flag_and_parses() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<r/>");
        let doc = parse_document_bytes(&bytes, &ParseOptions::default());
        assert!(!doc.has_error());
        assert!(doc.write_bom());
        assert!(doc.root_element().is_some());
    }

    #[test]
    fn test_bytes_legacy_input() {
        let opts = ParseOptions::default().encoding(TextEncoding::Legacy);
        let doc = parse_document_bytes(b"<r>caf\xE9</r>", &opts);
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some("caf\u{E9}"));
    }

    #[test]
    fn test_bytes_invalid_utf8_falls_back() {
        let doc = parse_document_bytes(b"<r>caf\xE9</r>", &ParseOptions::default());
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some("caf\u{E9}"));
    }
}
