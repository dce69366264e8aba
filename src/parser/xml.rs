//! Core recursive descent parser.
//!
//! At every step the parser classifies the next construct from a small
//! prefix and builds the matching subtree:
//!
//! | Prefix              | Construct                      |
//! |---------------------|--------------------------------|
//! | `<?xml` + ws or `?` | Declaration (case-insensitive) |
//! | `<!--`              | Comment                        |
//! | `<![CDATA[`         | Text with the CDATA flag       |
//! | `</`                | End tag (returns to caller)    |
//! | `<` + name start    | Element start tag              |
//! | `<` + anything else | Unknown (`<!`, `<?`, stray)    |
//! | anything else       | Text (inside an element only)  |
//!
//! Nodes are linked into the tree as soon as they are created, so when
//! parsing stops at the first error the partial tree is still reachable
//! from the document.

use crate::encoding::TextEncoding;
use crate::error::{ErrorKind, ParseError, SourceLocation};
use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::input::{is_name_start, is_xml_whitespace, ParserInput};
use super::ParseOptions;

pub(crate) struct DocParser<'a> {
    /// Low-level cursor (position, location, tokenizer primitives).
    input: ParserInput<'a>,
    /// The document being built.
    doc: Document,
    /// Whether text nodes get whitespace-condensed.
    condense: bool,
}

impl<'a> DocParser<'a> {
    pub fn new(
        source: &'a str,
        options: &ParseOptions,
        encoding: TextEncoding,
        doc: Document,
    ) -> Self {
        Self {
            input: ParserInput::new(source, options.tab_size, encoding),
            doc,
            condense: options.condense_whitespace,
        }
    }

    /// Runs the parser to completion or to the first error, which is
    /// stamped onto the document. Always hands the document back.
    pub fn parse(mut self) -> Document {
        if let Err(err) = self.parse_top_level() {
            self.doc.set_error(err);
        }
        self.doc
    }

    /// Document top level: whitespace, declaration, comments, unknowns,
    /// and element(s). Raw text is not allowed here; an entirely empty
    /// input is an error of its own.
    fn parse_top_level(&mut self) -> Result<(), ParseError> {
        self.input.skip_whitespace();
        if self.input.at_end() {
            return Err(self.input.error(ErrorKind::DocumentEmpty));
        }
        let root = self.doc.root();
        while !self.input.at_end() {
            if self.input.peek() != Some(b'<') {
                return Err(self.input.error(ErrorKind::DocumentTopOnly));
            }
            self.parse_construct(root)?;
            self.input.skip_whitespace();
        }
        Ok(())
    }

    /// Parses the markup construct starting at `<` and links it under
    /// `parent`.
    fn parse_construct(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        debug_assert_eq!(self.input.peek(), Some(b'<'));
        let location = self.input.location();

        if self.looking_at_declaration() {
            self.parse_declaration(parent, location)
        } else if self.input.looking_at(b"<!--") {
            self.parse_comment(parent, location)
        } else if self.input.looking_at(b"<![CDATA[") {
            self.parse_cdata(parent, location)
        } else if self.input.peek_at(1).is_some_and(is_name_start) {
            self.parse_element(parent, location)
        } else {
            self.parse_unknown(parent, location)
        }
    }

    /// The declaration prefix is `<?xml` (any case) followed by
    /// whitespace or `?`; everything else starting `<?` is a processing
    /// instruction and round-trips as Unknown.
    fn looking_at_declaration(&self) -> bool {
        self.input.looking_at_ci(b"<?xml")
            && match self.input.peek_at(5) {
                Some(b) => is_xml_whitespace(b) || b == b'?',
                None => true,
            }
    }

    // --- Elements ---

    fn parse_element(
        &mut self,
        parent: NodeId,
        location: SourceLocation,
    ) -> Result<NodeId, ParseError> {
        self.input.advance(1); // '<'
        let name = self.input.parse_name(ErrorKind::FailedToReadElementName)?;
        let element = self.doc.create_node(NodeKind::Element {
            name: name.clone(),
            attributes: Vec::new(),
        });
        self.doc.set_location(element, location);
        self.doc.append_child(parent, element);

        // Start tag: attributes until '>' or '/>'.
        loop {
            self.input.skip_whitespace();
            match self.input.peek() {
                None => return Err(self.input.error(ErrorKind::ReadingAttributes)),
                Some(b'/') => {
                    self.input.advance(1);
                    if self.input.peek() != Some(b'>') {
                        return Err(self.input.error(ErrorKind::ParsingEmpty));
                    }
                    self.input.advance(1);
                    return Ok(element);
                }
                Some(b'>') => {
                    self.input.advance(1);
                    break;
                }
                Some(_) => self.parse_attribute(element)?,
            }
        }

        self.parse_content(element, &name)?;
        Ok(element)
    }

    fn parse_attribute(&mut self, element: NodeId) -> Result<(), ParseError> {
        let location = self.input.location();
        let name = self.input.parse_name(ErrorKind::ReadingAttributes)?;
        self.input.skip_whitespace();
        if self.input.peek() != Some(b'=') {
            return Err(self.input.error(ErrorKind::ReadingAttributes));
        }
        self.input.advance(1);
        self.input.skip_whitespace();
        let value = self.input.parse_quoted_value(ErrorKind::ReadingAttributes)?;

        self.doc.insert_attribute(
            element,
            Attribute {
                name,
                value,
                location,
            },
        );
        Ok(())
    }

    /// Element content: text and child constructs until the matching end
    /// tag. End of input before the end tag is an error.
    fn parse_content(&mut self, element: NodeId, name: &str) -> Result<(), ParseError> {
        loop {
            if self.input.at_end() {
                return Err(self.input.error(ErrorKind::ReadingElementValue));
            }
            if self.input.looking_at(b"</") {
                return self.parse_end_tag(name);
            }
            if self.input.peek() == Some(b'<') {
                self.parse_construct(element)?;
            } else {
                let location = self.input.location();
                let text =
                    self.input
                        .read_text(b'<', self.condense, ErrorKind::ParsingElement)?;
                // Whitespace-only segments never become nodes.
                if !text.bytes().all(is_xml_whitespace) {
                    let node = self.doc.create_node(NodeKind::Text {
                        content: text,
                        cdata: false,
                    });
                    self.doc.set_location(node, location);
                    self.doc.append_child(element, node);
                }
            }
        }
    }

    /// Parses `</name>`; the name must match the open element exactly
    /// (case-sensitive). Errors point at the `</`.
    fn parse_end_tag(&mut self, expected: &str) -> Result<(), ParseError> {
        let location = self.input.location();
        self.input.advance(2); // '</'
        let name = self.input.parse_name(ErrorKind::ReadingEndTag)?;
        if name != expected {
            return Err(ParseError::new(ErrorKind::ReadingEndTag, location));
        }
        self.input.skip_whitespace();
        if self.input.peek() != Some(b'>') {
            return Err(self.input.error(ErrorKind::ReadingEndTag));
        }
        self.input.advance(1);
        Ok(())
    }

    // --- Non-element constructs ---

    fn parse_comment(
        &mut self,
        parent: NodeId,
        location: SourceLocation,
    ) -> Result<NodeId, ParseError> {
        self.input.advance(4); // '<!--'
        let Some(content) = self.input.take_through(b"-->") else {
            return Err(ParseError::new(ErrorKind::ParsingComment, location));
        };
        let node = self.doc.create_node(NodeKind::Comment { content });
        self.doc.set_location(node, location);
        self.doc.append_child(parent, node);
        Ok(node)
    }

    fn parse_cdata(
        &mut self,
        parent: NodeId,
        location: SourceLocation,
    ) -> Result<NodeId, ParseError> {
        self.input.advance(9); // '<![CDATA['
        let Some(content) = self.input.take_through(b"]]>") else {
            return Err(ParseError::new(ErrorKind::ParsingCdata, location));
        };
        let node = self.doc.create_node(NodeKind::Text {
            content,
            cdata: true,
        });
        self.doc.set_location(node, location);
        self.doc.append_child(parent, node);
        Ok(node)
    }

    /// Anything else in angle brackets — DOCTYPE, processing
    /// instructions, stray markup — is stored verbatim between `<` and
    /// `>` so it round-trips unchanged.
    fn parse_unknown(
        &mut self,
        parent: NodeId,
        location: SourceLocation,
    ) -> Result<NodeId, ParseError> {
        self.input.advance(1); // '<'
        let Some(content) = self.input.take_through(b">") else {
            return Err(ParseError::new(ErrorKind::ParsingUnknown, location));
        };
        let node = self.doc.create_node(NodeKind::Unknown { content });
        self.doc.set_location(node, location);
        self.doc.append_child(parent, node);
        Ok(node)
    }

    /// `<?xml ...?>`: a sequence of `name="value"` fields. `version`,
    /// `encoding` and `standalone` are recorded; unrecognized fields are
    /// ignored.
    fn parse_declaration(
        &mut self,
        parent: NodeId,
        location: SourceLocation,
    ) -> Result<NodeId, ParseError> {
        self.input.advance(5); // '<?xml'
        let mut version = String::new();
        let mut encoding = String::new();
        let mut standalone = String::new();

        loop {
            self.input.skip_whitespace();
            if self.input.looking_at(b"?>") {
                self.input.advance(2);
                break;
            }
            if self.input.at_end() {
                return Err(self.input.error(ErrorKind::ParsingDeclaration));
            }
            let field = self.input.parse_name(ErrorKind::ParsingDeclaration)?;
            self.input.skip_whitespace();
            if self.input.peek() != Some(b'=') {
                return Err(self.input.error(ErrorKind::ParsingDeclaration));
            }
            self.input.advance(1);
            self.input.skip_whitespace();
            let value = self.input.parse_quoted_value(ErrorKind::ParsingDeclaration)?;
            match field.as_str() {
                "version" => version = value,
                "encoding" => encoding = value,
                "standalone" => standalone = value,
                _ => {}
            }
        }

        let node = self.doc.create_node(NodeKind::Declaration {
            version,
            encoding,
            standalone,
        });
        self.doc.set_location(node, location);
        self.doc.append_child(parent, node);
        Ok(node)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn parse(source: &str) -> Document {
        parse_document(source, &ParseOptions::default())
    }

    fn parse_keep_whitespace(source: &str) -> Document {
        parse_document(source, &ParseOptions::default().condense_whitespace(false))
    }

    #[test]
    fn test_empty_element() {
        let doc = parse("<r/>");
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_value(root), "r");
        assert_eq!(doc.first_child(root), None);
        assert!(doc.attributes(root).is_empty());
    }

    #[test]
    fn test_nested_elements() {
        let doc = parse("<a><b><c/></b></a>");
        assert!(!doc.has_error());
        let a = doc.root_element().unwrap();
        let b = doc.first_child(a).unwrap();
        let c = doc.first_child(b).unwrap();
        assert_eq!(doc.node_value(b), "b");
        assert_eq!(doc.node_value(c), "c");
        assert_eq!(doc.parent(b), Some(a));
    }

    #[test]
    fn test_attributes_and_entities() {
        let doc = parse("<r a=\"1&amp;2\" b='x\"y'/>");
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute(root, "a"), Some("1&2"));
        assert_eq!(doc.attribute(root, "b"), Some("x\"y"));
    }

    #[test]
    fn test_duplicate_attributes_overwrite() {
        let doc = parse("<r a=\"1\" a=\"2\"/>");
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attributes(root).len(), 1);
        assert_eq!(doc.attribute(root, "a"), Some("2"));
    }

    #[test]
    fn test_attribute_without_whitespace_between() {
        let doc = parse("<r a=\"1\"b=\"2\"/>");
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute(root, "b"), Some("2"));
    }

    #[test]
    fn test_text_condensed_by_default() {
        let doc = parse("<r>  a \n\t b  </r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some("a b"));
    }

    #[test]
    fn test_text_kept_verbatim_without_condensing() {
        let doc = parse_keep_whitespace("<r> a \n b </r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some(" a \n b "));
    }

    #[test]
    fn test_whitespace_only_text_never_becomes_a_node() {
        let doc = parse_keep_whitespace("<r>\n  <a/>\n</r>");
        let root = doc.root_element().unwrap();
        let children: Vec<NodeId> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.node_value(children[0]), "a");
    }

    #[test]
    fn test_mixed_content() {
        let doc = parse("<r>pre<i>mid</i>post</r>");
        let root = doc.root_element().unwrap();
        let values: Vec<String> = doc
            .children(root)
            .map(|id| doc.node_value(id).to_string())
            .collect();
        assert_eq!(values, ["pre", "i", "post"]);
    }

    #[test]
    fn test_cdata() {
        let doc = parse("<r><![CDATA[<x&>]]></r>");
        assert!(!doc.has_error());
        let root = doc.root_element().unwrap();
        let child = doc.first_child(root).unwrap();
        match &doc.node(child).kind {
            NodeKind::Text { content, cdata } => {
                assert_eq!(content, "<x&>");
                assert!(cdata);
            }
            other => panic!("expected text node, got {other:?}"),
        }
    }

    #[test]
    fn test_cdata_is_never_condensed() {
        let doc = parse("<r><![CDATA[  a   b  ]]></r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some("  a   b  "));
    }

    #[test]
    fn test_comment() {
        let doc = parse("<!-- top --><r/>");
        assert!(!doc.has_error());
        let comment = doc.first_child(doc.root()).unwrap();
        match &doc.node(comment).kind {
            NodeKind::Comment { content } => assert_eq!(content, " top "),
            other => panic!("expected comment, got {other:?}"),
        }
    }

    #[test]
    fn test_comment_body_is_verbatim() {
        let doc = parse("<r><!-- a &amp; b --></r>");
        let root = doc.root_element().unwrap();
        let comment = doc.first_child(root).unwrap();
        assert_eq!(doc.node_value(comment), " a &amp; b ");
    }

    #[test]
    fn test_declaration() {
        let doc = parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?><r/>");
        assert!(!doc.has_error());
        let decl = doc.first_child(doc.root()).unwrap();
        match &doc.node(decl).kind {
            NodeKind::Declaration {
                version,
                encoding,
                standalone,
            } => {
                assert_eq!(version, "1.0");
                assert_eq!(encoding, "UTF-8");
                assert_eq!(standalone, "");
            }
            other => panic!("expected declaration, got {other:?}"),
        }
        assert!(doc.root_element().is_some());
    }

    #[test]
    fn test_declaration_case_insensitive_and_unknown_fields() {
        let doc = parse("<?XML version='1.1' custom='x' standalone='yes'?><r/>");
        assert!(!doc.has_error());
        let decl = doc.first_child(doc.root()).unwrap();
        match &doc.node(decl).kind {
            NodeKind::Declaration {
                version,
                standalone,
                ..
            } => {
                assert_eq!(version, "1.1");
                assert_eq!(standalone, "yes");
            }
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_processing_instruction_is_unknown() {
        let doc = parse("<?xml-stylesheet href=\"a.css\"?><r/>");
        assert!(!doc.has_error());
        let pi = doc.first_child(doc.root()).unwrap();
        match &doc.node(pi).kind {
            NodeKind::Unknown { content } => {
                assert_eq!(content, "?xml-stylesheet href=\"a.css\"?");
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_doctype_is_unknown() {
        let doc = parse("<!DOCTYPE note SYSTEM \"note.dtd\"><r/>");
        assert!(!doc.has_error());
        let dt = doc.first_child(doc.root()).unwrap();
        match &doc.node(dt).kind {
            NodeKind::Unknown { content } => {
                assert_eq!(content, "!DOCTYPE note SYSTEM \"note.dtd\"");
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_root_elements_tolerated() {
        let doc = parse("<a/><b/>");
        assert!(!doc.has_error());
        let tops: Vec<String> = doc
            .children(doc.root())
            .map(|id| doc.node_value(id).to_string())
            .collect();
        assert_eq!(tops, ["a", "b"]);
    }

    #[test]
    fn test_comments_only_document_is_fine() {
        let doc = parse("<!-- nothing else -->");
        assert!(!doc.has_error());
    }

    #[test]
    fn test_empty_document_error() {
        let doc = parse("");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::DocumentEmpty);
        let doc = parse("   \n  ");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::DocumentEmpty);
    }

    #[test]
    fn test_top_level_text_rejected() {
        let doc = parse("stray<r/>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::DocumentTopOnly);
        // Text after the root element is rejected too.
        let doc = parse("<r/>stray");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::DocumentTopOnly);
    }

    #[test]
    fn test_mismatched_end_tag_location_and_partial_tree() {
        let doc = parse("<a><b></a>");
        let err = doc.error().unwrap();
        assert_eq!(err.kind, ErrorKind::ReadingEndTag);
        // The error points at the '<' of '</a>'.
        assert_eq!(err.location, SourceLocation { row: 1, column: 7 });
        // The partial a -> b subtree is retained.
        let a = doc.root_element().unwrap();
        assert_eq!(doc.node_value(a), "a");
        let b = doc.first_child(a).unwrap();
        assert_eq!(doc.node_value(b), "b");
    }

    #[test]
    fn test_end_tag_is_case_sensitive() {
        let doc = parse("<a></A>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ReadingEndTag);
    }

    #[test]
    fn test_end_tag_allows_trailing_whitespace() {
        let doc = parse("<a></a >");
        assert!(!doc.has_error());
    }

    #[test]
    fn test_unterminated_content() {
        let doc = parse("<a><b></b>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ReadingElementValue);
    }

    #[test]
    fn test_unterminated_comment() {
        let doc = parse("<r><!-- never closed</r>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ParsingComment);
    }

    #[test]
    fn test_unterminated_cdata() {
        let doc = parse("<r><![CDATA[never closed</r>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ParsingCdata);
    }

    #[test]
    fn test_unterminated_unknown() {
        let doc = parse("<!DOCTYPE never closed");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ParsingUnknown);
    }

    #[test]
    fn test_malformed_declaration() {
        let doc = parse("<?xml version 1.0?><r/>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ParsingDeclaration);
    }

    #[test]
    fn test_slash_without_close_is_empty_tag_error() {
        let doc = parse("<r /x>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ParsingEmpty);
    }

    #[test]
    fn test_unquoted_attribute_value_rejected() {
        let doc = parse("<r a=1/>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ReadingAttributes);
    }

    #[test]
    fn test_attribute_missing_equals_rejected() {
        let doc = parse("<r a \"1\"/>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ReadingAttributes);
    }

    #[test]
    fn test_bad_entity_in_text() {
        let doc = parse("<r>&bogus;</r>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ParsingElement);
    }

    #[test]
    fn test_bad_entity_in_attribute() {
        let doc = parse("<r a=\"&bogus;\"/>");
        assert_eq!(doc.error().unwrap().kind, ErrorKind::ReadingAttributes);
    }

    #[test]
    fn test_node_locations_are_stamped() {
        let doc = parse("<r>\n  <item a=\"1\"/>\n</r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.location(root), SourceLocation { row: 1, column: 1 });
        let item = doc.first_child(root).unwrap();
        assert_eq!(doc.location(item), SourceLocation { row: 2, column: 3 });
        assert_eq!(
            doc.attributes(item)[0].location,
            SourceLocation { row: 2, column: 9 }
        );
    }

    #[test]
    fn test_tab_size_affects_locations() {
        let doc = parse_document("<r>\n\t<item/>\n</r>", &ParseOptions::default().tab_size(8));
        let root = doc.root_element().unwrap();
        let item = doc.first_child(root).unwrap();
        assert_eq!(doc.location(item), SourceLocation { row: 2, column: 9 });
    }

    #[test]
    fn test_eol_normalization_in_text() {
        let doc = parse_keep_whitespace("<r>a\r\nb\rc\nd</r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some("a\nb\nc\nd"));

        let doc = parse("<r>a\r\nb\rc\nd</r>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element_text(root), Some("a b c d"));
    }

    #[test]
    fn test_stray_end_tag_at_top_level_is_unknown() {
        let doc = parse("<r/></r>");
        assert!(!doc.has_error());
        let tops: Vec<NodeId> = doc.children(doc.root()).collect();
        assert_eq!(tops.len(), 2);
        assert!(matches!(
            doc.node(tops[1]).kind,
            NodeKind::Unknown { .. }
        ));
    }

    #[test]
    fn test_error_is_sticky_after_parse() {
        let mut doc = parse("<a></b>");
        assert!(doc.has_error());
        let code = doc.error_code();
        // Re-reading state does not clear it.
        assert_eq!(doc.error_code(), code);
        doc.clear_error();
        assert_eq!(doc.error_code(), 0);
    }
}
