//! Error types and diagnostics for XML parsing.
//!
//! This module provides structured error reporting with source location
//! tracking. Every failure carries a stable numeric code and a fixed
//! human-readable description so that tooling built around the legacy
//! code/message table keeps working across versions.
//!
//! Parse errors are **sticky**: the first failure is stamped onto the
//! [`Document`](crate::Document) together with the location of the
//! offending construct, the partially built tree is retained, and the
//! error stays set until [`Document::clear_error`](crate::Document::clear_error)
//! is called.

use std::fmt;

/// Source location within an XML document.
///
/// Row and column are 1-based; `(0, 0)` marks locations that do not come
/// from parsed input (programmatically created nodes, I/O failures).
/// Column accounting honors the tab size configured on
/// [`ParseOptions`](crate::ParseOptions): a tab advances the column to the
/// next multiple of the tab size plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based row (line) number.
    pub row: u32,
    /// 1-based column number.
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// The kind of a parse or document error.
///
/// Each kind maps to a stable numeric code (via [`ErrorKind::code`]) and a
/// fixed description string (via [`ErrorKind::description`]). Code `0` is
/// reserved for "no error" and is reported by
/// [`Document::error_code`](crate::Document::error_code) when the document
/// is clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unclassified error.
    Generic,
    /// A file could not be opened or read.
    OpeningFile,
    /// Malformed element markup (including bad entity references in text).
    ParsingElement,
    /// An element name could not be read where one was required.
    FailedToReadElementName,
    /// Element content ended unexpectedly (no closing tag before EOF).
    ReadingElementValue,
    /// Malformed attribute (missing `=`, missing quote, bad reference).
    ReadingAttributes,
    /// A `/` in a start tag was not followed by `>`.
    ParsingEmpty,
    /// The end tag was missing, malformed, or did not match the open element.
    ReadingEndTag,
    /// An `<! ...>` or `<? ...>` construct was not terminated.
    ParsingUnknown,
    /// A `<!--` comment was not terminated by `-->`.
    ParsingComment,
    /// A `<?xml ...?>` declaration was malformed.
    ParsingDeclaration,
    /// The input contained no content at all.
    DocumentEmpty,
    /// A NUL byte was found in the input stream.
    EmbeddedNull,
    /// A `<![CDATA[` section was not terminated by `]]>`.
    ParsingCdata,
    /// A document node was used where only the tree root may be, or raw
    /// text appeared at document top level.
    DocumentTopOnly,
}

impl ErrorKind {
    /// Returns the stable numeric code for this error kind.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Generic => 1,
            Self::OpeningFile => 2,
            Self::ParsingElement => 3,
            Self::FailedToReadElementName => 4,
            Self::ReadingElementValue => 5,
            Self::ReadingAttributes => 6,
            Self::ParsingEmpty => 7,
            Self::ReadingEndTag => 8,
            Self::ParsingUnknown => 9,
            Self::ParsingComment => 10,
            Self::ParsingDeclaration => 11,
            Self::DocumentEmpty => 12,
            Self::EmbeddedNull => 13,
            Self::ParsingCdata => 14,
            Self::DocumentTopOnly => 15,
        }
    }

    /// Returns the fixed description string for this error kind.
    ///
    /// The code→string mapping is part of the stable surface; it must not
    /// change between releases.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Generic => "Error",
            Self::OpeningFile => "Failed to open file",
            Self::ParsingElement => "Error parsing Element.",
            Self::FailedToReadElementName => "Failed to read Element name",
            Self::ReadingElementValue => "Error reading Element value.",
            Self::ReadingAttributes => "Error reading Attributes.",
            Self::ParsingEmpty => "Error: empty tag.",
            Self::ReadingEndTag => "Error reading end tag.",
            Self::ParsingUnknown => "Error parsing Unknown.",
            Self::ParsingComment => "Error parsing Comment.",
            Self::ParsingDeclaration => "Error parsing Declaration.",
            Self::DocumentEmpty => "Error document empty.",
            Self::EmbeddedNull => "Error null (0) or unexpected EOF found in input stream.",
            Self::ParsingCdata => "Error parsing CDATA.",
            Self::DocumentTopOnly => {
                "Error adding a document to a document: a document can only be at the root."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The error type produced when parsing fails or a document operation is
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where in the source it went wrong. `(0, 0)` when no source position
    /// applies (for example, I/O failures).
    pub location: SourceLocation,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// Returns the stable numeric code of the underlying kind.
    #[must_use]
    pub fn code(&self) -> u8 {
        self.kind.code()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location == SourceLocation::default() {
            f.write_str(self.kind.description())
        } else {
            write!(f, "{} at {}", self.kind.description(), self.location)
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation { row: 10, column: 5 };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_parse_error_display_with_location() {
        let err = ParseError::new(
            ErrorKind::ReadingEndTag,
            SourceLocation { row: 1, column: 7 },
        );
        assert_eq!(err.to_string(), "Error reading end tag. at 1:7");
    }

    #[test]
    fn test_parse_error_display_without_location() {
        let err = ParseError::new(ErrorKind::OpeningFile, SourceLocation::default());
        assert_eq!(err.to_string(), "Failed to open file");
    }

    #[test]
    fn test_error_codes_are_stable() {
        // The numeric mapping is a compatibility surface; lock it down.
        let table = [
            (ErrorKind::Generic, 1),
            (ErrorKind::OpeningFile, 2),
            (ErrorKind::ParsingElement, 3),
            (ErrorKind::FailedToReadElementName, 4),
            (ErrorKind::ReadingElementValue, 5),
            (ErrorKind::ReadingAttributes, 6),
            (ErrorKind::ParsingEmpty, 7),
            (ErrorKind::ReadingEndTag, 8),
            (ErrorKind::ParsingUnknown, 9),
            (ErrorKind::ParsingComment, 10),
            (ErrorKind::ParsingDeclaration, 11),
            (ErrorKind::DocumentEmpty, 12),
            (ErrorKind::EmbeddedNull, 13),
            (ErrorKind::ParsingCdata, 14),
            (ErrorKind::DocumentTopOnly, 15),
        ];
        for (kind, code) in table {
            assert_eq!(kind.code(), code, "code drifted for {kind:?}");
        }
    }

    #[test]
    fn test_error_descriptions_are_stable() {
        assert_eq!(
            ErrorKind::DocumentEmpty.description(),
            "Error document empty."
        );
        assert_eq!(
            ErrorKind::EmbeddedNull.description(),
            "Error null (0) or unexpected EOF found in input stream."
        );
        assert_eq!(
            ErrorKind::ParsingCdata.description(),
            "Error parsing CDATA."
        );
    }

    #[test]
    fn test_parse_error_is_error_trait() {
        let err = ParseError::new(ErrorKind::Generic, SourceLocation::default());
        let _: &dyn std::error::Error = &err;
    }
}
