//! Input encoding handling: BOM detection, end-of-line normalization, and
//! transcoding between UTF-8 and the legacy single-byte code page.
//!
//! Two input encodings are supported: UTF-8 (with or without BOM) and the
//! host's legacy 8-bit encoding, taken to be Windows-1252 and bridged
//! through `encoding_rs`. Parsed values are always stored as UTF-8
//! `String`s; legacy input is transcoded once, up front, before the parser
//! ever sees it.
//!
//! End-of-line normalization happens here too: per XML 1.0 §2.11, `CR LF`
//! and bare `CR` both become a single `LF` before parsing, so the parser's
//! location tracker only ever sees `\n`.

use std::borrow::Cow;

/// The input encoding of an XML byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8 (the default when nothing else is known).
    Utf8,
    /// The host legacy single-byte encoding (Windows-1252).
    Legacy,
    /// Not specified by the caller; treated as UTF-8 unless a BOM says
    /// otherwise.
    #[default]
    Unknown,
}

/// The UTF-8 byte order mark.
pub(crate) const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Returns `true` if the byte stream starts with the UTF-8 BOM.
#[must_use]
pub fn has_utf8_bom(bytes: &[u8]) -> bool {
    bytes.starts_with(&UTF8_BOM)
}

/// Normalizes line endings in place: `CR LF` → `LF`, bare `CR` → `LF`.
///
/// Returns a borrowed slice when the input contains no `\r` (the common
/// case), otherwise a freshly built string. A single forward pass with a
/// read cursor that can outrun the write position.
#[must_use]
pub fn normalize_eol(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\r' {
            out.push('\n');
            i += 1;
            if i < bytes.len() && bytes[i] == b'\n' {
                i += 1;
            }
        } else {
            // Copy the longest run without a CR in one shot.
            let start = i;
            while i < bytes.len() && bytes[i] != b'\r' {
                i += 1;
            }
            out.push_str(&input[start..i]);
        }
    }
    Cow::Owned(out)
}

/// Decodes raw input bytes to UTF-8 text according to the requested
/// encoding.
///
/// - `Utf8` / `Unknown`: validate as UTF-8; on failure fall back to the
///   legacy single-byte decode (every byte maps to a character, so the
///   fallback cannot fail). This is the "legacy 8-bit fallback" for byte
///   sequences that are not valid UTF-8.
/// - `Legacy`: decode as Windows-1252 unconditionally.
///
/// The caller is expected to have stripped the BOM already.
#[must_use]
pub fn decode_input(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Utf8 | TextEncoding::Unknown => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => decode_legacy(bytes),
        },
        TextEncoding::Legacy => decode_legacy(bytes),
    }
}

fn decode_legacy(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Appends the expansion of a numeric character reference to `out`.
///
/// In UTF-8 mode the code point is emitted as its canonical UTF-8 sequence.
/// In legacy mode only code points below 128 are representable; anything
/// else degrades to `?`. Returns `false` for code points that are not valid
/// Unicode scalar values.
pub(crate) fn push_code_point(out: &mut String, code_point: u32, encoding: TextEncoding) -> bool {
    let Some(ch) = char::from_u32(code_point) else {
        return false;
    };
    match encoding {
        TextEncoding::Legacy => {
            if code_point < 128 {
                out.push(ch);
            } else {
                out.push('?');
            }
        }
        TextEncoding::Utf8 | TextEncoding::Unknown => out.push(ch),
    }
    true
}
