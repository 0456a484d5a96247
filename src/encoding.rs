//! Provide character encoding detection and decoding for catalog documents.
//!
//! Catalog files are decoded to UTF-8 before they are handed to the parser.
//! The encoding is taken from the byte order mark, then from the first bytes
//! of the document, then from the `encoding` pseudo-attribute of the XML
//! declaration, and defaults to UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::CatalogError;

/// Result of sniffing the first bytes of a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectedEncoding {
    /// A byte order mark of `len` bytes was found.
    Bom {
        encoding: &'static Encoding,
        len: usize,
    },
    /// The encoding was guessed from the first characters `<?`.
    Guessed(&'static Encoding),
    /// UCS-4 or EBCDIC, which cannot be decoded.
    Unsupported(&'static str),
    /// Nothing conclusive: ASCII-compatible, check the XML declaration.
    None,
}

/// Guess the encoding of the document from its first bytes.
///
/// Refer to Appendix F of the XML 1.0 recommendation.
pub fn detect_encoding(input: &[u8]) -> DetectedEncoding {
    if let Some((encoding, len)) = Encoding::for_bom(input) {
        return DetectedEncoding::Bom { encoding, len };
    }
    match input {
        [0x00, 0x00, 0x00, 0x3C, ..]
        | [0x3C, 0x00, 0x00, 0x00, ..]
        | [0x00, 0x00, 0x3C, 0x00, ..]
        | [0x00, 0x3C, 0x00, 0x00, ..] => DetectedEncoding::Unsupported("ISO-10646-UCS-4"),
        [0x4C, 0x6F, 0xA7, 0x94, ..] => DetectedEncoding::Unsupported("EBCDIC"),
        [0x3C, 0x00, 0x3F, 0x00, ..] => DetectedEncoding::Guessed(UTF_16LE),
        [0x00, 0x3C, 0x00, 0x3F, ..] => DetectedEncoding::Guessed(UTF_16BE),
        _ => DetectedEncoding::None,
    }
}

/// Extract the value of the `encoding` pseudo-attribute from the XML
/// declaration at the head of `input`, if any.
fn declared_encoding(input: &[u8]) -> Option<&[u8]> {
    let decl = input.strip_prefix(b"<?xml")?;
    let end = decl.windows(2).position(|w| w == b"?>")?;
    let decl = &decl[..end];
    let pos = decl.windows(8).position(|w| w == b"encoding")?;
    let rest = decl[pos + 8..].trim_ascii_start().strip_prefix(b"=")?;
    let rest = rest.trim_ascii_start();
    let quote = *rest.first().filter(|&&q| q == b'"' || q == b'\'')?;
    let value = &rest[1..];
    let len = value.iter().position(|&b| b == quote)?;
    Some(&value[..len])
}

/// Decode a catalog document to a string.
///
/// `uri` is only used for error reporting.
pub fn decode_document<'a>(input: &'a [u8], uri: &str) -> Result<Cow<'a, str>, CatalogError> {
    let (encoding, skip) = match detect_encoding(input) {
        DetectedEncoding::Bom { encoding, len } => (encoding, len),
        DetectedEncoding::Guessed(encoding) => (encoding, 0),
        DetectedEncoding::Unsupported(name) => {
            return Err(CatalogError::parse(
                uri,
                format!("unsupported encoding {name}"),
            ));
        }
        DetectedEncoding::None => {
            let encoding = match declared_encoding(input) {
                Some(label) => Encoding::for_label(label).ok_or_else(|| {
                    CatalogError::parse(
                        uri,
                        format!(
                            "unsupported encoding {}",
                            String::from_utf8_lossy(label)
                        ),
                    )
                })?,
                None => UTF_8,
            };
            // A declaration naming UTF-16 without a BOM contradicts the bytes
            // that were just read as ASCII.
            if encoding.is_ascii_compatible() {
                (encoding, 0)
            } else {
                (UTF_8, 0)
            }
        }
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(&input[skip..])
        .ok_or_else(|| {
            CatalogError::parse(
                uri,
                format!("input is not valid {}", encoding.name()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_bom_and_guess() {
        assert_eq!(
            detect_encoding(b"\xEF\xBB\xBF<?xml"),
            DetectedEncoding::Bom {
                encoding: UTF_8,
                len: 3
            }
        );
        assert_eq!(
            detect_encoding(b"<\x00?\x00x\x00"),
            DetectedEncoding::Guessed(UTF_16LE)
        );
        assert_eq!(
            detect_encoding(b"\x00\x00\x00<"),
            DetectedEncoding::Unsupported("ISO-10646-UCS-4")
        );
        assert_eq!(detect_encoding(b"<catalog/>"), DetectedEncoding::None);
    }

    #[test]
    fn decode_declared_latin1() {
        let input = b"<?xml version='1.0' encoding='ISO-8859-1'?><a b='\xE9'/>";
        let decoded = decode_document(input, "file:///a.xml").unwrap();
        assert_eq!(decoded, "<?xml version='1.0' encoding='ISO-8859-1'?><a b='\u{e9}'/>");
    }

    #[test]
    fn decode_utf16_with_bom() {
        let mut input = vec![0xFF, 0xFE];
        for unit in "<a/>".encode_utf16() {
            input.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_document(&input, "file:///a.xml").unwrap(), "<a/>");
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            decode_document(b"<a>\xFF</a>", "file:///a.xml"),
            Err(CatalogError::Parse { .. })
        ));
        assert!(matches!(
            decode_document(b"<?xml version='1.0' encoding='x-unknown'?><a/>", "file:///a.xml"),
            Err(CatalogError::Parse { .. })
        ));
    }
}
