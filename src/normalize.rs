//! Normalization of the identifiers compared by the catalog matcher.
//!
//! - Public identifiers: XML Catalogs section 6.2.
//! - System identifiers and URI references: section 6.3.
//! - `urn:publicid:` URNs: section 6.4 (RFC 3151).

use std::borrow::Cow;

/// Prefix of a public identifier wrapped as a URN.
pub const URN_PUBLICID: &str = "urn:publicid:";

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Normalizes the Public Identifier.
///
/// All strings of white space are collapsed to a single space character and
/// leading and trailing white space is removed.
///
/// If `public_id` is already normalized, it is borrowed without allocation.
pub fn normalize_public_id(public_id: &str) -> Cow<'_, str> {
    let bytes = public_id.as_bytes();
    let normalized = bytes.first().is_none_or(|&b| !is_blank(b))
        && bytes.last().is_none_or(|&b| !is_blank(b))
        && !bytes
            .windows(2)
            .any(|w| is_blank(w[0]) && (w[0] != b' ' || is_blank(w[1])));
    if normalized {
        return Cow::Borrowed(public_id);
    }

    let mut ret = String::with_capacity(public_id.len());
    for token in public_id.split(|c: char| c.is_ascii() && is_blank(c as u8)) {
        if token.is_empty() {
            continue;
        }
        if !ret.is_empty() {
            ret.push(' ');
        }
        ret.push_str(token);
    }
    Cow::Owned(ret)
}

fn is_disallowed_uri_byte(b: u8) -> bool {
    b <= 0x20
        || b >= 0x7F
        || matches!(b, b'"' | b'<' | b'>' | b'\\' | b'^' | b'`' | b'{' | b'|' | b'}')
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Normalizes a system identifier or a URI reference.
///
/// The identifier is trimmed, then every byte of its UTF-8 representation that
/// is a control character, a space, a non-ASCII byte or one of
/// `" < > \ ^ ` { | }` is replaced by its `%XX` escape with uppercase hex digits.
pub fn normalize_uri(uri: &str) -> Cow<'_, str> {
    let uri = uri.trim();
    if !uri.bytes().any(is_disallowed_uri_byte) {
        return Cow::Borrowed(uri);
    }

    let mut ret = String::with_capacity(uri.len() + 8);
    for b in uri.bytes() {
        if is_disallowed_uri_byte(b) {
            ret.push('%');
            ret.push(HEX_DIGITS[(b >> 4) as usize] as char);
            ret.push(HEX_DIGITS[(b & 0x0F) as usize] as char);
        } else {
            ret.push(b as char);
        }
    }
    Cow::Owned(ret)
}

/// Check if `id` is a URN in the `publicid` namespace.
pub fn is_urn(id: &str) -> bool {
    id.get(..URN_PUBLICID.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(URN_PUBLICID))
}

/// Wrap a public identifier as a `urn:publicid:` URN.
///
/// The identifier is normalized first.
pub fn encode_urn(public_id: &str) -> String {
    let public_id = normalize_public_id(public_id);
    let mut urn = String::with_capacity(URN_PUBLICID.len() + public_id.len() + 8);
    urn.push_str(URN_PUBLICID);
    let mut rest = public_id.as_ref();
    while let Some(c) = rest.chars().next() {
        if let Some(r) = rest.strip_prefix("::") {
            urn.push(';');
            rest = r;
            continue;
        }
        if let Some(r) = rest.strip_prefix("//") {
            urn.push(':');
            rest = r;
            continue;
        }
        match c {
            ' ' => urn.push('+'),
            '+' => urn.push_str("%2B"),
            ':' => urn.push_str("%3A"),
            '/' => urn.push_str("%2F"),
            ';' => urn.push_str("%3B"),
            '\'' => urn.push_str("%27"),
            '?' => urn.push_str("%3F"),
            '#' => urn.push_str("%23"),
            '%' => urn.push_str("%25"),
            c => urn.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    urn
}

/// Expand a `urn:publicid:` URN into the equivalent public identifier.
///
/// Identifiers that are not such URNs are returned unchanged. Percent
/// escapes other than the ones produced by [`encode_urn`] are kept verbatim.
pub fn decode_urn(urn: &str) -> Cow<'_, str> {
    if !is_urn(urn) {
        return Cow::Borrowed(urn);
    }
    let mut rest = &urn[URN_PUBLICID.len()..];
    let mut ret = String::with_capacity(rest.len());
    while let Some(c) = rest.chars().next() {
        let mut consumed = c.len_utf8();
        match c {
            '+' => ret.push(' '),
            ':' => ret.push_str("//"),
            ';' => ret.push_str("::"),
            '%' => {
                let decoded = match rest.as_bytes().get(1..3) {
                    Some(b"2B") | Some(b"2b") => Some('+'),
                    Some(b"3A") | Some(b"3a") => Some(':'),
                    Some(b"2F") | Some(b"2f") => Some('/'),
                    Some(b"3B") | Some(b"3b") => Some(';'),
                    Some(b"27") => Some('\''),
                    Some(b"3F") | Some(b"3f") => Some('?'),
                    Some(b"23") => Some('#'),
                    Some(b"25") => Some('%'),
                    _ => None,
                };
                if let Some(decoded) = decoded {
                    ret.push(decoded);
                    consumed = 3;
                } else {
                    ret.push('%');
                }
            }
            c => ret.push(c),
        }
        rest = &rest[consumed..];
    }
    Cow::Owned(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_IDS: &[&str] = &[
        "-//OASIS//DTD DocBook XML V4.1.2//EN",
        "ISO/IEC 10179:1996//DTD DSSSL Architecture//EN",
        "-//W3C//DTD XHTML 1.0 Strict//EN",
        "+//IDN example.org//DTD a::b//EN",
        "-//A;B//DTD 50% 'q'? #1//EN",
        "a:::b///c",
        "",
    ];

    #[test]
    fn normalize_public_id_collapses_whitespace() {
        assert_eq!(
            normalize_public_id("  -//OASIS//DTD\t\tDocBook\r\nXML V4.1.2//EN \n"),
            "-//OASIS//DTD DocBook XML V4.1.2//EN"
        );
        assert!(matches!(
            normalize_public_id("-//OASIS//DTD DocBook XML V4.1.2//EN"),
            Cow::Borrowed(_)
        ));
        assert_eq!(normalize_public_id("a  b"), "a b");
        assert_eq!(normalize_public_id("a\tb"), "a b");
        assert_eq!(normalize_public_id(" \t "), "");
        assert_eq!(normalize_public_id(""), "");
    }

    #[test]
    fn normalize_public_id_is_idempotent() {
        for id in PUBLIC_IDS
            .iter()
            .copied()
            .chain([" a \t b ", "\n\nx\r\ny  z"])
        {
            let once = normalize_public_id(id);
            assert_eq!(normalize_public_id(&once), once, "{id:?}");
        }
    }

    #[test]
    fn normalize_uri_escapes() {
        assert_eq!(
            normalize_uri(" http://example.com/a b.dtd "),
            "http://example.com/a%20b.dtd"
        );
        assert_eq!(
            normalize_uri("http://example.com/{x}|\"<>\\^`"),
            "http://example.com/%7Bx%7D%7C%22%3C%3E%5C%5E%60"
        );
        assert_eq!(normalize_uri("file:///caf\u{e9}"), "file:///caf%C3%A9");
        assert_eq!(normalize_uri("a\u{7F}b"), "a%7Fb");
        assert_eq!(normalize_uri("a%20b"), "a%20b");
        assert!(matches!(normalize_uri("http://x/a.dtd"), Cow::Borrowed(_)));
        let once = normalize_uri("http://x/\u{e9} \u{1F47E}");
        assert_eq!(normalize_uri(&once), once);
    }

    #[test]
    fn urn_examples() {
        assert_eq!(
            encode_urn("ISO/IEC 10179:1996//DTD DSSSL Architecture//EN"),
            "urn:publicid:ISO%2FIEC+10179%3A1996:DTD+DSSSL+Architecture:EN"
        );
        assert_eq!(
            decode_urn("urn:publicid:-:OASIS:DTD+DocBook+XML+V4.1.2:EN"),
            "-//OASIS//DTD DocBook XML V4.1.2//EN"
        );
        assert_eq!(decode_urn("urn:publicid:a;b"), "a::b");
        assert_eq!(decode_urn("urn:publicid:a%41b"), "a%41b");
        assert_eq!(decode_urn("http://x/a.dtd"), "http://x/a.dtd");
        assert!(is_urn("URN:PUBLICID:x"));
        assert!(!is_urn("urn:isbn:0451450523"));
    }

    #[test]
    fn urn_round_trip() {
        for id in PUBLIC_IDS.iter().copied().chain(["  -//A//B  C//EN "]) {
            let urn = encode_urn(id);
            assert!(is_urn(&urn));
            assert_eq!(decode_urn(&urn), normalize_public_id(id), "{id:?} -> {urn}");
        }
    }
}
