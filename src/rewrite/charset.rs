//! Document character encoding detection.
//!
//! The declared `Content-Type` charset wins, then a `<meta charset>` /
//! `http-equiv` declaration near the top of the body, then UTF-8.
//! Encodings the streaming rewriter cannot parse (UTF-16 and friends) fall
//! back to UTF-8.

use encoding_rs::{Encoding, UTF_8};
use lol_html::AsciiCompatibleEncoding;

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SCAN_BYTES: usize = 1024;

/// Encoding of an HTML document as served.
pub fn document_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(body));

    declared
        .and_then(|label| Encoding::for_label_no_replacement(label.as_bytes()))
        .filter(|encoding| encoding.is_ascii_compatible())
        .unwrap_or(UTF_8)
}

/// The rewriter-side form of [`document_encoding`].
pub fn rewriter_encoding(encoding: &'static Encoding) -> AsciiCompatibleEncoding {
    AsciiCompatibleEncoding::new(encoding).unwrap_or_else(AsciiCompatibleEncoding::utf_8)
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (name, value) = part.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!label.is_empty()).then(|| label.to_string())
    })
}

fn charset_from_meta(body: &[u8]) -> Option<String> {
    let prefix = &body[..body.len().min(META_SCAN_BYTES)];
    let lower = prefix.to_ascii_lowercase();
    let start = find(&lower, b"charset=")? + b"charset=".len();

    let rest = &prefix[start..];
    let rest = rest.strip_prefix(b"\"").or_else(|| rest.strip_prefix(b"'")).unwrap_or(rest);
    let end = rest
        .iter()
        .position(|b| b.is_ascii_whitespace() || matches!(b, b'"' | b'\'' | b';' | b'>' | b'/'))
        .unwrap_or(rest.len());

    let label = std::str::from_utf8(&rest[..end]).ok()?.trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
