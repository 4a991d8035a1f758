//! Percent-encoding helpers
//!
//! `encode_url` is the selective encoder used for `Location`: it leaves the
//! URL structure alone and only encodes characters that may not appear in a
//! URL, without touching `%XX` sequences that are already encoded.
//! `encode_component` encodes everything except the unreserved marks, the
//! way cookie values are written.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

/// Characters `encode_url` encodes besides controls and non-ASCII
const URL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Selectively percent-encode a URL
///
/// # Examples
/// ```
/// use respkit::http::encode::encode_url;
/// assert_eq!(encode_url("/a b?c=%20&d=%zz"), "/a%20b?c=%20&d=%25zz");
/// ```
pub fn encode_url(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        out.extend(utf8_percent_encode(&url[start..i], URL));
        if is_escape(bytes, i) {
            out.push_str(&url[i..i + 3]);
            i += 3;
        } else {
            out.push_str("%25");
            i += 1;
        }
        start = i;
    }
    out.extend(utf8_percent_encode(&url[start..], URL));
    out
}

/// Percent-encode a URI component (cookie values, link parameters)
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn is_escape(bytes: &[u8], at: usize) -> bool {
    bytes.len() > at + 2 && bytes[at + 1].is_ascii_hexdigit() && bytes[at + 2].is_ascii_hexdigit()
}
