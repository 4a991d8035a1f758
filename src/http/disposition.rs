//! `Content-Disposition` header values (RFC 6266)
//!
//! A filename is reduced to its last path segment. Printable ASCII names go
//! into a quoted `filename` parameter as they are. Anything else gets a
//! `?`-substituted ASCII `filename` fallback plus an exact `filename*` in
//! RFC 5987 encoding, so the header stays ASCII on the wire.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 5987 `attr-char` complement
const ATTR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Build an `attachment` disposition for an optional file name or path
///
/// # Examples
/// ```
/// use respkit::http::disposition::content_disposition;
/// assert_eq!(content_disposition(None), "attachment");
/// assert_eq!(
///     content_disposition(Some("/path/to/image.png")),
///     "attachment; filename=\"image.png\""
/// );
/// ```
pub fn content_disposition(filename: Option<&str>) -> String {
    let Some(filename) = filename else {
        return "attachment".to_string();
    };

    let name = basename(filename);
    let fallback: String = name
        .chars()
        .map(|c| if is_ascii_printable(c) { c } else { '?' })
        .collect();
    let has_fallback = fallback != name;

    let mut header = String::from("attachment; filename=");
    header.push_str(&quote(&fallback));
    if has_fallback || has_hex_escape(name) {
        header.push_str("; filename*=UTF-8''");
        header.extend(utf8_percent_encode(name, ATTR));
    }
    header
}

/// Last `/`-separated segment, ignoring trailing slashes
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Characters a quoted `filename` carries unchanged
fn is_ascii_printable(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7e}')
}

fn has_hex_escape(name: &str) -> bool {
    name.as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit())
}
