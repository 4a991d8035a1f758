//! Response header collection
//!
//! Headers are kept in insertion order with the field name spelled as it was
//! first set; lookups are case-insensitive. A value is either a single string
//! or an ordered list of strings, each list element becoming its own header
//! line on the wire.
//!
//! Field-specific rules (the `Content-Type` charset and single-value
//! constraint, `Vary` merging) live here so every caller gets them.

use crate::error::ResponseError;
use crate::http::mime;

/// A header value: one string, or several emitted as separate lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Scalar(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// All values in order
    pub fn values(&self) -> &[String] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Multi(vs) => vs,
        }
    }

    /// The value when it is a single string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(v) => Some(v),
            Self::Multi(_) => None,
        }
    }

    /// Values joined with `", "`, the list form of a header
    pub fn joined(&self) -> String {
        self.values().join(", ")
    }

    /// Concatenate two values into one ordered `Multi`
    pub fn concat(self, other: Self) -> Self {
        let mut values = self.into_values();
        values.extend(other.into_values());
        Self::Multi(values)
    }

    fn into_values(self) -> Vec<String> {
        match self {
            Self::Scalar(v) => vec![v],
            Self::Multi(vs) => vs,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&String> for HeaderValue {
    fn from(value: &String) -> Self {
        Self::Scalar(value.clone())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValue {
    fn from(values: [&str; N]) -> Self {
        Self::Multi(values.iter().map(ToString::to_string).collect())
    }
}

#[derive(Debug, Clone)]
struct HeaderEntry {
    name: String,
    value: HeaderValue,
}

/// Ordered, case-insensitive header map
#[derive(Debug, Clone, Default)]
pub struct HeaderStore {
    entries: Vec<HeaderEntry>,
}

impl HeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field`, replacing any previous value
    ///
    /// `Content-Type` must be a single value and receives a `charset`
    /// parameter when its MIME type has a default one and none is given.
    pub fn set(&mut self, field: &str, value: impl Into<HeaderValue>) -> Result<(), ResponseError> {
        let mut value = value.into();
        if field.eq_ignore_ascii_case("content-type") {
            let HeaderValue::Scalar(content_type) = value else {
                return Err(ResponseError::ContentTypeArray);
            };
            value = HeaderValue::Scalar(with_charset(content_type));
        }

        validate(field, &value)?;

        match self.position(field) {
            Some(idx) => self.entries[idx].value = value,
            None => self.entries.push(HeaderEntry {
                name: field.to_string(),
                value,
            }),
        }
        Ok(())
    }

    /// Set a value computed by this crate, skipping validation
    pub(crate) fn insert_trusted(&mut self, field: &str, value: String) {
        let value = HeaderValue::Scalar(value);
        match self.position(field) {
            Some(idx) => self.entries[idx].value = value,
            None => self.entries.push(HeaderEntry {
                name: field.to_string(),
                value,
            }),
        }
    }

    /// Set every `(field, value)` pair in iteration order
    pub fn set_all<I, K, V>(&mut self, headers: I) -> Result<(), ResponseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<HeaderValue>,
    {
        for (field, value) in headers {
            self.set(field.as_ref(), value)?;
        }
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&HeaderValue> {
        self.position(field).map(|idx| &self.entries[idx].value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.position(field).is_some()
    }

    /// Append to `field`, flattening existing and new values in order
    pub fn append(&mut self, field: &str, value: impl Into<HeaderValue>) -> Result<(), ResponseError> {
        let value = value.into();
        let merged = match self.get(field) {
            Some(prev) => prev.clone().concat(value),
            None => value,
        };
        self.set(field, merged)
    }

    /// Add `field` to the `Vary` header
    ///
    /// Names already present (compared case-insensitively) are not repeated,
    /// and `*` replaces the whole list.
    pub fn vary(&mut self, field: &str) -> Result<(), ResponseError> {
        let current = self.get("Vary").map(HeaderValue::joined).unwrap_or_default();
        let merged = merge_vary(&current, field);
        if merged.is_empty() {
            return Ok(());
        }
        self.set("Vary", merged)
    }

    pub fn remove(&mut self, field: &str) -> Option<HeaderValue> {
        self.position(field).map(|idx| self.entries.remove(idx).value)
    }

    /// Iterate `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|e| (e.name.as_str(), &e.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(field))
    }
}

/// Append the default charset unless the value already names one
fn with_charset(content_type: String) -> String {
    if has_charset_param(&content_type) {
        return content_type;
    }
    match mime::charset(&content_type) {
        Some(cs) => format!("{content_type}; charset={}", cs.to_ascii_lowercase()),
        None => content_type,
    }
}

/// Matches `;\s*charset\s*=`, case-insensitively
fn has_charset_param(value: &str) -> bool {
    value.split(';').skip(1).any(|param| {
        let param = param.trim_start();
        param.len() >= 7
            && param.is_char_boundary(7)
            && param[..7].eq_ignore_ascii_case("charset")
            && param[7..].trim_start().starts_with('=')
    })
}

fn merge_vary(current: &str, field: &str) -> String {
    let mut fields: Vec<&str> = current
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.contains(&"*") {
        return "*".to_string();
    }

    for new in field.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if new == "*" {
            return "*".to_string();
        }
        if !fields.iter().any(|f| f.eq_ignore_ascii_case(new)) {
            fields.push(new);
        }
    }
    fields.join(", ")
}

fn validate(field: &str, value: &HeaderValue) -> Result<(), ResponseError> {
    if hyper::header::HeaderName::from_bytes(field.as_bytes()).is_err() {
        return Err(ResponseError::InvalidHeaderName(field.to_string()));
    }
    for v in value.values() {
        if hyper::header::HeaderValue::from_str(v).is_err() {
            return Err(ResponseError::InvalidHeaderValue {
                field: field.to_string(),
                value: v.clone(),
            });
        }
    }
    Ok(())
}
