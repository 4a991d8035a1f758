//! Request view consumed by response operations
//!
//! Only what the response helpers read: method, URI, headers and the cookie
//! signing secret supplied by whatever parsed the request.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, Uri};

#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    secret: Option<String>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            secret: None,
        }
    }

    /// Build from the head of a hyper request
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            secret: None,
        }
    }

    /// Add a header, ignoring names or values hyper would reject
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Secret used to sign cookies for this request
    #[must_use]
    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret;
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Case-insensitive header lookup
    ///
    /// `Referer` and `Referrer` are interchangeable; `Referrer` is preferred
    /// when both are present.
    pub fn get(&self, field: &str) -> Option<&str> {
        if field.eq_ignore_ascii_case("referer") || field.eq_ignore_ascii_case("referrer") {
            return self.header_str("referrer").or_else(|| self.header_str("referer"));
        }
        self.header_str(field)
    }

    fn header_str(&self, field: &str) -> Option<&str> {
        self.headers.get(field).and_then(|v| v.to_str().ok())
    }
}
