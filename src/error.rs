//! Error types for response operations
//!
//! `ResponseError` covers caller misuse and download I/O failures and is
//! returned at the offending call. `HttpError` is the structured failure
//! handed to the error callback of content negotiation.

use hyper::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by response operations
#[derive(Debug, Error)]
pub enum ResponseError {
    /// `Content-Type` was given more than one value.
    #[error("Content-Type cannot be set to an Array")]
    ContentTypeArray,

    /// A signed cookie was requested but the request carries no secret.
    #[error("cookieParser(\"secret\") required for signed cookies")]
    SecretRequired,

    #[error("argument name is invalid: {0:?}")]
    InvalidCookieName(String),

    /// A cookie `path` or `domain` would break out of its attribute.
    #[error("option {0} is invalid")]
    InvalidCookieOption(&'static str),

    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {field}: {value:?}")]
    InvalidHeaderValue { field: String, value: String },

    #[error("failed to serialize JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The resolved path escapes the configured root.
    #[error("forbidden path: {}", .0.display())]
    Forbidden(PathBuf),

    #[error("EISDIR, read '{}'", .0.display())]
    IsDirectory(PathBuf),

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResponseError {
    /// HTTP status a caller would normally answer with for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured HTTP failure passed to negotiation error callbacks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
    /// Types that were on offer when negotiation failed
    pub types: Vec<String>,
}

impl HttpError {
    pub fn not_acceptable(types: Vec<String>) -> Self {
        Self {
            status: StatusCode::NOT_ACCEPTABLE,
            message: "Not Acceptable".to_string(),
            types,
        }
    }
}
