//! respkit: response helpers for hyper services
//!
//! Header management, `Accept` negotiation, signed cookies, redirects and
//! file downloads on top of an owned [`Response`] that converts into a hyper
//! response.

pub mod config;
pub mod error;
pub mod http;
pub mod logger;

pub use error::{HttpError, ResponseError};
pub use http::{CookieOptions, DownloadOptions, Formats, Request, Response};
