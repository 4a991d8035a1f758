//! HTTP response helpers
//!
//! Protocol-level building blocks (header merging, negotiation, cookie
//! serialization, URL and filename encoding) plus the [`Response`] type that
//! combines them. Nothing here knows about the demo server.

pub mod accept;
pub mod cookie;
pub mod disposition;
pub mod download;
pub mod encode;
pub mod escape;
pub mod headers;
pub mod mime;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use cookie::{CookieOptions, CookiePriority, SameSite};
pub use download::DownloadOptions;
pub use headers::{HeaderStore, HeaderValue};
pub use request::Request;
pub use response::{FormatHandler, Formats, Response};
