//! Request handler module
//!
//! Demo routes showing the response helpers behind a real hyper server.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
