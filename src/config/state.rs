// Application state module
// Shared, read-only state handed to every connection

use super::types::Config;
use crate::http::DownloadOptions;

/// Application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Download options built once from `config.download`
    pub download: DownloadOptions,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            download: config.download.options(),
        }
    }

    /// Secret used to sign and verify cookies
    pub fn cookie_secret(&self) -> Option<&str> {
        self.config.cookies.secret.as_deref()
    }
}
