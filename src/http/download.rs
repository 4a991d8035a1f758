//! File downloads
//!
//! [`Response::download`] reads a whole file into an in-memory body and marks
//! it as an attachment. `Content-Disposition` is committed before any I/O so a
//! failed read still leaves it on the response.

use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use crate::error::ResponseError;
use crate::http::cookie::http_date;
use crate::http::mime;
use crate::http::response::Response;

/// Read buffer size used when none is configured
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Directory `path` is resolved against; paths may not leave it
    pub root: Option<PathBuf>,
    /// Extra headers; a `Content-Disposition` here is ignored
    pub headers: Vec<(String, String)>,
    /// Size of each read from the file. The body is still collected in full
    /// before it is set, so this bounds syscall size, not memory use.
    pub chunk_size: Option<usize>,
}

impl DownloadOptions {
    fn chunk_size(&self) -> usize {
        self.chunk_size
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CHUNK_SIZE)
    }
}

impl Response {
    /// Send the file at `path` as an attachment
    ///
    /// The attachment is named `filename`, or the last segment of `path`.
    /// `Content-Type` is inferred from the extension unless already set.
    pub async fn download(
        &mut self,
        path: &str,
        filename: Option<&str>,
        options: &DownloadOptions,
    ) -> Result<&mut Self, ResponseError> {
        for (field, value) in &options.headers {
            if field.eq_ignore_ascii_case("content-disposition") {
                continue;
            }
            self.set_header(field, value)?;
        }
        self.attachment(Some(filename.unwrap_or(path)))?;

        let result = self.send_file(path, options).await;
        if let Err(err) = &result {
            tracing::warn!(path = %path, error = %err, "download failed");
        }
        result
    }

    async fn send_file(
        &mut self,
        path: &str,
        options: &DownloadOptions,
    ) -> Result<&mut Self, ResponseError> {
        let full_path = resolve(path, options.root.as_deref()).await?;

        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|source| io_error(&full_path, source))?;
        if metadata.is_dir() {
            return Err(ResponseError::IsDirectory(full_path));
        }

        let body = read_chunked(&full_path, metadata.len(), options.chunk_size()).await?;
        tracing::debug!(path = %full_path.display(), bytes = body.len(), "download read");

        if !self.headers().contains("Content-Type") {
            let extension = full_path.extension().and_then(|e| e.to_str());
            self.set_header("Content-Type", mime::content_type_for(extension))?;
        }
        if let Ok(modified) = metadata.modified() {
            self.set_header("Last-Modified", http_date(DateTime::<Utc>::from(modified)))?;
        }
        Ok(self.send(body))
    }
}

/// Resolve `path` against `root`, rejecting anything that escapes it
async fn resolve(path: &str, root: Option<&Path>) -> Result<PathBuf, ResponseError> {
    let Some(root) = root else {
        return Ok(PathBuf::from(path));
    };

    let relative = Path::new(path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(ResponseError::Forbidden(relative.to_path_buf()));
    }

    let root = fs::canonicalize(root)
        .await
        .map_err(|source| io_error(root, source))?;
    let joined = root.join(relative);
    let canonical = fs::canonicalize(&joined)
        .await
        .map_err(|source| io_error(&joined, source))?;
    if !canonical.starts_with(&root) {
        return Err(ResponseError::Forbidden(canonical));
    }
    Ok(canonical)
}

async fn read_chunked(path: &Path, len: u64, chunk_size: usize) -> Result<Vec<u8>, ResponseError> {
    let mut file = File::open(path)
        .await
        .map_err(|source| io_error(path, source))?;

    let mut body = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let n = file
            .read(&mut chunk)
            .await
            .map_err(|source| io_error(path, source))?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(body)
}

fn io_error(path: &Path, source: std::io::Error) -> ResponseError {
    ResponseError::Io {
        path: path.to_path_buf(),
        source,
    }
}
