//! MIME type lookup module
//!
//! Resolves file extensions and shorthand type names (`html`, `json`) to
//! MIME types, and infers the default charset of a MIME type.

/// Get the MIME type for a file extension, without a charset parameter
///
/// # Examples
/// ```
/// use respkit::http::mime::lookup;
/// assert_eq!(lookup("html"), Some("text/html"));
/// assert_eq!(lookup(".MP4"), Some("video/mp4"));
/// assert_eq!(lookup("xyz"), None);
/// ```
pub fn lookup(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let mime = match ext.as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // JavaScript/WASM
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "bin" => "application/octet-stream",

        _ => return None,
    };
    Some(mime)
}

/// Default charset for a MIME type, if it has one
///
/// Parameters after `;` are ignored.
pub fn charset(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if essence.starts_with("text/")
        || essence == "application/javascript"
        || essence == "application/json"
    {
        Some("UTF-8")
    } else {
        None
    }
}

/// Turn a shorthand type name into a full MIME type
///
/// Values that already contain a `/` are returned unchanged; unknown
/// shorthands fall back to `application/octet-stream`.
pub fn normalize_type(value: &str) -> String {
    if value.contains('/') {
        value.to_string()
    } else {
        lookup(value).unwrap_or("application/octet-stream").to_string()
    }
}

/// Content-Type for a file extension, charset included where one applies
pub fn content_type_for(extension: Option<&str>) -> String {
    let mime = extension.and_then(lookup).unwrap_or("application/octet-stream");
    match charset(mime) {
        Some(cs) => format!("{mime}; charset={}", cs.to_ascii_lowercase()),
        None => mime.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(lookup("html"), Some("text/html"));
        assert_eq!(lookup("css"), Some("text/css"));
        assert_eq!(lookup("js"), Some("application/javascript"));
        assert_eq!(lookup(".json"), Some("application/json"));
        assert_eq!(lookup("PNG"), Some("image/png"));
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(lookup("xyz"), None);
        assert_eq!(content_type_for(Some("xyz")), "application/octet-stream");
        assert_eq!(content_type_for(None), "application/octet-stream");
    }

    #[test]
    fn test_charset() {
        assert_eq!(charset("text/html"), Some("UTF-8"));
        assert_eq!(charset("application/json; foo=bar"), Some("UTF-8"));
        assert_eq!(charset("image/png"), None);
        assert_eq!(content_type_for(Some("txt")), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("html"), "text/html");
        assert_eq!(normalize_type("text"), "text/plain");
        assert_eq!(normalize_type("application/vnd.api+json"), "application/vnd.api+json");
        assert_eq!(normalize_type("nope"), "application/octet-stream");
    }
}
