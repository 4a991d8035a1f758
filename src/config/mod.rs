// Configuration module entry point
// Loads layered configuration: defaults, optional file, environment

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, CookieConfig, DownloadConfig, HttpConfig, LogFormat, LoggingConfig,
    PerformanceConfig, RedirectRoute, RoutesConfig, ServerConfig,
};

/// Default config file name, without extension
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path
    /// Environment variables prefixed `RESPKIT_` override the file,
    /// with `__` separating sections (`RESPKIT_SERVER__PORT=9000`)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("RESPKIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "plain")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("http.server_name", "respkit/0.1")?
            .set_default("download.root", "public")?
            .set_default("download.chunk_size", 65_536)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::SameSite;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let config = Config::load_from(missing.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Plain);
        assert_eq!(config.download.chunk_size, 65_536);
        assert!(config.cookies.secret.is_none());
        assert!(config.routes.redirects.is_empty());
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("respkit.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[logging]
format = "json"

[cookies]
secret = "keyboard cat"

[cookies.defaults]
http_only = true
same_site = "lax"
max_age = 3600000

[download]
root = "/srv/files"

[[routes.redirects]]
path = "/old"
target = "/new"
code = 301

[[routes.redirects]]
path = "/docs"
target = "https://example.com/docs"
"#
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.cookies.secret.as_deref(), Some("keyboard cat"));
        assert!(config.cookies.defaults.http_only);
        assert_eq!(config.cookies.defaults.same_site, Some(SameSite::Lax));
        assert_eq!(config.cookies.defaults.max_age, Some(3_600_000));

        let options = config.download.options();
        assert_eq!(options.root.as_deref(), Some(std::path::Path::new("/srv/files")));
        assert_eq!(options.chunk_size, Some(65_536));

        assert_eq!(
            config.routes.redirects,
            vec![
                RedirectRoute {
                    path: "/old".to_string(),
                    target: "/new".to_string(),
                    code: 301,
                },
                RedirectRoute {
                    path: "/docs".to_string(),
                    target: "https://example.com/docs".to_string(),
                    code: 302,
                },
            ]
        );
    }

    #[test]
    fn test_invalid_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path().join("none").to_str().unwrap()).unwrap();
        config.server.host = "not a host".to_string();
        assert!(config.get_socket_addr().is_err());
    }
}
