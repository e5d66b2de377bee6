// Configuration module entry point
// Loads the demo server configuration from file, environment and defaults

mod types;

use std::net::SocketAddr;

pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, RedirectConfig, ServerConfig,
    StaticFilesConfig, TemplatesConfig,
};

use crate::next::DEFAULT_NEXT_KEY;

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. `PAGETOOLS_<SECTION>__<KEY>` environment
    /// variables override it, e.g. `PAGETOOLS_SERVER__PORT=9000`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PAGETOOLS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("http.show_errors", false)?
            .set_default("templates.dir", "templates")?
            .set_default("templates.cache_parsed", false)?
            .set_default("static_files.prefix", "/static")?
            .set_default("static_files.dir", "public")?
            .set_default("static_files.index_files", vec!["index.html", "index.htm"])?
            .set_default("redirect.next_key", DEFAULT_NEXT_KEY)?
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
    use crate::logger::AccessLogFormat;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let config = Config::load_from(missing.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.access_log_format, AccessLogFormat::Combined);
        assert_eq!(config.http.max_body_size, 1_048_576);
        assert!(!config.templates.cache_parsed);
        assert_eq!(config.static_files.index_files, ["index.html", "index.htm"]);
        assert_eq!(config.redirect.next_key, "next");
        assert_eq!(config.get_socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9001
workers = 2

[logging]
access_log_format = "json"

[templates]
cache_parsed = true

[redirect]
next_key = "return_to"
"#,
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.logging.access_log_format, AccessLogFormat::Json);
        assert!(config.templates.cache_parsed);
        assert_eq!(config.redirect.next_key, "return_to");
        assert_eq!(config.templates.dir, "templates");
    }

    #[test]
    fn test_invalid_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        config.server.host = "not a host".to_string();
        assert!(config.get_socket_addr().is_err());
    }
}
