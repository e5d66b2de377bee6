// Configuration types module
// Defines the configuration sections read at startup

use serde::Deserialize;

use crate::logger::AccessLogFormat;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub templates: TemplatesConfig,
    pub static_files: StaticFilesConfig,
    pub redirect: RedirectConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    #[serde(default)]
    pub access_log_format: AccessLogFormat,
    /// Access log file path (stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration, timeouts in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<usize>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub max_body_size: usize,
    /// Put error details in 500 bodies instead of the bare status text
    pub show_errors: bool,
}

/// Template loader configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TemplatesConfig {
    pub dir: String,
    pub cache_parsed: bool,
}

/// Static file mount
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    pub prefix: String,
    pub dir: String,
    pub index_files: Vec<String>,
}

/// Continuation parameter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedirectConfig {
    pub next_key: String,
}
