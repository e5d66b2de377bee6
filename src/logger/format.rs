//! Access log lines
//!
//! - `combined`: Apache/Nginx combined format
//! - `common`: Common Log Format
//! - `json`: one JSON object per line

use chrono::{DateTime, Local};
use hyper::header::{REFERER, USER_AGENT};
use hyper::Version;
use serde::{Deserialize, Serialize};

use crate::request::RequestContext;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLogFormat {
    #[default]
    Combined,
    Common,
    Json,
}

/// One served request
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    #[serde(serialize_with = "rfc3339")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub http_version: &'static str,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Entry for `req`, stamped now; status and sizes are filled in later
    pub fn new(remote_addr: impl Into<String>, req: &RequestContext) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            time: Local::now(),
            method: req.method().to_string(),
            path: req.path().to_string(),
            query: req.uri().query().map(str::to_string),
            http_version: version_str(req.version()),
            status: 200,
            body_bytes: 0,
            referer: req.header(REFERER.as_str()).map(str::to_string),
            user_agent: req.header(USER_AGENT.as_str()).map(str::to_string),
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: AccessLogFormat) -> String {
        match format {
            AccessLogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            AccessLogFormat::Common => self.format_common(),
            AccessLogFormat::Json => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        let query = self
            .query
            .as_ref()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!(
            "{} - - [{}] \"{} {}{query} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.method,
            self.path,
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }
}

fn rfc3339<S: serde::Serializer>(time: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

const fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Bytes;
    use hyper::Request;

    fn entry() -> AccessLogEntry {
        let req: RequestContext = Request::builder()
            .uri("/account?tab=orders")
            .header("referer", "https://example.com/")
            .header("user-agent", "Mozilla/5.0")
            .body(Bytes::new())
            .unwrap()
            .into();
        let mut entry = AccessLogEntry::new("192.168.1.1", &req);
        entry.status = 302;
        entry.body_bytes = 14;
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = entry().format(AccessLogFormat::Combined);
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /account?tab=orders HTTP/1.1\" 302 14"));
        assert!(log.ends_with("\"https://example.com/\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_common() {
        let log = entry().format(AccessLogFormat::Common);
        assert!(log.ends_with("\"GET /account?tab=orders HTTP/1.1\" 302 14"));
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn test_format_json() {
        let log = entry().format(AccessLogFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["query"], "tab=orders");
        assert_eq!(value["status"], 302);
        assert_eq!(value["request_time_us"], 1500);
        assert!(value["time"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_format_names() {
        let format: AccessLogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, AccessLogFormat::Json);
        assert_eq!(AccessLogFormat::default(), AccessLogFormat::Combined);
    }
}
