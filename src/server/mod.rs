// Server module entry point
// Accept loop, per-connection serving and shutdown handling for the demo server

pub mod connection;
pub mod listener;
mod signal;

use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

pub use listener::create_reusable_listener;

use crate::config::Config;
use crate::handler::RouteTable;
use crate::logger::{self, AccessLogFormat};

/// Connection and request limits
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub keep_alive: bool,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_connections: Option<usize>,
    pub max_body_size: usize,
    pub access_log: bool,
    pub access_log_format: AccessLogFormat,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            keep_alive: true,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_connections: None,
            max_body_size: 1_048_576,
            access_log: true,
            access_log_format: AccessLogFormat::Combined,
        }
    }
}

impl From<&Config> for ServerSettings {
    fn from(config: &Config) -> Self {
        Self {
            keep_alive: config.performance.keep_alive_timeout > 0,
            read_timeout: Duration::from_secs(config.performance.read_timeout),
            write_timeout: Duration::from_secs(config.performance.write_timeout),
            max_connections: config.performance.max_connections,
            max_body_size: config.http.max_body_size,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format,
        }
    }
}

/// State shared by every connection task
#[derive(Debug)]
pub struct ServerState {
    pub routes: RouteTable,
    pub settings: ServerSettings,
    pub active_connections: AtomicUsize,
}

impl ServerState {
    pub fn new(routes: RouteTable, settings: ServerSettings) -> Self {
        Self {
            routes,
            settings,
            active_connections: AtomicUsize::new(0),
        }
    }
}

/// Accept connections until SIGINT or SIGTERM
///
/// In-flight connections keep running on their own tasks until the runtime
/// shuts down.
pub async fn run(listener: TcpListener, state: Arc<ServerState>) -> io::Result<()> {
    let shutdown = signal::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => connection::accept_connection(stream, peer_addr, &state),
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            signal = &mut shutdown => {
                logger::log_info(&format!("{} received, shutting down", signal?));
                return Ok(());
            }
        }
    }
}
