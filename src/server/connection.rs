// Connection handling module
// Serves accepted TCP connections and turns hyper requests into dispatched responses

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use super::ServerState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::request::{RequestContext, RequestError};

/// Accept a connection unless the connection limit is reached
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<ServerState>) {
    // Increment first, then check the limit
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.settings.max_connections {
        if prev_count >= max_conn {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.settings.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve one connection on its own task, bounded by the configured timeouts
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<ServerState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let settings = &state.settings;
        let timeout = settings.read_timeout.max(settings.write_timeout);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(settings.read_timeout)
            .keep_alive(settings.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { Ok::<_, Infallible>(handle_request(req, peer_addr, &state).await) }
            }),
        );

        match tokio::time::timeout(timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout.as_secs()
            )),
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Collect, dispatch and access-log one request
pub async fn handle_request<B>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: &ServerState,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();

    let ctx = match RequestContext::collect(req, state.settings.max_body_size).await {
        Ok(ctx) => ctx,
        Err(err @ RequestError::BodyTooLarge { .. }) => {
            logger::log_warning(&format!("Rejected request from {peer_addr}: {err}"));
            return http::build_413_response();
        }
        Err(err) => return http::error_response(StatusCode::BAD_REQUEST, &err, false, true),
    };

    let mut entry = state
        .settings
        .access_log
        .then(|| AccessLogEntry::new(peer_addr.ip().to_string(), &ctx));

    let response = state.routes.dispatch(ctx).await;

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes =
            usize::try_from(response.body().size_hint().lower()).unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, state.settings.access_log_format);
    }

    response
}
