//! Route registration and dispatch
//!
//! [`Router`] is the one capability the helpers need from a router: register
//! a GET handler for a pattern. [`RouteTable`] is a small implementation of it
//! used by the demo server. A pattern is either an exact path or a prefix
//! ending in `*`; the longest matching prefix wins and exact paths beat
//! prefixes.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response};

use crate::http;
use crate::logger;
use crate::request::RequestContext;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Response<Full<Bytes>>> + Send>>;

/// Shared async request handler
pub type Handler = Arc<dyn Fn(RequestContext) -> HandlerFuture + Send + Sync>;

/// Wrap an async function or closure as a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Full<Bytes>>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Anything that can register a GET handler for a path pattern
pub trait Router {
    fn get(&mut self, pattern: &str, handler: Handler);
}

#[derive(Clone, Default)]
struct Routes {
    exact: HashMap<String, Handler>,
    prefix: Vec<(String, Handler)>,
}

impl Routes {
    fn insert(&mut self, pattern: &str, handler: Handler) {
        match pattern.strip_suffix('*') {
            Some(prefix) => {
                self.prefix.retain(|(p, _)| p != prefix);
                self.prefix.push((prefix.to_string(), handler));
            }
            None => {
                self.exact.insert(pattern.to_string(), handler);
            }
        }
    }

    fn find(&self, path: &str) -> Option<&Handler> {
        self.exact.get(path).or_else(|| {
            self.prefix
                .iter()
                .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, handler)| handler)
        })
    }

    fn len(&self) -> usize {
        self.exact.len() + self.prefix.len()
    }
}

/// GET (and HEAD) plus POST routes
#[derive(Clone, Default)]
pub struct RouteTable {
    get: Routes,
    post: Routes,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) {
        self.post.insert(pattern, handler);
    }

    /// Handler for `method` and `path`, if any
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&Handler> {
        match *method {
            Method::GET | Method::HEAD => self.get.find(path),
            Method::POST => self.post.find(path),
            _ => None,
        }
    }

    /// Route `req` to its handler
    ///
    /// OPTIONS gets 204 with `Allow`, methods without routes get 405 and
    /// unmatched paths 404.
    pub async fn dispatch(&self, req: RequestContext) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        if method == Method::OPTIONS {
            return http::build_options_response();
        }

        if let Some(handler) = self.lookup(&method, req.path()) {
            return handler(req).await;
        }

        let routed_elsewhere = match method {
            Method::GET | Method::HEAD => self.post.find(req.path()).is_some(),
            Method::POST => self.get.find(req.path()).is_some(),
            _ => true,
        };
        if routed_elsewhere {
            logger::log_warning(&format!("Method not allowed: {method} {}", req.path()));
            http::build_405_response()
        } else {
            http::build_404_response()
        }
    }
}

impl Router for RouteTable {
    fn get(&mut self, pattern: &str, handler: Handler) {
        self.get.insert(pattern, handler);
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("get", &self.get.len())
            .field("post", &self.post.len())
            .finish()
    }
}
