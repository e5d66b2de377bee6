//! Helpers for hyper request handlers.
//!
//! - [`template::Loader`] renders Tera templates with a layered context
//!   (explicit values, a per-loader default context, then `url` and
//!   `cachets`) and routes missing templates to an optional handler.
//! - [`NextUrl`] carries a same-origin continuation path through an
//!   intermediate page such as a login form.
//! - [`file_server`] mounts a static directory on any [`Router`].
//! - [`http::json_response`] and [`http::error_response`] build JSON and
//!   plain-text error responses.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod next;
pub mod request;
pub mod server;
pub mod template;

pub use error::ConfigError;
pub use handler::{file_server, handler, Handler, RouteTable, Router, StaticRoot};
pub use http::writer::ResponseWriter;
pub use next::NextUrl;
pub use request::RequestContext;
pub use template::{Loader, LoaderConfig, RenderContext, RenderError, RenderOutcome};
