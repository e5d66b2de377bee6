//! Tera template loading and rendering
//!
//! A [`Loader`] is built once at startup and shared behind an `Arc`. Each
//! render resolves the named template (plus whatever it extends, includes or
//! imports), layers the render context and streams the output into a
//! [`ResponseWriter`](crate::http::writer::ResponseWriter).
//!
//! Context precedence, highest first:
//!
//! 1. values passed to the render call
//! 2. values from the loader's default-context function
//! 3. `url` (request path) and `cachets` (loader creation time, Unix seconds),
//!    injected only when still absent
//!
//! `cachets` is handy for cache-busting assets across restarts:
//! `<link rel="stylesheet" href="/static/site.css?v={{ cachets }}">`.

mod deps;
mod error;
mod filters;
mod loader;
mod source;

pub use error::{error_chain, RenderError};
pub use loader::{DefaultCtxFn, ErrorSink, Loader, LoaderConfig, NotFoundFn, RenderOutcome};
pub use source::{DirSource, FnSource, LoaderFn, TemplateSource};

/// Variables available to a template
pub type RenderContext = serde_json::Map<String, serde_json::Value>;

pub const URL_KEY: &str = "url";
pub const CACHETS_KEY: &str = "cachets";
