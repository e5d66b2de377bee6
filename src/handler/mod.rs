//! Request handlers
//!
//! Routing glue ([`Router`], [`RouteTable`]) and the static file server that
//! mounts onto it.

pub mod router;
pub mod static_files;

pub use router::{handler, Handler, HandlerFuture, RouteTable, Router};
pub use static_files::{file_server, StaticRoot};
