//! HTTP layer
//!
//! Response builders and the small helpers handlers reach for: JSON bodies,
//! error pages, redirects, plus the static-file plumbing (MIME types, `ETag`,
//! `Range`).

pub mod cache;
pub mod error;
pub mod json;
pub mod mime;
pub mod range;
pub mod redirect;
pub mod response;
pub mod writer;

pub use error::error_response;
pub use json::{json_response, JsonEscapeHtml};
pub use range::{parse_range_header, RangeParseResult};
pub use redirect::{redirect, resolve_location};
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_416_response, build_options_response, build_redirect_response_with_code,
};
pub use writer::ResponseWriter;
