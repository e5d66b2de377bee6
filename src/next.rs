//! "Next URL" continuation helpers
//!
//! A handler that interrupts the user (typically to log in) passes the page
//! they wanted as `?next=/some/page`; once the intermediate step is done the
//! handler sends them back there. Only same-origin paths are ever returned,
//! so the parameter cannot be used as an open redirect.
//!
//! Forwarding the parameter from a template:
//!
//! ```text
//! <a href="/login{% if url != '/' %}?next={{ url | urlencode }}{% endif %}">Log in</a>
//! <input type="hidden" name="next" value="{{ next }}">
//! ```

use std::borrow::Cow;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::form_urlencoded;

use crate::http::redirect;
use crate::request::RequestContext;

/// Parameter name used when none is configured
pub const DEFAULT_NEXT_KEY: &str = "next";

/// Reads and writes the continuation parameter under a configured name
///
/// The name is used both as the query-string key and the form-field key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextUrl {
    key: String,
}

impl Default for NextUrl {
    fn default() -> Self {
        Self::new(DEFAULT_NEXT_KEY)
    }
}

impl NextUrl {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Continuation path requested by `req`, or `""` when there is none or it
    /// is not a safe same-origin path.
    ///
    /// The query string is consulted first, then the merged form values.
    /// The value is unescaped once more before checking; when that decoding
    /// succeeds its result is final, and only a value that cannot be decoded
    /// is checked as-is.
    pub fn resolve(&self, req: &RequestContext) -> String {
        // A broken form only means there is no continuation to read from it
        let _ = req.parse_form();

        let raw = match req.query_value(&self.key) {
            Some(value) if !value.is_empty() => value,
            _ => req.form_value(&self.key).unwrap_or_default().to_string(),
        };
        if raw.is_empty() {
            return raw;
        }

        match query_unescape(&raw) {
            Ok(decoded) if is_local_path(&decoded) => decoded,
            Ok(_) => String::new(),
            Err(_) if is_local_path(&raw) => raw,
            Err(_) => String::new(),
        }
    }

    /// [`resolve`](Self::resolve), falling back to `default` when empty
    pub fn resolve_or(&self, req: &RequestContext, default: &str) -> String {
        let next = self.resolve(req);
        if next.is_empty() {
            default.to_string()
        } else {
            next
        }
    }

    /// `target` with the continuation appended as a query parameter
    ///
    /// ```
    /// use pagetools::NextUrl;
    ///
    /// let next = NextUrl::default();
    /// assert_eq!(next.with_continuation("/login", "/cart?id=7"), "/login?next=%2Fcart%3Fid%3D7");
    /// ```
    pub fn with_continuation(&self, target: &str, continuation: &str) -> String {
        let separator = if target.contains('?') { '&' } else { '?' };
        let escaped: String = form_urlencoded::byte_serialize(continuation.as_bytes()).collect();
        format!("{target}{separator}{}={escaped}", self.key)
    }

    /// Redirect to an intermediate page (e.g. a login form), passing the
    /// continuation of the current request along to it.
    pub fn redirect_with_next(
        &self,
        req: &RequestContext,
        target: &str,
        status: StatusCode,
    ) -> Response<Full<Bytes>> {
        let location = self.with_continuation(target, &self.resolve(req));
        redirect::redirect(req, &location, status)
    }

    /// Redirect to the continuation once the intermediate task is done.
    ///
    /// An empty continuation is still a valid target (the current
    /// directory); use [`resolve_or`](Self::resolve_or) with
    /// [`redirect::redirect`] when a fixed default page is wanted instead.
    pub fn redirect_to_next(
        &self,
        req: &RequestContext,
        status: StatusCode,
    ) -> Response<Full<Bytes>> {
        redirect::redirect(req, &self.resolve(req), status)
    }
}

/// A path on this origin: one leading slash, never `//host` or `/\host`, and
/// no control characters (browsers drop tabs and newlines, which could turn
/// `/\t/host` into `//host`).
fn is_local_path(path: &str) -> bool {
    if path.chars().any(char::is_control) {
        return false;
    }
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
}

#[derive(Debug, Error, PartialEq, Eq)]
enum UnescapeError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),
    #[error("unescaped value is not valid UTF-8")]
    InvalidUtf8,
}

/// Strict query unescaping: `+` becomes a space and every `%` must start a
/// two-digit hex escape.
fn query_unescape(value: &str) -> Result<String, UnescapeError> {
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }
        let well_formed = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(UnescapeError::InvalidEscape(value[i..].chars().take(3).collect()));
        }
    }

    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| UnescapeError::InvalidUtf8)
}
