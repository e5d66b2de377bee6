//! JSON responses
//!
//! The body is compact by default and pretty-printed with a four-space
//! indent when the request carries a truthy `pretty` form value
//! (`?pretty=true`). HTML escaping is opt-in per request through the
//! [`JsonEscapeHtml`] extension.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::response::log_build_error;
use crate::request::RequestContext;

/// Request extension switching on HTML escaping in [`json_response`]
///
/// `<`, `>`, `&`, U+2028 and U+2029 are then written as `\uXXXX` escapes, so
/// the output can be embedded in a `<script>` block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonEscapeHtml(pub bool);

/// Serialize `value` as an `application/json` response
pub fn json_response<T>(
    req: &RequestContext,
    value: &T,
) -> Result<Response<Full<Bytes>>, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let pretty = req.form_value("pretty").is_some_and(parse_bool);
    let mut body = encode(value, pretty)?;

    if req
        .extensions()
        .get::<JsonEscapeHtml>()
        .is_some_and(|escape| escape.0)
    {
        body = escape_html(&body);
    }
    body.push(b'\n');

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("JSON", &e);
            Response::new(Full::new(Bytes::new()))
        }))
}

fn encode<T>(value: &T, pretty: bool) -> serde_json::Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    if !pretty {
        return serde_json::to_vec(value);
    }
    let mut out = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Characters outside of strings are never affected: none of them can
/// appear in JSON syntax.
fn escape_html(json: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(json);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out.into_bytes()
}

/// Boolean spellings accepted for `pretty`
fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}
