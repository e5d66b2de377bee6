//! Owned request view
//!
//! hyper hands out a streaming body; the helpers in this crate need the query
//! string, form values and request-scoped extensions synchronously, so a
//! request is collected once into a [`RequestContext`] before dispatch.

use std::sync::OnceLock;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_TYPE;
use hyper::http::request::Parts;
use hyper::http::{Extensions, HeaderMap, Method, Uri, Version};
use hyper::Request;
use thiserror::Error;
use url::form_urlencoded;

const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Content-Type header is not valid ASCII")]
    InvalidContentType,
}

/// Parsed form values. Body values come first so they shadow the query.
#[derive(Debug, Default)]
struct Form {
    body: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl Form {
    fn get(&self, key: &str) -> Option<&str> {
        self.body
            .iter()
            .chain(&self.query)
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Request head plus collected body, with a lazily parsed form
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    form: OnceLock<(Form, Option<FormError>)>,
}

impl RequestContext {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body,
            form: OnceLock::new(),
        }
    }

    /// Collect a hyper request, rejecting bodies larger than `max_body_size`
    pub async fn collect<B>(req: Request<B>, max_body_size: usize) -> Result<Self, RequestError>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let collected = Limited::new(body, max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    RequestError::BodyTooLarge {
                        limit: max_body_size,
                    }
                } else {
                    RequestError::Body(e.to_string())
                }
            })?;
        Ok(Self::new(parts, collected.to_bytes()))
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Request target path, without the query string
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub const fn version(&self) -> Version {
        self.parts.version
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value as a string, `None` when absent or not visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub const fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// First value of `key` in the URL query string, percent-decoded
    pub fn query_value(&self, key: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Parse the form once. Repeated calls return the first outcome.
    ///
    /// Query values are always available afterwards; body values are only
    /// read for POST, PUT and PATCH requests with a url-encoded body.
    pub fn parse_form(&self) -> Result<(), FormError> {
        self.form().1.clone().map_or(Ok(()), Err)
    }

    /// First value of `key` among body values, then query values
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form().0.get(key)
    }

    fn form(&self) -> &(Form, Option<FormError>) {
        self.form
            .get_or_init(|| parse_form(&self.parts, &self.body))
    }
}

impl From<Request<Bytes>> for RequestContext {
    fn from(req: Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}

fn parse_form(parts: &Parts, body: &[u8]) -> (Form, Option<FormError>) {
    let mut form = Form {
        body: Vec::new(),
        query: parts
            .uri
            .query()
            .map(|q| pairs(q.as_bytes()))
            .unwrap_or_default(),
    };

    if !matches!(parts.method, Method::POST | Method::PUT | Method::PATCH) {
        return (form, None);
    }

    let Some(content_type) = parts.headers.get(CONTENT_TYPE) else {
        return (form, None);
    };
    let Ok(content_type) = content_type.to_str() else {
        return (form, Some(FormError::InvalidContentType));
    };

    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case(FORM_MEDIA_TYPE) {
        form.body = pairs(body);
    }
    (form, None)
}

fn pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn get(uri: &str) -> RequestContext {
        Request::builder()
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    fn post_form(uri: &str, body: &'static str) -> RequestContext {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
            .into()
    }

    #[test]
    fn test_query_value_decodes() {
        let req = get("/search?q=a+b%21&q=second");
        assert_eq!(req.query_value("q").as_deref(), Some("a b!"));
        assert_eq!(req.query_value("missing"), None);
        assert_eq!(req.path(), "/search");
    }

    #[test]
    fn test_form_body_shadows_query() {
        let req = post_form("/login?next=/from-query&mode=q", "next=%2Ffrom-body");
        assert!(req.parse_form().is_ok());
        assert_eq!(req.form_value("next"), Some("/from-body"));
        assert_eq!(req.form_value("mode"), Some("q"));
    }

    #[test]
    fn test_get_body_is_not_a_form() {
        let req: RequestContext = Request::builder()
            .uri("/")
            .header(CONTENT_TYPE, FORM_MEDIA_TYPE)
            .body(Bytes::from_static(b"next=/x"))
            .unwrap()
            .into();
        assert_eq!(req.form_value("next"), None);
    }

    #[test]
    fn test_other_media_type_is_ignored() {
        let req: RequestContext = Request::builder()
            .method(Method::POST)
            .uri("/?a=1")
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(b"{\"a\":2}"))
            .unwrap()
            .into();
        assert!(req.parse_form().is_ok());
        assert_eq!(req.form_value("a"), Some("1"));
    }

    #[test]
    fn test_invalid_content_type_keeps_query() {
        let mut req = post_form("/?next=/q", "next=/b");
        req.parts.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_bytes(b"text/\xfftype").unwrap(),
        );
        assert_eq!(req.parse_form(), Err(FormError::InvalidContentType));
        // Second call reports the memoised outcome
        assert_eq!(req.parse_form(), Err(FormError::InvalidContentType));
        assert_eq!(req.form_value("next"), Some("/q"));
    }

    #[tokio::test]
    async fn test_collect_enforces_limit() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(http_body_util::Full::new(Bytes::from_static(b"0123456789")))
            .unwrap();
        let err = RequestContext::collect(req, 4).await.unwrap_err();
        assert!(matches!(err, RequestError::BodyTooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn test_collect_keeps_body() {
        let req = Request::builder()
            .uri("/upload")
            .body(http_body_util::Full::new(Bytes::from_static(b"data")))
            .unwrap();
        let ctx = RequestContext::collect(req, 1024).await.unwrap();
        assert_eq!(ctx.body().as_ref(), b"data");
    }
}
