//! Response sink handed to renderers and their callbacks
//!
//! Status and headers are plain fields; the body is either buffered (turned
//! into a hyper response afterwards) or forwarded to any `io::Write`.

use std::fmt;
use std::io::{self, Write};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode};

enum Body {
    Buffered(Vec<u8>),
    Streaming(Box<dyn Write + Send>),
}

pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl ResponseWriter {
    /// Writer that buffers the body in memory
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::Buffered(Vec::new()),
        }
    }

    /// Writer that forwards every body write to `sink`
    pub fn streaming(sink: impl Write + Send + 'static) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::Streaming(Box::new(sink)),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    /// Bytes written so far, `None` for a streaming writer
    pub fn buffered_body(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Buffered(buf) => Some(buf),
            Body::Streaming(_) => None,
        }
    }

    /// Convert into a hyper response. A streaming writer yields an empty body.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = match self.body {
            Body::Buffered(buf) => Bytes::from(buf),
            Body::Streaming(_) => Bytes::new(),
        };
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.body {
            Body::Buffered(out) => {
                out.extend_from_slice(buf);
                Ok(buf.len())
            }
            Body::Streaming(sink) => sink.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.body {
            Body::Buffered(_) => Ok(()),
            Body::Streaming(sink) => sink.flush(),
        }
    }
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            Body::Buffered(buf) => format!("buffered({} bytes)", buf.len()),
            Body::Streaming(_) => "streaming".to_string(),
        };
        f.debug_struct("ResponseWriter")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_buffered_into_response() {
        let mut w = ResponseWriter::new();
        w.set_status(StatusCode::CREATED);
        w.set_content_type("text/html; charset=utf-8");
        w.write_all(b"<p>hi</p>").unwrap();
        assert_eq!(w.buffered_body(), Some(&b"<p>hi</p>"[..]));

        let response = w.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()["content-type"],
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_streaming_forwards_writes() {
        let out = Arc::new(Mutex::new(Vec::new()));
        let mut w = ResponseWriter::streaming(Shared(Arc::clone(&out)));
        w.write_all(b"chunk").unwrap();
        assert_eq!(w.buffered_body(), None);
        assert_eq!(out.lock().unwrap().as_slice(), b"chunk");
    }
}
