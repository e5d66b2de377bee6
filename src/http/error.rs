//! Error responses

use std::fmt::Display;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::response::log_build_error;
use crate::logger;

/// Build a plain-text error response for `code`.
///
/// With `show` the body carries the error text (`error: <err>`); otherwise
/// only the canonical status text, so internal details stay server-side.
/// With `log` the error is also written to the error log.
pub fn error_response<E>(code: StatusCode, err: &E, show: bool, log: bool) -> Response<Full<Bytes>>
where
    E: Display + ?Sized,
{
    if log {
        logger::log_error(&format!("http error: {err}"));
    }

    let body = if show {
        format!("error: {err}\n")
    } else {
        format!("{}\n", code.canonical_reason().unwrap_or_default())
    };

    Response::builder()
        .status(code)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(code.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_show_error_text() {
        let response = error_response(StatusCode::BAD_REQUEST, "missing field", true, false);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "error: missing field\n");
    }

    #[tokio::test]
    async fn test_hide_error_text() {
        let err = std::io::Error::other("database password rejected");
        let response = error_response(StatusCode::INTERNAL_SERVER_ERROR, &err, false, true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error\n");
    }
}
