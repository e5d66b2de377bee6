//! Redirect responses
//!
//! A target without scheme or host is made absolute against the directory of
//! the current request path and cleaned of `.`/`..` segments, keeping a
//! trailing slash. An empty target therefore points at the current
//! directory.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::{utf8_percent_encode, CONTROLS};

use super::response::build_redirect_response_with_code;
use crate::request::RequestContext;

/// Redirect `req` to `target` with `status`
pub fn redirect(req: &RequestContext, target: &str, status: StatusCode) -> Response<Full<Bytes>> {
    let location = resolve_location(req.path(), target);
    build_redirect_response_with_code(&location, status)
}

/// Compute the `Location` value for `target` as seen from `current_path`
pub fn resolve_location(current_path: &str, target: &str) -> String {
    if has_scheme_or_host(target) {
        return escape_controls(target);
    }

    let absolute = if target.starts_with('/') {
        target.to_string()
    } else {
        let current = if current_path.is_empty() { "/" } else { current_path };
        let dir_end = current.rfind('/').map_or(0, |i| i + 1);
        format!("{}{target}", &current[..dir_end])
    };

    let (path, query) = match absolute.find('?') {
        Some(i) => absolute.split_at(i),
        None => (absolute.as_str(), ""),
    };

    let mut cleaned = clean_path(path);
    if path.ends_with('/') && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned.push_str(query);
    escape_controls(&cleaned)
}

fn has_scheme_or_host(target: &str) -> bool {
    if target.starts_with("//") {
        return true;
    }
    target.split_once(':').is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Lexically clean a rooted path
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Header values cannot carry control characters
fn escape_controls(location: &str) -> String {
    utf8_percent_encode(location, CONTROLS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Request;

    #[test]
    fn test_absolute_path_kept() {
        assert_eq!(resolve_location("/a/b", "/x?y=1"), "/x?y=1");
        assert_eq!(resolve_location("/a/b", "/x/./y/../z/"), "/x/z/");
    }

    #[test]
    fn test_relative_against_current_dir() {
        assert_eq!(resolve_location("/a/b", "c"), "/a/c");
        assert_eq!(resolve_location("/a/b", "../x/"), "/x/");
        assert_eq!(resolve_location("/a/b/", "c"), "/a/b/c");
    }

    #[test]
    fn test_empty_target_is_current_dir() {
        assert_eq!(resolve_location("/auth/login", ""), "/auth/");
        assert_eq!(resolve_location("/", ""), "/");
        assert_eq!(resolve_location("", ""), "/");
    }

    #[test]
    fn test_urls_with_host_untouched() {
        assert_eq!(
            resolve_location("/a", "https://example.com/x/../y"),
            "https://example.com/x/../y"
        );
        assert_eq!(resolve_location("/a", "//cdn.example.com/x"), "//cdn.example.com/x");
    }

    #[test]
    fn test_control_characters_escaped() {
        assert_eq!(resolve_location("/", "/a\r\nSet-Cookie:x"), "/a%0D%0ASet-Cookie:x");
    }

    #[test]
    fn test_redirect_response() {
        let req: RequestContext = Request::builder()
            .uri("/shop/cart")
            .body(Bytes::new())
            .unwrap()
            .into();
        let response = redirect(&req, "checkout", StatusCode::SEE_OTHER);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/shop/checkout");
    }
}
