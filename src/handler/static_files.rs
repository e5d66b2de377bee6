//! Static file serving
//!
//! [`file_server`] mounts a directory under a URL prefix on any [`Router`].
//! Files are served with MIME types from their extension, an `ETag` for
//! conditional requests and single-range support.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{IF_NONE_MATCH, RANGE};
use hyper::{Method, Response, StatusCode};
use percent_encoding::percent_decode_str;
use tokio::fs;

use super::router::{handler, Router};
use crate::error::ConfigError;
use crate::http::{self, cache, mime, range::RangeParseResult, response};
use crate::logger;
use crate::request::RequestContext;

/// Directory served by [`file_server`]
#[derive(Debug, Clone)]
pub struct StaticRoot {
    dir: PathBuf,
    index_files: Vec<String>,
}

impl StaticRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index_files: vec!["index.html".to_string()],
        }
    }

    /// Files tried, in order, when a directory is requested
    #[must_use]
    pub fn with_index_files(mut self, index_files: Vec<String>) -> Self {
        self.index_files = index_files;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl From<&str> for StaticRoot {
    fn from(dir: &str) -> Self {
        Self::new(dir)
    }
}

impl From<&Path> for StaticRoot {
    fn from(dir: &Path) -> Self {
        Self::new(dir)
    }
}

impl From<PathBuf> for StaticRoot {
    fn from(dir: PathBuf) -> Self {
        Self::new(dir)
    }
}

/// Serve `root` under `prefix`
///
/// `/static` registers a permanent redirect from `/static` to `/static/` and
/// the file handler on `/static/*`. Prefixes carrying route parameters or
/// wildcards are rejected.
///
/// ```
/// use pagetools::{file_server, RouteTable};
///
/// let mut routes = RouteTable::new();
/// file_server(&mut routes, "/static", "public").unwrap();
/// assert!(file_server(&mut routes, "/files/{id}", "public").is_err());
/// ```
pub fn file_server<R>(
    router: &mut R,
    prefix: &str,
    root: impl Into<StaticRoot>,
) -> Result<(), ConfigError>
where
    R: Router + ?Sized,
{
    if prefix.is_empty() || prefix.contains(['{', '}', '*']) {
        return Err(ConfigError::InvalidPrefix(prefix.to_string()));
    }

    let root = Arc::new(root.into());
    let strip: Arc<str> = Arc::from(prefix);
    let mut mount = prefix.to_string();

    if prefix != "/" && !prefix.ends_with('/') {
        let target: Arc<str> = Arc::from(format!("{prefix}/"));
        router.get(
            prefix,
            handler(move |_req| {
                let target = Arc::clone(&target);
                async move {
                    http::build_redirect_response_with_code(&target, StatusCode::MOVED_PERMANENTLY)
                }
            }),
        );
        mount.push('/');
    }
    mount.push('*');

    router.get(
        &mount,
        handler(move |req| {
            let root = Arc::clone(&root);
            let strip = Arc::clone(&strip);
            async move { serve(&root, &strip, &req).await }
        }),
    );
    Ok(())
}

enum Located {
    File(PathBuf),
    /// A directory requested without its trailing slash
    Directory,
}

async fn serve(root: &StaticRoot, prefix: &str, req: &RequestContext) -> Response<Full<Bytes>> {
    let Some(relative) = req.path().strip_prefix(prefix) else {
        return http::build_404_response();
    };
    let Ok(relative) = percent_decode_str(relative).decode_utf8() else {
        return http::build_404_response();
    };

    match locate(root, &relative).await {
        Some(Located::File(path)) => serve_file(&path, req).await,
        Some(Located::Directory) => {
            let target = format!("{}/", req.path());
            http::build_redirect_response_with_code(&target, StatusCode::MOVED_PERMANENTLY)
        }
        None => http::build_404_response(),
    }
}

/// Map a request path below the prefix to a file inside `root`
async fn locate(root: &StaticRoot, relative: &str) -> Option<Located> {
    let trimmed = relative.trim_start_matches('/');
    let contained = Path::new(trimmed)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !contained {
        logger::log_warning(&format!("Path traversal attempt blocked: {relative}"));
        return None;
    }

    let mut path = root.dir.join(trimmed);
    let metadata = fs::metadata(&path).await.ok()?;
    if metadata.is_dir() {
        if !trimmed.is_empty() && !trimmed.ends_with('/') {
            return Some(Located::Directory);
        }
        path = find_index(&path, &root.index_files).await?;
    }

    // Symlinks may still point outside the root
    let root_canonical = match fs::canonicalize(&root.dir).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{}': {e}",
                root.dir.display()
            ));
            return None;
        }
    };
    let file_canonical = fs::canonicalize(&path).await.ok()?;
    if !file_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative} -> {}",
            file_canonical.display()
        ));
        return None;
    }

    Some(Located::File(path))
}

async fn find_index(dir: &Path, index_files: &[String]) -> Option<PathBuf> {
    for index_file in index_files {
        let candidate = dir.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return Some(candidate);
        }
    }
    None
}

async fn serve_file(path: &Path, req: &RequestContext) -> Response<Full<Bytes>> {
    let content = match fs::read(path).await {
        Ok(content) => Bytes::from(content),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return http::build_404_response();
        }
    };

    let content_type = mime::content_type_for(path);
    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(req.header(IF_NONE_MATCH.as_str()), &etag) {
        return http::build_304_response(&etag);
    }

    let is_head = req.method() == Method::HEAD;
    match http::parse_range_header(req.header(RANGE.as_str()), content.len()) {
        RangeParseResult::Valid(range) => response::build_partial_response(
            content.slice(range.start..=range.end),
            content_type,
            &etag,
            range,
            content.len(),
            is_head,
        ),
        RangeParseResult::NotSatisfiable => http::build_416_response(content.len()),
        RangeParseResult::None => {
            response::build_cached_response(content, content_type, &etag, is_head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, RouteTable};
    use http_body_util::BodyExt;
    use hyper::Request;

    struct Recorder(Vec<String>);

    impl Router for Recorder {
        fn get(&mut self, pattern: &str, _handler: Handler) {
            self.0.push(pattern.to_string());
        }
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body { margin: 0 }").unwrap();
        dir
    }

    async fn fetch(
        table: &RouteTable,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Response<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        table.dispatch(builder.body(Bytes::new()).unwrap().into()).await
    }

    async fn body(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_registered_patterns() {
        let mut recorder = Recorder(Vec::new());
        file_server(&mut recorder, "/static", "public").unwrap();
        assert_eq!(recorder.0, ["/static", "/static/*"]);

        let mut recorder = Recorder(Vec::new());
        file_server(&mut recorder, "/assets/", "public").unwrap();
        file_server(&mut recorder, "/", "public").unwrap();
        assert_eq!(recorder.0, ["/assets/*", "/*"]);
    }

    #[test]
    fn test_invalid_prefix() {
        let mut recorder = Recorder(Vec::new());
        for prefix in ["/files/{id}", "/files/*", "/a}", ""] {
            assert_eq!(
                file_server(&mut recorder, prefix, "public"),
                Err(ConfigError::InvalidPrefix(prefix.to_string()))
            );
        }
        assert!(recorder.0.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_redirect_and_index() {
        let dir = site();
        let mut table = RouteTable::new();
        file_server(&mut table, "/static", dir.path()).unwrap();

        let response = fetch(&table, Method::GET, "/static", &[]).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/static/");

        let response = fetch(&table, Method::GET, "/static/", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
        assert_eq!(body(response).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_serves_nested_file() {
        let dir = site();
        let mut table = RouteTable::new();
        file_server(&mut table, "/static", dir.path()).unwrap();

        let response = fetch(&table, Method::GET, "/static/css/site.css", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/css; charset=utf-8");
        assert!(response.headers().contains_key("etag"));
        assert_eq!(body(response).await, "body { margin: 0 }");

        let response = fetch(&table, Method::GET, "/static/css", &[]).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/static/css/");

        let response = fetch(&table, Method::GET, "/static/nope.txt", &[]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let public = outer.path().join("public");
        std::fs::create_dir(&public).unwrap();
        std::fs::write(public.join("ok.txt"), "ok").unwrap();

        let mut table = RouteTable::new();
        file_server(&mut table, "/static", public).unwrap();

        for uri in [
            "/static/../secret.txt",
            "/static/%2e%2e/secret.txt",
            "/static/css/%2E%2E/%2E%2E/secret.txt",
        ] {
            let response = fetch(&table, Method::GET, uri, &[]).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
        let response = fetch(&table, Method::GET, "/static/ok.txt", &[]).await;
        assert_eq!(body(response).await, "ok");
    }

    #[tokio::test]
    async fn test_etag_not_modified() {
        let dir = site();
        let mut table = RouteTable::new();
        file_server(&mut table, "/static", dir.path()).unwrap();

        let first = fetch(&table, Method::GET, "/static/css/site.css", &[]).await;
        let etag = first.headers()["etag"].to_str().unwrap().to_string();

        let headers = [("if-none-match", etag.as_str())];
        let second = fetch(&table, Method::GET, "/static/css/site.css", &headers).await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_range_and_head() {
        let dir = site();
        let mut table = RouteTable::new();
        file_server(&mut table, "/static", dir.path()).unwrap();

        let range = [("range", "bytes=0-3")];
        let partial = fetch(&table, Method::GET, "/static/css/site.css", &range).await;
        assert_eq!(partial.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(partial.headers()["content-range"], "bytes 0-3/18");
        assert_eq!(body(partial).await, "body");

        let range = [("range", "bytes=50-")];
        let unsatisfiable = fetch(&table, Method::GET, "/static/css/site.css", &range).await;
        assert_eq!(unsatisfiable.status(), StatusCode::RANGE_NOT_SATISFIABLE);

        let head = fetch(&table, Method::HEAD, "/static/css/site.css", &[]).await;
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.headers()["content-length"], "18");
        assert!(body(head).await.is_empty());
    }

    #[tokio::test]
    async fn test_root_prefix() {
        let dir = site();
        let mut table = RouteTable::new();
        let root = StaticRoot::new(dir.path()).with_index_files(vec!["missing.html".into()]);
        file_server(&mut table, "/", root).unwrap();

        let response = fetch(&table, Method::GET, "/css/site.css", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        // No configured index file exists
        let response = fetch(&table, Method::GET, "/", &[]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
