use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use serde_json::Value;
use tera::{Context, Tera};

use super::error::{error_chain, is_write_failure};
use super::source::{DirSource, FnSource, LoaderFn, TemplateSource};
use super::{deps, filters, RenderContext, RenderError, CACHETS_KEY, URL_KEY};
use crate::error::ConfigError;
use crate::http::writer::ResponseWriter;
use crate::request::RequestContext;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Computes per-request default variables
pub type DefaultCtxFn =
    Arc<dyn Fn(&mut ResponseWriter, &RequestContext) -> RenderContext + Send + Sync>;
/// Answers a request whose template does not exist
pub type NotFoundFn = Arc<dyn Fn(&mut ResponseWriter, &RequestContext) + Send + Sync>;
/// Receives non-fatal render errors
pub type ErrorSink = Arc<Mutex<dyn Write + Send>>;

/// How a render call ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// The template was missing and the not-found handler answered instead
    NotFound,
    /// Writing the output failed; the error went to the diagnostic sink
    WriteFailed,
}

/// Loader settings, built with chained setters
///
/// ```no_run
/// use pagetools::LoaderConfig;
///
/// let config = LoaderConfig::new()
///     .dir("templates")
///     .cache_parsed(true)
///     .error_logger(std::io::stderr());
/// ```
#[derive(Clone, Default)]
pub struct LoaderConfig {
    loader: Option<LoaderFn>,
    dir: Option<PathBuf>,
    cache_parsed: bool,
    default_ctx: Option<DefaultCtxFn>,
    not_found: Option<NotFoundFn>,
    error_logger: Option<ErrorSink>,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load templates through a function; takes precedence over [`dir`](Self::dir)
    #[must_use]
    pub fn loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&str) -> io::Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Load templates from files under `dir`
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Compile each template once and keep it. Without this every render
    /// re-reads and re-parses its templates, which suits development.
    #[must_use]
    pub fn cache_parsed(mut self, cache_parsed: bool) -> Self {
        self.cache_parsed = cache_parsed;
        self
    }

    #[must_use]
    pub fn default_ctx<F>(mut self, default_ctx: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &RequestContext) -> RenderContext + Send + Sync + 'static,
    {
        self.default_ctx = Some(Arc::new(default_ctx));
        self
    }

    #[must_use]
    pub fn not_found<F>(mut self, not_found: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &RequestContext) + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(not_found));
        self
    }

    /// Sink for non-fatal render errors; discarded when unset
    #[must_use]
    pub fn error_logger(mut self, sink: impl Write + Send + 'static) -> Self {
        self.error_logger = Some(Arc::new(Mutex::new(sink)));
        self
    }
}

impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("loader", &self.loader.is_some())
            .field("dir", &self.dir)
            .field("cache_parsed", &self.cache_parsed)
            .field("default_ctx", &self.default_ctx.is_some())
            .field("not_found", &self.not_found.is_some())
            .field("error_logger", &self.error_logger.is_some())
            .finish()
    }
}

/// Template loader and renderer
pub struct Loader {
    name: String,
    source: Box<dyn TemplateSource>,
    cache_parsed: bool,
    default_ctx: Option<DefaultCtxFn>,
    not_found: Option<NotFoundFn>,
    error_logger: ErrorSink,
    /// Compiled templates; readers take a handle and release the lock
    cache: RwLock<Arc<Tera>>,
    created: DateTime<Utc>,
}

impl Loader {
    /// Build a loader for the template set `name`
    pub fn new(name: impl Into<String>, config: LoaderConfig) -> Result<Self, ConfigError> {
        let source: Box<dyn TemplateSource> = match (config.loader, config.dir) {
            (Some(loader), _) => Box::new(FnSource::new(loader)),
            (None, Some(dir)) => Box::new(DirSource::new(dir)),
            (None, None) => return Err(ConfigError::NoTemplateSource),
        };

        Ok(Self {
            name: name.into(),
            source,
            cache_parsed: config.cache_parsed,
            default_ctx: config.default_ctx,
            not_found: config.not_found,
            error_logger: config
                .error_logger
                .unwrap_or_else(|| Arc::new(Mutex::new(io::sink()))),
            cache: RwLock::new(Arc::new(engine())),
            created: Utc::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construction time, exposed to templates as `cachets`
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Render `path` into `w`
    ///
    /// Missing templates go to the not-found handler when one is set, and are
    /// an error otherwise. Broken templates and engine errors are always
    /// errors; output already written stays written. A failing sink is only
    /// reported to the error logger.
    pub fn render_to(
        &self,
        w: &mut ResponseWriter,
        req: &RequestContext,
        path: &str,
        ctx: RenderContext,
    ) -> Result<RenderOutcome, RenderError> {
        let engine = match self.resolve(path) {
            Ok(engine) => engine,
            Err(RenderError::NotFound(missing)) => {
                let Some(not_found) = &self.not_found else {
                    return Err(RenderError::NotFound(missing));
                };
                not_found(w, req);
                return Ok(RenderOutcome::NotFound);
            }
            Err(err) => return Err(err),
        };

        let ctx = self.build_context(w, req, ctx);
        let context = Context::from_value(Value::Object(ctx))?;

        w.set_content_type(HTML_CONTENT_TYPE);
        match engine.render_to(path, &context, &mut *w) {
            Ok(()) => Ok(RenderOutcome::Rendered),
            Err(err) if is_write_failure(&err) => {
                self.log_soft_error(&err);
                Ok(RenderOutcome::WriteFailed)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Render `path` into a buffered response
    pub fn render(
        &self,
        req: &RequestContext,
        path: &str,
        ctx: RenderContext,
    ) -> Result<Response<Full<Bytes>>, RenderError> {
        let mut w = ResponseWriter::new();
        self.render_to(&mut w, req, path, ctx)?;
        Ok(w.into_response())
    }

    /// Template set holding `path` and its dependencies
    ///
    /// No lock is held once this returns, so a slow sink never blocks other
    /// renders or compiles.
    fn resolve(&self, path: &str) -> Result<Arc<Tera>, RenderError> {
        if !self.cache_parsed {
            let mut tera = engine();
            tera.add_raw_templates(self.collect_sources(path, &HashSet::new())?)?;
            return Ok(Arc::new(tera));
        }

        let cached = self.cached();
        if has_template(&cached, path) {
            return Ok(cached);
        }
        let loaded: HashSet<String> = cached.get_template_names().map(str::to_string).collect();

        let sources = self.collect_sources(path, &loaded)?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if has_template(&cache, path) {
            return Ok(Arc::clone(&cache));
        }
        // Compile into a copy so a broken template never lands in the cache
        let mut updated = Tera::clone(&cache);
        updated.add_raw_templates(sources)?;
        *cache = Arc::new(updated);
        Ok(Arc::clone(&cache))
    }

    fn cached(&self) -> Arc<Tera> {
        Arc::clone(&self.cache.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// `path` and its dependencies, dependencies first
    fn collect_sources(
        &self,
        path: &str,
        loaded: &HashSet<String>,
    ) -> Result<Vec<(String, String)>, RenderError> {
        let mut visited = HashSet::new();
        let mut ordered = Vec::new();
        self.visit(path, false, loaded, &mut visited, &mut ordered)?;
        Ok(ordered)
    }

    fn visit(
        &self,
        name: &str,
        optional: bool,
        loaded: &HashSet<String>,
        visited: &mut HashSet<String>,
        ordered: &mut Vec<(String, String)>,
    ) -> Result<(), RenderError> {
        if loaded.contains(name) || !visited.insert(name.to_string()) {
            return Ok(());
        }

        let bytes = match self.source.read(name) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return if optional {
                    Ok(())
                } else {
                    Err(RenderError::NotFound(name.to_string()))
                };
            }
            Err(source) => {
                return Err(RenderError::Load {
                    name: name.to_string(),
                    source,
                })
            }
        };
        let text = String::from_utf8(bytes).map_err(|_| RenderError::Encoding {
            name: name.to_string(),
        })?;

        for dep in deps::scan(&text) {
            self.visit(&dep.name, dep.optional, loaded, visited, ordered)?;
        }
        ordered.push((name.to_string(), text));
        Ok(())
    }

    fn build_context(
        &self,
        w: &mut ResponseWriter,
        req: &RequestContext,
        explicit: RenderContext,
    ) -> RenderContext {
        let mut ctx = self
            .default_ctx
            .as_ref()
            .map(|default_ctx| default_ctx(w, req))
            .unwrap_or_default();
        ctx.extend(explicit);
        ctx.entry(URL_KEY)
            .or_insert_with(|| Value::from(req.path()));
        ctx.entry(CACHETS_KEY)
            .or_insert_with(|| Value::from(self.created.timestamp()));
        ctx
    }

    fn log_soft_error(&self, err: &tera::Error) {
        // One write per message so line-oriented sinks keep it together
        let message = format!("error: {}", error_chain(err));
        let mut sink = self
            .error_logger
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _ = sink.write_all(message.as_bytes());
        let _ = sink.flush();
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("name", &self.name)
            .field("cache_parsed", &self.cache_parsed)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

fn has_template(tera: &Tera, name: &str) -> bool {
    tera.get_template_names().any(|n| n == name)
}

/// Empty template set with escaping for every template and the `json` filter
fn engine() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![""]);
    tera.register_filter("json", filters::json);
    tera
}
