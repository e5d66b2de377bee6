//! Demo site wiring
//!
//! - `/static/*`: files from `[static_files]`
//! - `/api/status`: JSON status, `?pretty=1` to indent
//! - `/account`: needs a `user` cookie, otherwise goes through `/login`
//! - `/login`: form that sends the user back to `?next=` afterwards
//! - anything else: the matching template, `/` is `index.html`

use std::error::Error;
use std::sync::Arc;

use chrono::{Datelike, Local};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, COOKIE, SET_COOKIE};
use hyper::{Response, StatusCode};
use pagetools::config::Config;
use pagetools::http::{build_404_response, error_response, json_response, redirect};
use pagetools::logger::{self, ErrorLog};
use pagetools::template::{error_chain, RenderContext};
use pagetools::{
    file_server, handler, Loader, LoaderConfig, NextUrl, RequestContext, ResponseWriter, RouteTable,
    Router, StaticRoot,
};
use serde_json::{json, Value};
use url::form_urlencoded;

const USER_COOKIE: &str = "user";

struct Site {
    pages: Loader,
    next: NextUrl,
    show_errors: bool,
}

pub fn routes(config: &Config) -> Result<RouteTable, Box<dyn Error>> {
    let templates = &config.templates;
    let next_key = config.redirect.next_key.clone();
    let site_ctx = move |_: &mut ResponseWriter, req: &RequestContext| site_context(req, &next_key);

    // Error pages come from the same directory but never recurse into a handler
    let errors = Arc::new(Loader::new(
        "errors",
        LoaderConfig::new()
            .dir(&templates.dir)
            .cache_parsed(templates.cache_parsed)
            .default_ctx(site_ctx.clone())
            .error_logger(ErrorLog),
    )?);

    let pages = Loader::new(
        "pages",
        LoaderConfig::new()
            .dir(&templates.dir)
            .cache_parsed(templates.cache_parsed)
            .default_ctx(site_ctx)
            .not_found(move |w, req| {
                w.set_status(StatusCode::NOT_FOUND);
                if let Err(err) = errors.render_to(w, req, "404.html", RenderContext::new()) {
                    logger::log_error(&format!("Failed to render 404 page: {}", error_chain(&err)));
                }
            })
            .error_logger(ErrorLog),
    )?;

    let site = Arc::new(Site {
        pages,
        next: NextUrl::new(config.redirect.next_key.clone()),
        show_errors: config.http.show_errors,
    });

    let mut routes = RouteTable::new();
    let static_root = StaticRoot::new(&config.static_files.dir)
        .with_index_files(config.static_files.index_files.clone());
    file_server(&mut routes, &config.static_files.prefix, static_root)?;

    let s = Arc::clone(&site);
    routes.get(
        "/api/status",
        handler(move |req| {
            let site = Arc::clone(&s);
            async move { status(&site, &req) }
        }),
    );

    let s = Arc::clone(&site);
    routes.get(
        "/account",
        handler(move |req| {
            let site = Arc::clone(&s);
            async move { account(site, req).await }
        }),
    );

    let s = Arc::clone(&site);
    routes.get(
        "/login",
        handler(move |req| {
            let site = Arc::clone(&s);
            async move { login_form(site, req).await }
        }),
    );

    let s = Arc::clone(&site);
    routes.post(
        "/login",
        handler(move |req| {
            let site = Arc::clone(&s);
            async move { login_submit(&site, &req) }
        }),
    );

    let s = Arc::clone(&site);
    routes.get(
        "/*",
        handler(move |req| {
            let site = Arc::clone(&s);
            async move {
                let Some(name) = template_name(req.path()) else {
                    return build_404_response();
                };
                render(site, req, name, RenderContext::new()).await
            }
        }),
    );

    Ok(routes)
}

fn status(site: &Site, req: &RequestContext) -> Response<Full<Bytes>> {
    let body = json!({
        "status": "ok",
        "templates": site.pages.name(),
        "started": site.pages.created().to_rfc3339(),
    });
    json_response(req, &body).unwrap_or_else(|err| {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, &err, site.show_errors, true)
    })
}

async fn account(site: Arc<Site>, req: RequestContext) -> Response<Full<Bytes>> {
    let Some(user) = current_user(&req) else {
        let target = site.next.with_continuation("/login", req.path());
        return redirect(&req, &target, StatusCode::FOUND);
    };
    let ctx = context(json!({ "title": "Account", "name": user }));
    render(site, req, "account.html".to_string(), ctx).await
}

async fn login_form(site: Arc<Site>, req: RequestContext) -> Response<Full<Bytes>> {
    let ctx = context(json!({ "title": "Log in", "next": site.next.resolve(&req) }));
    render(site, req, "login.html".to_string(), ctx).await
}

/// Log in as whoever is named in the form, then continue
fn login_submit(site: &Site, req: &RequestContext) -> Response<Full<Bytes>> {
    let user = req.form_value("user").unwrap_or_default().trim();
    if user.is_empty() {
        return site.next.redirect_with_next(req, "/login", StatusCode::SEE_OTHER);
    }

    let target = site.next.resolve_or(req, "/account");
    let mut response = redirect(req, &target, StatusCode::SEE_OTHER);
    let value: String = form_urlencoded::byte_serialize(user.as_bytes()).collect();
    let cookie = format!("{USER_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(cookie) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

/// Render off the async workers; template loading reads files
async fn render(
    site: Arc<Site>,
    req: RequestContext,
    name: String,
    ctx: RenderContext,
) -> Response<Full<Bytes>> {
    let show_errors = site.show_errors;
    let rendered = tokio::task::spawn_blocking(move || site.pages.render(&req, &name, ctx)).await;
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    match rendered {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => error_response(status, &error_chain(&err), show_errors, true),
        Err(err) => error_response(status, &err, show_errors, true),
    }
}

/// Variables every page gets
fn site_context(req: &RequestContext, next_key: &str) -> RenderContext {
    context(json!({
        "user": current_user(req),
        "year": Local::now().year(),
        "next_key": next_key,
    }))
}

fn current_user(req: &RequestContext) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == USER_COOKIE)
        .and_then(|(_, value)| {
            form_urlencoded::parse(value.as_bytes())
                .next()
                .map(|(decoded, _)| decoded.into_owned())
        })
        .filter(|user| !user.is_empty())
}

/// `/` is `index.html`, `/docs/` is `docs/index.html`, `/about` is `about.html`
fn template_name(path: &str) -> Option<String> {
    let relative = path.trim_start_matches('/');
    if relative.split('/').any(|segment| segment == "..") || relative.contains('\\') {
        return None;
    }
    if relative.is_empty() || relative.ends_with('/') {
        return Some(format!("{relative}index.html"));
    }
    if relative.ends_with(".html") {
        return Some(relative.to_string());
    }
    Some(format!("{relative}.html"))
}

fn context(value: Value) -> RenderContext {
    match value {
        Value::Object(map) => map,
        _ => RenderContext::new(),
    }
}
