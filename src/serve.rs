//! Development server.
//!
//! Serves the output directory over HTTP with `tiny_http` while the watcher
//! thread rebuilds on change:
//!
//! ```text
//! main thread        HTTP requests   (read lock)
//! watcher thread     rebuilds        (write lock)
//! Ctrl+C handler     unblocks the server
//! ```
//!
//! Requests hold the read side of the site lock, so a page is never served
//! from a half-written output tree.

use crate::output;
use crate::site::Site;
use crate::watch::{WatchError, watch_blocking, watched_dirs};
use maud::{DOCTYPE, html};
use parking_lot::RwLock;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;

/// Ports tried after the requested one is busy.
const MAX_PORT_RETRIES: u16 = 10;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("invalid server address {0:?}: expected HOST[:PORT]")]
    BadAddress(String),
    #[error("failed to bind {host} on ports {first}-{last}: {source}")]
    Bind {
        host: String,
        first: u16,
        last: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("failed to respond: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Address parsing
// ============================================================================

/// Parse `HOST[:PORT]`. Either half may be empty; `[v6]:port` is accepted.
pub fn parse_address(spec: &str) -> Result<(String, u16), ServeError> {
    let bad = || ServeError::BadAddress(spec.to_string());
    let spec = spec.trim();

    let (host, port) = if let Some(rest) = spec.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(bad)?;
        match tail {
            "" => (host, None),
            _ => (host, Some(tail.strip_prefix(':').ok_or_else(bad)?)),
        }
    } else {
        match spec.rsplit_once(':') {
            // A bare IPv6 address has more than one colon.
            Some((host, _)) if host.contains(':') => (spec, None),
            Some((host, port)) => (host, Some(port)),
            None => (spec, None),
        }
    };

    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    let port = match port {
        None | Some("") => DEFAULT_PORT,
        Some(p) => p.parse().map_err(|_| bad())?,
    };
    Ok((host.to_string(), port))
}

fn bind(host: &str, base_port: u16) -> Result<(Server, u16), ServeError> {
    let mut last_err = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http((host, port)) {
            Ok(server) => {
                if offset > 0 {
                    warn!("port {base_port} in use, using {port} instead");
                }
                return Ok((server, port));
            }
            Err(e) => {
                debug!("cannot bind {host}:{port}: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(ServeError::Bind {
        host: host.to_string(),
        first: base_port,
        last: base_port.saturating_add(MAX_PORT_RETRIES - 1),
        source: last_err.unwrap_or_else(|| "no port tried".into()),
    })
}

// ============================================================================
// Server entry point
// ============================================================================

/// Serve an already built site on `host:port` and rebuild it on change.
/// Blocks until Ctrl+C.
pub fn serve_site(site: Site, host: &str, port: u16) -> Result<(), ServeError> {
    let (server, port) = bind(host, port)?;
    let server = Arc::new(server);

    let for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        info!("shutting down");
        for_signal.unblock();
    })?;

    let watched = watched_dirs(site.layout());
    let root = site.layout().root.clone();
    let relative: Vec<&Path> = watched
        .iter()
        .map(|dir| dir.strip_prefix(&root).unwrap_or(dir))
        .collect();
    output::print_serve_banner(&format!("http://{host}:{port}/"), &relative);

    let site = Arc::new(RwLock::new(site));
    let for_watch = Arc::clone(&site);
    std::thread::spawn(move || {
        if let Err(e) = watch_blocking(for_watch) {
            error!("{e}");
        }
    });

    for request in server.incoming_requests() {
        let guard = site.read();
        if let Err(e) = handle_request(request, &guard.layout().output) {
            warn!("request error: {e}");
        }
    }
    Ok(())
}

// ============================================================================
// Request handling
// ============================================================================

/// Map a request URL onto a file under `root`.
///
/// The path is percent-decoded and stripped of its query string; directories
/// resolve to their `index.html`. Paths escaping `root` resolve to nothing.
pub fn resolve_request(root: &Path, url: &str) -> Option<PathBuf> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = urlencoding::decode(without_query).ok()?;
    let rel = Path::new(decoded.trim_matches('/'));
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local = root.join(rel);
    if local.is_file() {
        return Some(local);
    }
    let index = local.join("index.html");
    index.is_file().then_some(index)
}

fn handle_request(request: Request, root: &Path) -> Result<(), ServeError> {
    let url = request.url().to_string();
    match resolve_request(root, &url) {
        Some(path) => {
            debug!("GET {url} -> {}", path.display());
            let body = fs::read(&path)?;
            respond(request, 200, guess_content_type(&path), body)
        }
        None => {
            info!("GET {url} -> 404");
            let body = not_found_page(&url).into_bytes();
            respond(request, 404, "text/html; charset=utf-8", body)
        }
    }
}

fn respond(
    request: Request,
    status: u16,
    content_type: &str,
    body: Vec<u8>,
) -> Result<(), ServeError> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

fn not_found_page(url: &str) -> String {
    html! {
        (DOCTYPE)
        html {
            head { title { "404 Not Found" } }
            body {
                h1 { "404 Not Found" }
                p { "Nothing was built at " code { (url) } "." }
            }
        }
    }
    .into_string()
}

/// MIME type from the file extension; `application/octet-stream` otherwise.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml" | "rss" | "atom") => "application/xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",

        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
