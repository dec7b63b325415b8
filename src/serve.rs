//! Development server for the generated site.
//!
//! A small `tiny_http` server that serves the output directory on its own
//! thread while the watcher rebuilds it. It only knows about files; it reads
//! whatever is on disk at request time, so rebuilt pages show up on reload.
//!
//! # Request Resolution
//!
//! ```text
//! /                      → index.html
//! /blog/2026/post-one/   → blog/2026/post-one/index.html
//! /blog/2026/post-one    → blog/2026/post-one/index.html   (pretty URL)
//! /assets/code.css       → assets/code.css
//! /../etc/passwd         → 404
//! ```
//!
//! Only `GET` and `HEAD` are served; anything else gets 405.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tiny_http::{Header, Method, Request, Response, Server};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to bind port {port}: {reason}")]
    Bind { port: u16, reason: String },
}

/// Map a request URL to a file below `output_root`.
///
/// Query strings and fragments are dropped and percent-escapes decoded.
/// Returns `None` for anything that does not resolve to an existing file
/// inside the root, including `..` traversal and symlinks pointing out.
pub fn resolve_request(output_root: &Path, url: &str) -> Option<PathBuf> {
    let raw = url.split(['?', '#']).next().unwrap_or("");
    let decoded = urlencoding::decode(raw).ok()?;

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => relative.push(s),
        }
    }

    let candidate = output_root.join(&relative);
    let found = if candidate.is_dir() {
        candidate.join("index.html")
    } else {
        candidate
    };
    if !found.is_file() {
        return None;
    }

    let root = fs::canonicalize(output_root).ok()?;
    let resolved = fs::canonicalize(&found).ok()?;
    resolved.starts_with(&root).then_some(resolved)
}

/// MIME type for a file extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/rss+xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("toml") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Responses
// ============================================================================

fn respond(request: Request, status: u16, content_type: &str, body: Vec<u8>) {
    let mut response = Response::from_data(body).with_status_code(status);
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        tracing::debug!(error = %e, "client went away");
    }
}

fn handle_request(request: Request, output_root: &Path) {
    if !matches!(request.method(), Method::Get | Method::Head) {
        respond(
            request,
            405,
            "text/plain; charset=utf-8",
            b"405 Method Not Allowed".to_vec(),
        );
        return;
    }

    let Some(path) = resolve_request(output_root, request.url()) else {
        respond(
            request,
            404,
            "text/plain; charset=utf-8",
            b"404 Not Found".to_vec(),
        );
        return;
    };

    match fs::read(&path) {
        Ok(body) => respond(request, 200, content_type(&path), body),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            respond(
                request,
                500,
                "text/plain; charset=utf-8",
                b"500 Internal Server Error".to_vec(),
            );
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// A running dev server. Dropping it without [`DevServer::stop`] leaves the
/// thread running until the process exits.
pub struct DevServer {
    server: Arc<Server>,
    thread: JoinHandle<()>,
    addr: SocketAddr,
}

impl DevServer {
    /// Bind `127.0.0.1:port` and serve `output_root` on a background thread.
    ///
    /// Port 0 picks a free port; see [`DevServer::port`].
    pub fn start(output_root: PathBuf, port: u16) -> Result<Self, ServeError> {
        let server = Server::http(("127.0.0.1", port)).map_err(|e| ServeError::Bind {
            port,
            reason: e.to_string(),
        })?;
        let addr = server
            .server_addr()
            .to_ip()
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], port)));
        let server = Arc::new(server);

        let worker = Arc::clone(&server);
        let thread = std::thread::Builder::new()
            .name("quire-serve".into())
            .spawn(move || {
                for request in worker.incoming_requests() {
                    handle_request(request, &output_root);
                }
            })?;

        Ok(Self {
            server,
            thread,
            addr,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting requests and wait for the server thread.
    pub fn stop(self) {
        self.server.unblock();
        if self.thread.join().is_err() {
            tracing::warn!("server thread panicked");
        }
    }
}
