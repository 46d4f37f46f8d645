//! Per-connection request handling
//!
//! Serves files through the static lookup, injects the security headers on
//! every response, and logs each request.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{
    ACCEPT_RANGES, ALLOW, CONTENT_RANGE, CONTENT_SECURITY_POLICY, CONTENT_TYPE, ETAG,
    LAST_MODIFIED, LOCATION, RANGE, SERVER, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use http::HeaderValue;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;

use crate::config::ServeConfig;
use crate::error::{Error, Result};
use lanserve_static::{FileServer, Lookup};

// hyper's HTTP/1 connections refuse read buffers below this floor
const MIN_BUF_SIZE: usize = 8192;

/// Immutable state shared by every connection
pub(crate) struct ServerContext {
    pub config: ServeConfig,
    pub files: FileServer,
    server_id: HeaderValue,
    csp: HeaderValue,
}

impl ServerContext {
    pub fn new(config: ServeConfig, files: FileServer) -> Result<Self> {
        let server_id = HeaderValue::from_str(&config.security.server_id)
            .map_err(|e| Error::Config(format!("Invalid server identity: {}", e)))?;
        let csp = HeaderValue::from_str(&config.security.content_security_policy())
            .map_err(|e| Error::Config(format!("Invalid content security policy: {}", e)))?;
        Ok(Self {
            config,
            files,
            server_id,
            csp,
        })
    }
}

/// Serve one accepted connection to completion
pub(crate) async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ServerContext>,
) {
    let timeout = context.config.request_timeout();
    let max_buf = context.config.max_request_size.max(MIN_BUF_SIZE);

    let service = {
        let context = Arc::clone(&context);
        service_fn(move |req: Request<Incoming>| {
            let context = Arc::clone(&context);
            async move { handle_request(req, peer, context).await }
        })
    };

    // The accept loop serves one connection at a time; connections are
    // single-request
    let connection = http1::Builder::new()
        .timer(TokioTimer::new())
        .keep_alive(false)
        .header_read_timeout(timeout)
        .max_buf_size(max_buf)
        .serve_connection(TokioIo::new(stream), service);

    if let Err(e) = connection.await {
        tracing::warn!("Error serving connection from {}: {}", peer, e);
    }
}

/// Handle a single request: build the response, stamp the security
/// headers, and log the outcome
async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    context: Arc<ServerContext>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let range = req
        .headers()
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = respond(&method, &path, range.as_deref(), &context).await;
    apply_security_headers(&mut response, &context);

    tracing::info!(
        "Request from {}: \"{} {}\" {}",
        peer.ip(),
        method,
        path,
        response.status().as_u16()
    );

    Ok(response)
}

/// Build the response for one request line
///
/// Split out from the hyper service so it can be driven without a live
/// connection.
async fn respond(
    method: &Method,
    raw_path: &str,
    range: Option<&str>,
    context: &ServerContext,
) -> Response<Full<Bytes>> {
    if method != Method::GET && method != Method::HEAD {
        let mut response = simple_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        return response;
    }

    let path = percent_decode(raw_path);

    match context.files.lookup(&path, range).await {
        Ok(Lookup::File(file)) => {
            let mut builder = Response::builder()
                .status(StatusCode::from_u16(file.status).unwrap_or(StatusCode::OK))
                .header(CONTENT_TYPE, file.mime_type)
                .header(ACCEPT_RANGES, "bytes");
            if let Some(last_modified) = file.last_modified {
                builder = builder.header(LAST_MODIFIED, last_modified);
            }
            if let Some(etag) = file.etag {
                builder = builder.header(ETAG, etag);
            }
            if let Some(content_range) = file.content_range {
                builder = builder.header(CONTENT_RANGE, content_range);
            }
            builder
                .body(Full::new(Bytes::from(file.content)))
                .unwrap_or_else(|_| {
                    simple_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                })
        }
        Ok(Lookup::DirectoryWithoutIndex) => Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(LOCATION, format!("/{}", context.config.index_file))
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|_| {
                simple_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }),
        Ok(Lookup::NotFound) => simple_response(StatusCode::NOT_FOUND, "Not Found"),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::warn!("Permission denied for {}: {}", path, e);
            simple_response(StatusCode::FORBIDDEN, "Forbidden")
        }
        Err(e) => {
            tracing::error!("I/O error serving {}: {}", path, e);
            simple_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Inject the headers every response carries
fn apply_security_headers(response: &mut Response<Full<Bytes>>, context: &ServerContext) {
    let headers = response.headers_mut();
    headers.insert(SERVER, context.server_id.clone());
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(CONTENT_SECURITY_POLICY, context.csp.clone());
}

fn simple_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn percent_decode(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanserve_static::FileServerConfig;

    fn context(root: &std::path::Path) -> ServerContext {
        let config = ServeConfig {
            root: root.to_path_buf(),
            ..Default::default()
        };
        let files = FileServer::new(FileServerConfig {
            root: root.to_path_buf(),
            index: vec![config.index_file.clone()],
        });
        ServerContext::new(config, files).unwrap()
    }

    #[tokio::test]
    async fn test_get_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "<p>page</p>").unwrap();
        let ctx = context(dir.path());

        let response = respond(&Method::GET, "/page.html", None, &ctx).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my page.html"), "<p>spaced</p>").unwrap();
        let ctx = context(dir.path());

        let response = respond(&Method::GET, "/my%20page.html", None, &ctx).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_directory_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let response = respond(&Method::GET, "/", None, &ctx).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "/index.html");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let response = respond(&Method::GET, "/nope.html", None, &ctx).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let response = respond(&Method::POST, "/", None, &ctx).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        for path in ["/", "/nope.html"] {
            let mut response = respond(&Method::GET, path, None, &ctx).await;
            apply_security_headers(&mut response, &ctx);
            let headers = response.headers();
            assert_eq!(headers[SERVER], "lanserve");
            assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert_eq!(headers[X_FRAME_OPTIONS], "SAMEORIGIN");
            assert!(!headers[CONTENT_SECURITY_POLICY].is_empty());
        }
    }
}
