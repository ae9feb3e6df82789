//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection, every request
//! handled independently against the shared [`AppState`].

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::TokenIssuer;
use crate::config::Args;
use crate::db::Store;
use crate::media::MediaStore;
use crate::routes::{self, FullBody, API_PREFIX};
use crate::types::VidtubeError;

/// Shared application state, immutable after startup
pub struct AppState {
    pub args: Args,
    /// Typed handles to every collection
    pub store: Store,
    /// Media host for avatars, covers, videos and thumbnails
    pub media: Arc<dyn MediaStore>,
    /// Access and refresh token signer
    pub tokens: TokenIssuer,
}

pub async fn run(state: Arc<AppState>) -> Result<(), VidtubeError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("vidtube listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure default token secrets may be in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<FullBody>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = match (&method, path.as_str()) {
        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        (&Method::GET, "/health") | (&Method::GET, "/healthcheck") => {
            routes::health_check(&state).await
        }

        (_, p) if p == API_PREFIX || p.starts_with("/api/v1/") => {
            routes::handle_api_request(&state, req).await
        }

        _ => routes::error_response(&routes::route_not_found(&method, &path)),
    };

    let response = with_cors(response, &state.args.cors_origin, origin.as_deref());

    info!(
        peer = %addr,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

/// Attach CORS headers for the configured origin
///
/// `*` allows any origin without credentials. Otherwise `allowed` is a
/// comma-separated list; a listed request `Origin` is echoed back with
/// credentials allowed, and an unlisted one gets no CORS headers.
fn with_cors(
    mut response: Response<FullBody>,
    allowed: &str,
    origin: Option<&str>,
) -> Response<FullBody> {
    let headers = response.headers_mut();

    if allowed.trim() == "*" {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        return response;
    }

    let listed = origin.filter(|origin| {
        allowed
            .split(',')
            .map(str::trim)
            .any(|entry| !entry.is_empty() && entry == *origin)
    });

    headers.append(VARY, HeaderValue::from_static("Origin"));
    if let Some(value) = listed.and_then(|o| HeaderValue::from_str(o).ok()) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn empty() -> Response<FullBody> {
        Response::new(Full::new(Bytes::new()))
    }

    #[test]
    fn test_preflight_allows_api_methods() {
        let response = preflight_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let methods = response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap();
        assert!(methods.to_str().unwrap().contains("PATCH"));
    }

    #[test]
    fn test_cors_wildcard_never_allows_credentials() {
        let response = with_cors(empty(), "*", Some("https://elsewhere.example"));
        let headers = response.headers();
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn test_cors_wildcard_without_origin() {
        let response = with_cors(empty(), "*", None);
        let headers = response.headers();
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn test_cors_listed_origin_gets_credentials() {
        let allowed = "https://vidtube.example, https://studio.vidtube.example";
        let response = with_cors(empty(), allowed, Some("https://studio.vidtube.example"));
        let headers = response.headers();
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://studio.vidtube.example"
        );
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        assert_eq!(headers.get(VARY).unwrap(), "Origin");
    }

    #[test]
    fn test_cors_unlisted_origin_is_not_allowed() {
        let response = with_cors(empty(), "https://vidtube.example", Some("https://evil.example"));
        let headers = response.headers();
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn test_default_config_is_not_credentialed() {
        let args = Args::parse_from(["vidtube", "--dev-mode"]);
        let response = with_cors(empty(), &args.cors_origin, Some("https://evil.example"));
        let headers = response.headers();
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }
}
