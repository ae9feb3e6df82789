//! HTTP routes for vidtube
//!
//! Everything under `/api/v1` is split into path segments and dispatched to
//! the handler module owning the first segment. Handlers return
//! `Result<Response<FullBody>>`; failures are rendered into the error
//! envelope here, in one place.

pub mod comments;
pub mod health;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

pub use health::{health_check, HealthResponse};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::auth::{extract_token_from_header, read_cookie, Principal, ACCESS_COOKIE};
use crate::media::{boundary_from_content_type, MultipartForm, UploadLimits};
use crate::query::PageRequest;
use crate::server::AppState;
use crate::types::{ApiResponse, ErrorBody, Result, VidtubeError};

/// Prefix shared by every API route
pub const API_PREFIX: &str = "/api/v1";

/// Largest accepted JSON body
const JSON_BODY_LIMIT: usize = 1024 * 1024;

pub type FullBody = Full<Bytes>;

/// Dispatch a request below [`API_PREFIX`] to its handler module
pub async fn handle_api_request(state: &AppState, req: Request<Incoming>) -> Response<FullBody> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let rest = path.strip_prefix(API_PREFIX).unwrap_or(&path);
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let result = match segments.split_first() {
        Some((&"users", tail)) => users::handle(state, req, tail).await,
        Some((&"videos", tail)) => videos::handle(state, req, tail).await,
        Some((&"comments", tail)) => comments::handle(state, req, tail).await,
        Some((&"likes", tail)) => likes::handle(state, req, tail).await,
        Some((&"subscriptions", tail)) => subscriptions::handle(state, req, tail).await,
        Some((&"tweets", tail)) => tweets::handle(state, req, tail).await,
        Some((&"playlists", tail)) => playlists::handle(state, req, tail).await,
        Some((&"healthcheck", [])) | Some((&"health", [])) => Ok(health_check(state).await),
        _ => Err(route_not_found(&method, &path)),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

/// Error for a path or method no handler serves
pub fn route_not_found(method: &hyper::Method, path: &str) -> VidtubeError {
    VidtubeError::NotFound(format!("Route {} {} not found", method, path))
}

// =============================================================================
// Responses
// =============================================================================

/// Render a success envelope with the status it carries
pub fn json_response<T: Serialize>(body: &ApiResponse<T>) -> Response<FullBody> {
    with_json(body.status(), body)
}

/// 200 envelope around `data`
pub fn ok<T: Serialize>(data: T, message: &str) -> Result<Response<FullBody>> {
    Ok(json_response(&ApiResponse::ok(data, message)))
}

/// Render the error envelope for a failed request
pub fn error_response(err: &VidtubeError) -> Response<FullBody> {
    let body = ErrorBody::from(err);
    if body.status().is_server_error() {
        error!(status = body.status_code, "Request failed: {}", err);
    } else {
        debug!(status = body.status_code, "Request rejected: {}", err);
    }
    with_json(body.status(), &body)
}

fn with_json<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Append `Set-Cookie` headers to a response
pub fn with_cookies(mut response: Response<FullBody>, cookies: &[String]) -> Response<FullBody> {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

// =============================================================================
// Request bodies
// =============================================================================

/// Deserialize a JSON body; an empty body yields `T::default()`
pub async fn read_json<T: DeserializeOwned + Default>(req: Request<Incoming>) -> Result<T> {
    let bytes = Limited::new(req.into_body(), JSON_BODY_LIMIT)
        .collect()
        .await
        .map_err(|e| VidtubeError::InvalidInput(format!("Invalid body: {}", e)))?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// `{content}` body of comments and tweets
#[derive(Debug, Default, Deserialize)]
pub struct ContentBody {
    pub content: Option<String>,
}

/// Whether the request carries a `multipart/form-data` body
pub fn is_multipart(req: &Request<Incoming>) -> bool {
    boundary_from_content_type(header_str(req.headers(), CONTENT_TYPE.as_str())).is_some()
}

/// Spool a `multipart/form-data` body into fields and temp files
pub async fn read_multipart(state: &AppState, req: Request<Incoming>) -> Result<MultipartForm> {
    let boundary = boundary_from_content_type(header_str(req.headers(), CONTENT_TYPE.as_str()))
        .ok_or_else(|| VidtubeError::InvalidInput("Expected a multipart/form-data body".into()))?;

    let limits = UploadLimits {
        max_file_bytes: state.args.max_upload_bytes,
        tmp_dir: state.args.upload_tmp_dir.clone(),
    };

    MultipartForm::parse(req.into_body().into_data_stream(), &boundary, &limits).await
}

// =============================================================================
// Query strings
// =============================================================================

/// Deserialize the query string
pub fn query_params<T: DeserializeOwned>(req: &Request<Incoming>) -> Result<T> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| VidtubeError::InvalidInput(format!("Invalid query string: {}", e)))
}

/// Raw `page`/`limit` parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn to_request(&self, state: &AppState) -> PageRequest {
        PageRequest::from_query(
            self.page.as_deref(),
            self.limit.as_deref(),
            u64::from(state.args.max_page_limit),
        )
    }
}

/// Page coordinates from the query string of a list endpoint
pub fn page_request(state: &AppState, req: &Request<Incoming>) -> Result<PageRequest> {
    let query: PageQuery = query_params(req)?;
    Ok(query.to_request(state))
}

// =============================================================================
// Authentication
// =============================================================================

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Access token from the `Authorization` header, else the `accessToken` cookie
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    extract_token_from_header(header_str(headers, AUTHORIZATION.as_str()))
        .map(str::to_string)
        .or_else(|| read_cookie(header_str(headers, COOKIE.as_str()), ACCESS_COOKIE))
}

/// Resolve the principal of an endpoint that requires a session
pub async fn require_principal(state: &AppState, headers: &HeaderMap) -> Result<Principal> {
    optional_principal(state, headers)
        .await?
        .ok_or_else(|| VidtubeError::Unauthorized("Unauthorized request".into()))
}

/// Resolve the principal of an endpoint that also serves anonymous readers
///
/// No token means anonymous; a token that does not verify is still a 401.
pub async fn optional_principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>> {
    let Some(token) = access_token(headers) else {
        return Ok(None);
    };

    let claims = state.tokens.verify_access(&token)?;
    let Principal { id, .. } = Principal::from_claims(claims)?;

    let user = state
        .store
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| VidtubeError::Unauthorized("Invalid access token".into()))?;

    Principal::from_user(&user).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_envelope() {
        let err = VidtubeError::MissingFields(vec!["title".into(), "thumbnail".into()]);
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_json_response_uses_envelope_status() {
        let body = ApiResponse::new(StatusCode::CREATED, serde_json::json!({}), "User registered");
        assert_eq!(json_response(&body).status(), StatusCode::CREATED);
    }

    #[test]
    fn test_with_cookies_appends_each() {
        let response = with_cookies(
            error_response(&VidtubeError::NotFound("x".into())),
            &["a=1".to_string(), "b=2".to_string()],
        );
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_access_token_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken=from-cookie"));
        assert_eq!(access_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(access_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_access_token_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(access_token(&headers), None);
    }
}
