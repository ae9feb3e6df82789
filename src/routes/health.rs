//! Health check endpoint
//!
//! `/healthcheck` and `/health` (with or without the `/api/v1` prefix)
//! report liveness, build metadata and whether MongoDB answers a ping.
//! The process is alive whenever this responds; `database` tells callers
//! whether it can serve traffic.

use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::routes::{json_response, FullBody};
use crate::server::AppState;
use crate::types::ApiResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    /// "connected" or "unreachable"
    pub database: &'static str,
    pub timestamp: String,
}

pub async fn health_check(state: &AppState) -> Response<FullBody> {
    let database = match state.store.client.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Health check database ping failed: {}", e);
            "unreachable"
        }
    };

    let body = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        database,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    json_response(&ApiResponse::new(StatusCode::OK, body, "OK"))
}
