//! Like routes (`/api/v1/likes/*`)

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Serialize;

use crate::db::parse_id;
use crate::db::schemas::LikeKind;
use crate::routes::{ok, page_request, require_principal, route_not_found, FullBody};
use crate::server::AppState;
use crate::services::likes;
use crate::types::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeState {
    is_liked: bool,
}

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::POST, ["toggle", kind, id]) => {
            let Some(kind) = LikeKind::from_segment(kind) else {
                return Err(route_not_found(&method, req.uri().path()));
            };
            let target_id = parse_id(id, &format!("{} id", kind))?;
            let principal = require_principal(state, req.headers()).await?;

            let is_liked = likes::toggle_like(&state.store, &principal, kind, target_id).await?;
            let message = if is_liked {
                format!("Liked {} successfully", kind)
            } else {
                format!("Unliked {} successfully", kind)
            };
            ok(LikeState { is_liked }, &message)
        }
        (&Method::GET, ["videos"]) => {
            let principal = require_principal(state, req.headers()).await?;
            let page = page_request(state, &req)?;
            let items = likes::liked_videos(&state.store, &principal, &page).await?;
            ok(items, "Liked videos fetched successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}
