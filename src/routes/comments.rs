//! Comment routes (`/api/v1/comments/*`)

use hyper::body::Incoming;
use hyper::{Method, Request, Response};

use crate::db::parse_id;
use crate::routes::{
    ok, optional_principal, page_request, read_json, require_principal, route_not_found,
    ContentBody, FullBody,
};
use crate::server::AppState;
use crate::services::comments;
use crate::types::Result;

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::GET, [video_id]) => {
            let video_id = parse_id(video_id, "video id")?;
            let page = page_request(state, &req)?;
            let principal = optional_principal(state, req.headers()).await?;
            let items = comments::list(&state.store, video_id, principal.as_ref(), &page).await?;
            ok(items, "Comments fetched successfully")
        }
        (&Method::POST, [video_id]) => {
            let video_id = parse_id(video_id, "video id")?;
            let principal = require_principal(state, req.headers()).await?;
            let body: ContentBody = read_json(req).await?;
            let comment = comments::add(&state.store, &principal, video_id, body.content).await?;
            ok(comment, "Comment added successfully")
        }
        (&Method::PATCH, ["c", comment_id]) => {
            let comment_id = parse_id(comment_id, "comment id")?;
            let principal = require_principal(state, req.headers()).await?;
            let body: ContentBody = read_json(req).await?;
            let comment =
                comments::update(&state.store, &principal, comment_id, body.content).await?;
            ok(comment, "Comment updated successfully")
        }
        (&Method::DELETE, ["c", comment_id]) => {
            let comment_id = parse_id(comment_id, "comment id")?;
            let principal = require_principal(state, req.headers()).await?;
            comments::delete(&state.store, &principal, comment_id).await?;
            ok(serde_json::json!({}), "Comment deleted successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}
