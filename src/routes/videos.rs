//! Video routes (`/api/v1/videos/*`)

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Deserialize;

use crate::db::parse_id;
use crate::db::schemas::VideoUpdate;
use crate::query::FeedFilter;
use crate::routes::{
    is_multipart, ok, optional_principal, query_params, read_json, read_multipart,
    require_principal, route_not_found, FullBody, PageQuery,
};
use crate::server::AppState;
use crate::services::videos::{self, VideoUpload};
use crate::types::Result;

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::GET, []) => feed(state, req).await,
        (&Method::POST, []) => publish(state, req).await,
        (&Method::GET, [id]) => {
            let video_id = parse_id(id, "video id")?;
            let principal = optional_principal(state, req.headers()).await?;
            let video = videos::detail(&state.store, video_id, principal.as_ref()).await?;
            ok(video, "Video fetched successfully")
        }
        (&Method::PATCH, [id]) => update(state, req, id).await,
        (&Method::DELETE, [id]) => {
            let video_id = parse_id(id, "video id")?;
            let principal = require_principal(state, req.headers()).await?;
            videos::delete(&state.store, state.media.as_ref(), &principal, video_id).await?;
            ok(serde_json::json!({}), "Video deleted successfully")
        }
        (&Method::PATCH, ["toggle", "publish", id]) => {
            let video_id = parse_id(id, "video id")?;
            let principal = require_principal(state, req.headers()).await?;
            let video = videos::toggle_publish(&state.store, &principal, video_id).await?;
            ok(video, "Publish status toggled successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedQuery {
    #[serde(flatten)]
    page: PageQuery,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    user_id: Option<String>,
}

async fn feed(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let params: FeedQuery = query_params(&req)?;
    let page = params.page.to_request(state);

    let owner = match params.user_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id(raw, "user id")?),
        _ => None,
    };
    let filter = FeedFilter {
        owner,
        query: params.query,
        sort_by: params.sort_by,
        sort_type: params.sort_type,
    };

    let videos = videos::feed(&state.store, &filter, &page).await?;
    ok(videos, "Videos fetched successfully")
}

async fn publish(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let principal = require_principal(state, req.headers()).await?;
    let mut form = read_multipart(state, req).await?;

    let upload = VideoUpload {
        title: form.text("title"),
        description: form.text("description"),
        video_file: form.take_file("videoFile"),
        thumbnail: form.take_file("thumbnail"),
    };

    let video = videos::publish(&state.store, state.media.as_ref(), &principal, upload).await?;
    ok(video, "Video published successfully")
}

#[derive(Debug, Default, Deserialize)]
struct VideoBody {
    title: Option<String>,
    description: Option<String>,
}

async fn update(state: &AppState, req: Request<Incoming>, id: &str) -> Result<Response<FullBody>> {
    let video_id = parse_id(id, "video id")?;
    let principal = require_principal(state, req.headers()).await?;

    let (changes, thumbnail) = if is_multipart(&req) {
        let mut form = read_multipart(state, req).await?;
        let changes = VideoUpdate {
            title: form.text("title"),
            description: form.text("description"),
            thumbnail: None,
        };
        (changes, form.take_file("thumbnail"))
    } else {
        let body: VideoBody = read_json(req).await?;
        let changes = VideoUpdate {
            title: body.title,
            description: body.description,
            thumbnail: None,
        };
        (changes, None)
    };

    let video = videos::update(
        &state.store,
        state.media.as_ref(),
        &principal,
        video_id,
        changes,
        thumbnail,
    )
    .await?;
    ok(video, "Video updated successfully")
}
