//! Playlist routes (`/api/v1/playlists/*`)

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Deserialize;

use crate::db::parse_id;
use crate::db::schemas::PlaylistUpdate;
use crate::routes::{
    ok, optional_principal, page_request, read_json, require_principal, route_not_found, FullBody,
};
use crate::server::AppState;
use crate::services::playlists;
use crate::types::Result;

#[derive(Debug, Default, Deserialize)]
struct PlaylistBody {
    name: Option<String>,
    description: Option<String>,
}

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::POST, []) => {
            let principal = require_principal(state, req.headers()).await?;
            let body: PlaylistBody = read_json(req).await?;
            let playlist =
                playlists::create(&state.store, &principal, body.name, body.description).await?;
            ok(playlist, "Playlist created successfully")
        }
        (&Method::GET, ["user", user_id]) => {
            let user_id = parse_id(user_id, "user id")?;
            let page = page_request(state, &req)?;
            let items = playlists::user_playlists(&state.store, user_id, &page).await?;
            ok(items, "Playlists fetched successfully")
        }
        (&Method::PATCH, [action @ ("add" | "remove"), video_id, playlist_id]) => {
            let video_id = parse_id(video_id, "video id")?;
            let playlist_id = parse_id(playlist_id, "playlist id")?;
            let principal = require_principal(state, req.headers()).await?;

            if *action == "add" {
                let playlist =
                    playlists::add_video(&state.store, &principal, video_id, playlist_id).await?;
                ok(playlist, "Video added to playlist successfully")
            } else {
                let playlist =
                    playlists::remove_video(&state.store, &principal, video_id, playlist_id)
                        .await?;
                ok(playlist, "Video removed from playlist successfully")
            }
        }
        (&Method::GET, [playlist_id]) => {
            let playlist_id = parse_id(playlist_id, "playlist id")?;
            // Reads are public; a presented token must still be valid
            optional_principal(state, req.headers()).await?;
            let playlist = playlists::detail(&state.store, playlist_id).await?;
            ok(playlist, "Playlist fetched successfully")
        }
        (&Method::PATCH, [playlist_id]) => {
            let playlist_id = parse_id(playlist_id, "playlist id")?;
            let principal = require_principal(state, req.headers()).await?;
            let body: PlaylistBody = read_json(req).await?;
            let changes = PlaylistUpdate {
                name: body.name,
                description: body.description,
            };
            let playlist = playlists::update(&state.store, &principal, playlist_id, changes).await?;
            ok(playlist, "Playlist updated successfully")
        }
        (&Method::DELETE, [playlist_id]) => {
            let playlist_id = parse_id(playlist_id, "playlist id")?;
            let principal = require_principal(state, req.headers()).await?;
            playlists::delete(&state.store, &principal, playlist_id).await?;
            ok(serde_json::json!({}), "Playlist deleted successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}
