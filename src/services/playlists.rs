//! Playlists: named, ordered-by-insertion sets of videos

use bson::oid::ObjectId;
use tracing::info;

use crate::auth::Principal;
use crate::db::schemas::{
    add_video_to_playlist, remove_video_from_playlist, PlaylistDoc, PlaylistUpdate, PlaylistView,
};
use crate::db::Store;
use crate::query::views::{PlaylistDetail, PlaylistSummary};
use crate::query::{fetch_one, fetch_page, pipelines, Page, PageRequest};
use crate::services::owned::{delete_owned, load_owned, update_owned};
use crate::services::subscriptions::ensure_user_exists;
use crate::services::videos;
use crate::types::{Result, VidtubeError};

const NOUN: &str = "Playlist";

pub async fn create(
    store: &Store,
    principal: &Principal,
    name: Option<String>,
    description: Option<String>,
) -> Result<PlaylistView> {
    let playlist = PlaylistDoc::create(
        &name.unwrap_or_default(),
        &description.unwrap_or_default(),
        principal.id,
    )?;
    let id = store.playlists.insert_one(playlist).await?;

    let playlist = store
        .playlists
        .find_by_id(&id)
        .await?
        .ok_or_else(|| VidtubeError::Internal("Created playlist not found".into()))?;

    info!(playlist = %id, owner = %principal.username, "Playlist created");
    Ok(playlist.view())
}

pub async fn user_playlists(
    store: &Store,
    user_id: ObjectId,
    page: &PageRequest,
) -> Result<Page<PlaylistSummary>> {
    ensure_user_exists(store, user_id, "User not found").await?;
    fetch_page(&store.playlists, pipelines::user_playlists(user_id), page).await
}

pub async fn detail(store: &Store, playlist_id: ObjectId) -> Result<PlaylistDetail> {
    fetch_one(&store.playlists, pipelines::playlist_detail(playlist_id))
        .await?
        .ok_or_else(not_found)
}

pub async fn update(
    store: &Store,
    principal: &Principal,
    playlist_id: ObjectId,
    changes: PlaylistUpdate,
) -> Result<PlaylistView> {
    let update = changes.into_update().ok_or_else(|| {
        VidtubeError::InvalidInput("Provide a name or description to update".into())
    })?;

    let playlist: PlaylistDoc =
        update_owned(&store.playlists, principal, playlist_id, update, NOUN, "edit this playlist")
            .await?;
    Ok(playlist.view())
}

pub async fn delete(store: &Store, principal: &Principal, playlist_id: ObjectId) -> Result<()> {
    let _: PlaylistDoc =
        delete_owned(&store.playlists, principal, playlist_id, NOUN, "delete this playlist")
            .await?;

    info!(playlist = %playlist_id, "Playlist deleted");
    Ok(())
}

/// Add a video; adding one that is already present leaves the playlist as is
///
/// Only videos the principal can see may be added.
pub async fn add_video(
    store: &Store,
    principal: &Principal,
    video_id: ObjectId,
    playlist_id: ObjectId,
) -> Result<PlaylistView> {
    let _: PlaylistDoc = load_owned(
        &store.playlists,
        principal,
        playlist_id,
        NOUN,
        "add videos to this playlist",
    )
    .await?;
    videos::find_visible(store, video_id, Some(principal)).await?;

    let playlist = store
        .playlists
        .update_by_id(&playlist_id, add_video_to_playlist(&video_id))
        .await?
        .ok_or_else(not_found)?;
    Ok(playlist.view())
}

/// Remove a video; removing one that is absent leaves the playlist as is
pub async fn remove_video(
    store: &Store,
    principal: &Principal,
    video_id: ObjectId,
    playlist_id: ObjectId,
) -> Result<PlaylistView> {
    let playlist: PlaylistDoc = update_owned(
        &store.playlists,
        principal,
        playlist_id,
        remove_video_from_playlist(&video_id),
        NOUN,
        "remove videos from this playlist",
    )
    .await?;
    Ok(playlist.view())
}

fn not_found() -> VidtubeError {
    VidtubeError::NotFound(format!("{} not found", NOUN))
}
