//! Video publishing, browsing and management

use bson::{doc, oid::ObjectId};
use tracing::info;

use crate::auth::Principal;
use crate::db::schemas::{
    add_to_watch_history, increment_views, remove_video_from_playlist, set_published, LikeKind,
    NewVideo, VideoDoc, VideoUpdate, VideoView,
};
use crate::db::Store;
use crate::media::{delete_quietly, MediaStore, ResourceKind, TempUpload};
use crate::query::views::{VideoCard, VideoDetail};
use crate::query::{fetch_one, fetch_page, pipelines, FeedFilter, Page, PageRequest};
use crate::services::likes::purge_likes;
use crate::services::owned::{delete_owned, load_owned};
use crate::types::{Result, VidtubeError};

const NOUN: &str = "Video";

/// Text and files of a new video
#[derive(Debug, Default)]
pub struct VideoUpload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<TempUpload>,
    pub thumbnail: Option<TempUpload>,
}

pub async fn feed(store: &Store, filter: &FeedFilter, page: &PageRequest) -> Result<Page<VideoCard>> {
    fetch_page(&store.videos, pipelines::video_feed(filter), page).await
}

/// Upload both assets and create the video
pub async fn publish(
    store: &Store,
    media: &dyn MediaStore,
    principal: &Principal,
    upload: VideoUpload,
) -> Result<VideoView> {
    let title = upload.title.unwrap_or_default();
    let description = upload.description.unwrap_or_default();

    let mut missing = Vec::new();
    for (field, blank) in [
        ("title", title.trim().is_empty()),
        ("description", description.trim().is_empty()),
        ("videoFile", upload.video_file.is_none()),
        ("thumbnail", upload.thumbnail.is_none()),
    ] {
        if blank {
            missing.push(field.to_string());
        }
    }
    let (Some(video_file), Some(thumbnail)) = (upload.video_file, upload.thumbnail) else {
        return Err(VidtubeError::MissingFields(missing));
    };
    if !missing.is_empty() {
        return Err(VidtubeError::MissingFields(missing));
    }

    let video_asset = media.upload(&video_file, ResourceKind::Video).await?;
    let thumbnail_asset = match media.upload(&thumbnail, ResourceKind::Image).await {
        Ok(asset) => asset,
        Err(e) => {
            delete_quietly(media, vec![video_asset.url], ResourceKind::Video).await;
            return Err(e);
        }
    };

    let video_url = video_asset.url.clone();
    let thumbnail_url = thumbnail_asset.url.clone();

    let created = async {
        let video = VideoDoc::create(NewVideo {
            title,
            description,
            video_file: video_asset.url,
            thumbnail: thumbnail_asset.url,
            duration: video_asset.duration.unwrap_or(0.0),
            owner: principal.id,
        })?;
        let id = store.videos.insert_one(video).await?;
        store
            .videos
            .find_by_id(&id)
            .await?
            .ok_or_else(|| VidtubeError::Internal("Published video not found".into()))
    }
    .await;

    match created {
        Ok(video) => {
            info!(video = ?video._id, owner = %principal.username, "Video published");
            Ok(video.view())
        }
        Err(e) => {
            delete_quietly(media, vec![video_url], ResourceKind::Video).await;
            delete_quietly(media, vec![thumbnail_url], ResourceKind::Image).await;
            Err(e)
        }
    }
}

/// Video page; counts a view and records it in the viewer's history
///
/// Unpublished videos are visible to their owner only.
pub async fn detail(
    store: &Store,
    video_id: ObjectId,
    principal: Option<&Principal>,
) -> Result<VideoDetail> {
    find_visible(store, video_id, principal).await?;

    store.videos.bump_by_id(&video_id, increment_views()).await?;
    if let Some(principal) = principal {
        store
            .users
            .bump_by_id(&principal.id, add_to_watch_history(&video_id))
            .await?;
    }

    fetch_one(
        &store.videos,
        pipelines::video_detail(video_id, principal.map(|p| &p.id)),
    )
    .await?
    .ok_or_else(not_found)
}

/// Edit title, description and/or thumbnail
pub async fn update(
    store: &Store,
    media: &dyn MediaStore,
    principal: &Principal,
    video_id: ObjectId,
    mut changes: VideoUpdate,
    thumbnail: Option<TempUpload>,
) -> Result<VideoView> {
    let video: VideoDoc =
        load_owned(&store.videos, principal, video_id, NOUN, "edit this video").await?;

    if changes.is_empty() && thumbnail.is_none() {
        return Err(VidtubeError::InvalidInput(
            "Provide a title, description or thumbnail to update".into(),
        ));
    }

    let new_thumbnail = match thumbnail {
        Some(file) => Some(media.upload(&file, ResourceKind::Image).await?.url),
        None => None,
    };
    changes.thumbnail = new_thumbnail.clone();

    let Some(update) = changes.into_update() else {
        return Ok(video.view());
    };

    let updated = match store.videos.update_by_id(&video_id, update).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            delete_quietly(media, new_thumbnail.into_iter().collect(), ResourceKind::Image).await;
            return Err(not_found());
        }
        Err(e) => {
            delete_quietly(media, new_thumbnail.into_iter().collect(), ResourceKind::Image).await;
            return Err(e);
        }
    };

    if new_thumbnail.is_some() {
        delete_quietly(media, vec![video.thumbnail], ResourceKind::Image).await;
    }

    Ok(updated.view())
}

/// Delete a video with its comments, likes and playlist memberships
pub async fn delete(
    store: &Store,
    media: &dyn MediaStore,
    principal: &Principal,
    video_id: ObjectId,
) -> Result<()> {
    let video: VideoDoc =
        delete_owned(&store.videos, principal, video_id, NOUN, "delete this video").await?;

    let comment_ids: Vec<ObjectId> = store
        .comments
        .find_many(doc! { "video": video_id })
        .await?
        .into_iter()
        .filter_map(|c| c._id)
        .collect();

    let comment_likes = purge_likes(store, LikeKind::Comment, &comment_ids).await?;
    let comments = store.comments.delete_many(doc! { "video": video_id }).await?;
    let video_likes = purge_likes(store, LikeKind::Video, &[video_id]).await?;
    let playlists = store
        .playlists
        .update_many(
            doc! { "videos": video_id },
            remove_video_from_playlist(&video_id),
        )
        .await?;

    info!(
        video = %video_id,
        comments,
        likes = comment_likes + video_likes,
        playlists,
        "Video deleted"
    );

    delete_quietly(media, vec![video.video_file], ResourceKind::Video).await;
    delete_quietly(media, vec![video.thumbnail], ResourceKind::Image).await;
    Ok(())
}

/// Flip the published flag
pub async fn toggle_publish(
    store: &Store,
    principal: &Principal,
    video_id: ObjectId,
) -> Result<VideoView> {
    let video: VideoDoc = load_owned(
        &store.videos,
        principal,
        video_id,
        NOUN,
        "change this video's visibility",
    )
    .await?;

    let updated = store
        .videos
        .update_by_id(&video_id, set_published(!video.is_published))
        .await?
        .ok_or_else(not_found)?;

    info!(video = %video_id, published = updated.is_published, "Video visibility changed");
    Ok(updated.view())
}

/// Load a video the viewer may see; unpublished videos of others read as missing
pub(crate) async fn find_visible(
    store: &Store,
    video_id: ObjectId,
    viewer: Option<&Principal>,
) -> Result<VideoDoc> {
    store
        .videos
        .find_by_id(&video_id)
        .await?
        .filter(|video| video.visible_to(viewer.map(|p| &p.id)))
        .ok_or_else(not_found)
}

fn not_found() -> VidtubeError {
    VidtubeError::NotFound(format!("{} not found", NOUN))
}
