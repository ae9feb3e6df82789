//! Comments on videos

use bson::oid::ObjectId;
use tracing::info;

use crate::auth::Principal;
use crate::db::schemas::{set_content, CommentDoc, CommentView, LikeKind};
use crate::db::Store;
use crate::query::views::CommentItem;
use crate::query::{fetch_page, pipelines, Page, PageRequest};
use crate::services::likes::purge_likes;
use crate::services::owned::{delete_owned, update_owned};
use crate::services::videos;
use crate::types::{Result, VidtubeError};

const NOUN: &str = "Comment";

pub async fn list(
    store: &Store,
    video_id: ObjectId,
    principal: Option<&Principal>,
    page: &PageRequest,
) -> Result<Page<CommentItem>> {
    videos::find_visible(store, video_id, principal).await?;
    fetch_page(
        &store.comments,
        pipelines::video_comments(video_id, principal.map(|p| &p.id)),
        page,
    )
    .await
}

pub async fn add(
    store: &Store,
    principal: &Principal,
    video_id: ObjectId,
    content: Option<String>,
) -> Result<CommentView> {
    let comment = CommentDoc::create(&content.unwrap_or_default(), video_id, principal.id)?;
    videos::find_visible(store, video_id, Some(principal)).await?;

    let id = store.comments.insert_one(comment).await?;
    let comment = store
        .comments
        .find_by_id(&id)
        .await?
        .ok_or_else(|| VidtubeError::Internal("Created comment not found".into()))?;

    Ok(comment.view())
}

pub async fn update(
    store: &Store,
    principal: &Principal,
    comment_id: ObjectId,
    content: Option<String>,
) -> Result<CommentView> {
    let content = content.unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Err(VidtubeError::MissingFields(vec!["content".into()]));
    }

    let updated: CommentDoc = update_owned(
        &store.comments,
        principal,
        comment_id,
        set_content(&content),
        NOUN,
        "edit this comment",
    )
    .await?;

    Ok(updated.view())
}

pub async fn delete(store: &Store, principal: &Principal, comment_id: ObjectId) -> Result<()> {
    let _: CommentDoc =
        delete_owned(&store.comments, principal, comment_id, NOUN, "delete this comment").await?;
    let likes = purge_likes(store, LikeKind::Comment, &[comment_id]).await?;

    info!(comment = %comment_id, likes, "Comment deleted");
    Ok(())
}
