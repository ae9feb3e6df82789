//! Likes on videos, comments and tweets

use bson::{doc, oid::ObjectId};
use tracing::debug;

use crate::auth::Principal;
use crate::db::schemas::{LikeDoc, LikeKind, LikeTarget};
use crate::db::Store;
use crate::query::views::LikedVideoItem;
use crate::query::{fetch_page, pipelines, Page, PageRequest};
use crate::services::toggle::{toggle, ToggleState};
use crate::services::videos;
use crate::types::{Result, VidtubeError};

/// Flip the principal's like on a target, returning whether it is now liked
pub async fn toggle_like(
    store: &Store,
    principal: &Principal,
    kind: LikeKind,
    target_id: ObjectId,
) -> Result<bool> {
    let filter = doc! { "_id": target_id };
    let exists = match kind {
        LikeKind::Video => {
            videos::find_visible(store, target_id, Some(principal)).await?;
            true
        }
        LikeKind::Comment => store.comments.count(filter).await? > 0,
        LikeKind::Tweet => store.tweets.count(filter).await? > 0,
    };

    if !exists {
        return Err(VidtubeError::NotFound(format!("{} not found", capitalized(kind))));
    }

    let candidate = LikeDoc::new(principal.id, LikeTarget::new(kind, target_id));
    let state = toggle(&store.likes, candidate).await?;
    debug!(kind = %kind, target = %target_id, on = state.is_on(), "Like toggled");

    Ok(state == ToggleState::On)
}

pub async fn liked_videos(
    store: &Store,
    principal: &Principal,
    page: &PageRequest,
) -> Result<Page<LikedVideoItem>> {
    fetch_page(&store.likes, pipelines::liked_videos(principal.id), page).await
}

/// Remove every like on the given targets
pub(crate) async fn purge_likes(store: &Store, kind: LikeKind, ids: &[ObjectId]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    store
        .likes
        .delete_many(doc! { "target.kind": kind.as_str(), "target.id": { "$in": ids.to_vec() } })
        .await
}

fn capitalized(kind: LikeKind) -> &'static str {
    match kind {
        LikeKind::Video => "Video",
        LikeKind::Comment => "Comment",
        LikeKind::Tweet => "Tweet",
    }
}
