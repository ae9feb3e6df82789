//! Database schemas for vidtube
//!
//! Defines MongoDB document structures for every entity, their indexes and
//! the typed update builders used by write paths.

mod comment;
mod like;
mod metadata;
mod playlist;
mod subscription;
mod tweet;
mod user;
mod video;

pub use comment::{CommentDoc, CommentView, COMMENT_COLLECTION};
pub use like::{LikeDoc, LikeKind, LikeTarget, LIKE_COLLECTION};
pub use metadata::Metadata;
pub use playlist::{
    add_video as add_video_to_playlist, remove_video as remove_video_from_playlist, PlaylistDoc,
    PlaylistUpdate, PlaylistView, PLAYLIST_COLLECTION,
};
pub use subscription::{SubscriptionDoc, SUBSCRIPTION_COLLECTION};
pub use tweet::{validate_content as validate_tweet_content, TweetDoc, TweetView, TWEET_COLLECTION};
pub use user::{
    add_to_watch_history, clear_refresh_token, set_avatar, set_cover_image, set_password_hash,
    set_refresh_token, AccountUpdate, Registration, UserDoc, UserProfile, USER_COLLECTION,
};
pub use video::{
    increment_views, set_published, NewVideo, VideoDoc, VideoUpdate, VideoView, VIDEO_COLLECTION,
};

use bson::doc;

use crate::types::{Result, VidtubeError};

/// Fail with the names of every blank required field
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(VidtubeError::MissingFields(missing))
    }
}

/// Update replacing a text `content` field (comments and tweets)
pub fn set_content(content: &str) -> bson::Document {
    doc! { "$set": { "content": content } }
}
