//! Entity store: MongoDB collections for every vidtube entity

pub mod mongo;
pub mod schemas;
pub mod serde_ext;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata, Owned, Toggleable};

use bson::oid::ObjectId;

use crate::db::schemas::{
    CommentDoc, LikeDoc, PlaylistDoc, SubscriptionDoc, TweetDoc, UserDoc, VideoDoc,
    COMMENT_COLLECTION, LIKE_COLLECTION, PLAYLIST_COLLECTION, SUBSCRIPTION_COLLECTION,
    TWEET_COLLECTION, USER_COLLECTION, VIDEO_COLLECTION,
};
use crate::types::{Result, VidtubeError};

/// Typed handles to every collection, opened once at startup
#[derive(Clone)]
pub struct Store {
    pub client: MongoClient,
    pub users: MongoCollection<UserDoc>,
    pub videos: MongoCollection<VideoDoc>,
    pub comments: MongoCollection<CommentDoc>,
    pub likes: MongoCollection<LikeDoc>,
    pub subscriptions: MongoCollection<SubscriptionDoc>,
    pub tweets: MongoCollection<TweetDoc>,
    pub playlists: MongoCollection<PlaylistDoc>,
}

impl Store {
    /// Open all collections and apply their indexes
    pub async fn open(client: MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            videos: client.collection(VIDEO_COLLECTION).await?,
            comments: client.collection(COMMENT_COLLECTION).await?,
            likes: client.collection(LIKE_COLLECTION).await?,
            subscriptions: client.collection(SUBSCRIPTION_COLLECTION).await?,
            tweets: client.collection(TWEET_COLLECTION).await?,
            playlists: client.collection(PLAYLIST_COLLECTION).await?,
            client,
        })
    }
}

/// Parse an identifier taken from a path or query string
///
/// Runs before any store access so malformed ids never reach MongoDB.
pub fn parse_id(raw: &str, what: &str) -> Result<ObjectId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(VidtubeError::InvalidInput(format!("{} is required", what)));
    }
    ObjectId::parse_str(raw).map_err(|_| VidtubeError::InvalidInput(format!("Invalid {}", what)))
}
