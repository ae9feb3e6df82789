//! Display-ready shapes produced by the aggregation pipelines
//!
//! Each struct decodes from the BSON a pipeline emits (after its final
//! `$project`) and serializes to the JSON clients receive, with ids as hex
//! strings and dates as RFC 3339.

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::serde_ext::{object_id_as_hex, optional_datetime_as_rfc3339};

/// Public card of a user embedded in other views
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserCard {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub avatar: String,
}

/// Video owner card on the detail page
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCard {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub subscribers_count: i64,
    #[serde(default)]
    pub is_subscribed: bool,
}

/// Video in feeds, history, playlists and liked lists
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCard {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub owner: Option<UserCard>,
}

/// Single video page
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub owner: Option<ChannelCard>,
}

/// A user seen as a channel
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub subscribers_count: i64,
    #[serde(default)]
    pub channels_subscribed_to_count: i64,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
}

/// Comment in a video's comment list
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentItem {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub content: String,
    #[serde(serialize_with = "object_id_as_hex")]
    pub video: ObjectId,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub owner: Option<UserCard>,
}

/// Tweet in a user's tweet feed
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetItem {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub content: String,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub owner: Option<UserCard>,
}

/// Playlist page with its published videos
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub total_videos: i64,
    #[serde(default)]
    pub total_views: i64,
    #[serde(default)]
    pub videos: Vec<VideoCard>,
    #[serde(default)]
    pub owner: Option<UserCard>,
}

/// Playlist in a user's playlist list
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_videos: i64,
    #[serde(default)]
    pub total_views: i64,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
}

/// A subscriber of a channel
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberCard {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub subscribers_count: i64,
    /// Whether the listed channel subscribes back to this subscriber
    #[serde(default)]
    pub subscribed_to_subscriber: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberItem {
    pub subscriber: SubscriberCard,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub subscribed_at: Option<DateTime>,
}

/// A channel a user subscribes to
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedChannelCard {
    #[serde(rename = "_id", serialize_with = "object_id_as_hex")]
    pub id: ObjectId,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub total_videos: i64,
    #[serde(default)]
    pub latest_video: Option<VideoCard>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedChannelItem {
    pub channel: SubscribedChannelCard,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub subscribed_at: Option<DateTime>,
}

/// A video the user liked
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideoItem {
    pub video: VideoCard,
    #[serde(default, serialize_with = "optional_datetime_as_rfc3339")]
    pub liked_at: Option<DateTime>,
}

/// Watch history wrapper emitted by the history pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct WatchHistory {
    #[serde(default)]
    pub history: Vec<VideoCard>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_video_detail_from_pipeline_output() {
        let id = ObjectId::new();
        let owner = ObjectId::new();
        let raw = doc! {
            "_id": id,
            "videoFile": "https://cdn/v.mp4",
            "thumbnail": "https://cdn/t.png",
            "title": "Intro",
            "description": "First",
            "duration": 12.5,
            "views": 3_i64,
            "isPublished": true,
            "createdAt": DateTime::from_millis(0),
            "likesCount": 2_i32,
            "isLiked": false,
            "owner": {
                "_id": owner,
                "username": "alice",
                "fullname": "Alice",
                "avatar": "https://cdn/a.png",
                "subscribersCount": 7_i32,
                "isSubscribed": true,
            },
        };

        let detail: VideoDetail = bson::from_document(raw).unwrap();
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["_id"], id.to_hex());
        assert_eq!(json["likesCount"], 2);
        assert_eq!(json["isLiked"], false);
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["owner"]["_id"], owner.to_hex());
        assert_eq!(json["owner"]["subscribersCount"], 7);
        assert_eq!(json["owner"]["isSubscribed"], true);
        assert!(json["updatedAt"].is_null());
    }

    #[test]
    fn test_channel_without_videos_has_no_latest_video() {
        let raw = doc! {
            "channel": {
                "_id": ObjectId::new(),
                "username": "quiet",
                "totalVideos": 0_i32,
            },
        };
        let item: SubscribedChannelItem = bson::from_document(raw).unwrap();
        assert!(item.channel.latest_video.is_none());
        assert_eq!(item.channel.total_videos, 0);
    }
}
