//! Per-endpoint aggregation pipelines
//!
//! Fixed shapes: each function returns the complete stage list for one read
//! endpoint. Paginated pipelines end before the `$facet`, which
//! [`crate::query::PageRequest::paginate`] appends. Principal-dependent
//! fields are always derived after the joins they read from.

use bson::{doc, oid::ObjectId, Document};

use crate::db::schemas::{LikeKind, SUBSCRIPTION_COLLECTION, VIDEO_COLLECTION};
use crate::query::stages::{
    add_fields, contains_id, contains_principal, first_of, likes_lookup, lookup_with_pipeline,
    match_eq, match_filter, match_published, project, size_of, sort_by, sort_newest, sum_of,
    title_search, user_card_lookup, VIDEO_SORT_FIELDS,
};

/// Filters accepted by the public video feed
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub owner: Option<ObjectId>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

/// Projection of a video as a card
///
/// `with_owner` keeps an `owner` card joined by an earlier stage.
fn video_card_fields(with_owner: bool) -> Document {
    let mut fields = doc! {
        "_id": 1,
        "videoFile": "$video_file",
        "thumbnail": 1,
        "title": 1,
        "description": 1,
        "duration": 1,
        "views": 1,
        "isPublished": "$is_published",
        "createdAt": "$metadata.created_at",
    };
    if with_owner {
        fields.insert("owner", 1);
    }
    fields
}

/// Stages turning raw video rows into cards with an owner card
fn video_card_stages() -> Vec<Document> {
    vec![
        user_card_lookup("owner", "owner", Vec::new(), &[]),
        add_fields(doc! { "owner": first_of("owner") }),
        project(video_card_fields(true)),
    ]
}

/// Subscriptions joined onto a user row as `subscribers`
fn subscribers_of_user(as_field: &str) -> Document {
    lookup_with_pipeline(
        SUBSCRIPTION_COLLECTION,
        "_id",
        "channel",
        as_field,
        vec![doc! { "$project": { "subscriber": 1 } }],
    )
}

/// Published videos, optionally of one owner, searched and sorted
pub fn video_feed(filter: &FeedFilter) -> Vec<Document> {
    let mut pipeline = vec![match_published()];

    if let Some(owner) = filter.owner {
        pipeline.push(match_eq("owner", owner));
    }
    if let Some(search) = title_search(filter.query.as_deref()) {
        pipeline.push(search);
    }

    pipeline.push(sort_by(
        filter.sort_by.as_deref(),
        filter.sort_type.as_deref(),
        VIDEO_SORT_FIELDS,
    ));
    pipeline.extend(video_card_stages());
    pipeline
}

/// One video with like state and an owner card carrying subscription state
pub fn video_detail(video_id: ObjectId, principal: Option<&ObjectId>) -> Vec<Document> {
    let owner_stages = vec![
        subscribers_of_user("subscribers"),
        add_fields(doc! {
            "subscribersCount": size_of("subscribers"),
            "isSubscribed": contains_principal(principal, "subscribers.subscriber"),
        }),
    ];

    vec![
        match_eq("_id", video_id),
        likes_lookup(LikeKind::Video, "likes"),
        user_card_lookup(
            "owner",
            "owner",
            owner_stages,
            &["subscribersCount", "isSubscribed"],
        ),
        add_fields(doc! {
            "likesCount": size_of("likes"),
            "isLiked": contains_principal(principal, "likes.liked_by"),
            "owner": first_of("owner"),
        }),
        project(doc! {
            "_id": 1,
            "videoFile": "$video_file",
            "thumbnail": 1,
            "title": 1,
            "description": 1,
            "duration": 1,
            "views": 1,
            "isPublished": "$is_published",
            "createdAt": "$metadata.created_at",
            "updatedAt": "$metadata.updated_at",
            "likesCount": 1,
            "isLiked": 1,
            "owner": 1,
        }),
    ]
}

/// A user's channel page by username
pub fn channel_profile(username: &str, principal: Option<&ObjectId>) -> Vec<Document> {
    vec![
        match_eq("username", username),
        subscribers_of_user("subscribers"),
        lookup_with_pipeline(
            SUBSCRIPTION_COLLECTION,
            "_id",
            "subscriber",
            "subscribedTo",
            vec![doc! { "$project": { "channel": 1 } }],
        ),
        add_fields(doc! {
            "subscribersCount": size_of("subscribers"),
            "channelsSubscribedToCount": size_of("subscribedTo"),
            "isSubscribed": contains_principal(principal, "subscribers.subscriber"),
        }),
        project(doc! {
            "_id": 1,
            "username": 1,
            "fullname": 1,
            "email": 1,
            "avatar": 1,
            "coverImage": "$cover_image",
            "subscribersCount": 1,
            "channelsSubscribedToCount": 1,
            "isSubscribed": 1,
            "createdAt": "$metadata.created_at",
        }),
    ]
}

/// Videos in a user's watch history, each with its owner card
pub fn watch_history(user_id: ObjectId) -> Vec<Document> {
    vec![
        match_eq("_id", user_id),
        lookup_with_pipeline(
            VIDEO_COLLECTION,
            "watch_history",
            "_id",
            "history",
            video_card_stages(),
        ),
        project(doc! { "_id": 0, "history": 1 }),
    ]
}

/// Items with likes and an owner card: shared by tweets and comments
fn liked_items(kind: LikeKind, principal: Option<&ObjectId>, mut fields: Document) -> Vec<Document> {
    fields.insert("_id", 1);
    fields.insert("content", 1);
    fields.insert("createdAt", "$metadata.created_at");
    fields.insert("updatedAt", "$metadata.updated_at");
    fields.insert("likesCount", 1);
    fields.insert("isLiked", 1);
    fields.insert("owner", 1);

    vec![
        sort_newest("metadata.created_at"),
        likes_lookup(kind, "likes"),
        user_card_lookup("owner", "owner", Vec::new(), &[]),
        add_fields(doc! {
            "likesCount": size_of("likes"),
            "isLiked": contains_principal(principal, "likes.liked_by"),
            "owner": first_of("owner"),
        }),
        project(fields),
    ]
}

/// A user's tweets, newest first
pub fn tweet_feed(owner: ObjectId, principal: Option<&ObjectId>) -> Vec<Document> {
    let mut pipeline = vec![match_eq("owner", owner)];
    pipeline.extend(liked_items(LikeKind::Tweet, principal, Document::new()));
    pipeline
}

/// Comments on a video, newest first
pub fn video_comments(video: ObjectId, principal: Option<&ObjectId>) -> Vec<Document> {
    let mut pipeline = vec![match_eq("video", video)];
    pipeline.extend(liked_items(
        LikeKind::Comment,
        principal,
        doc! { "video": 1 },
    ));
    pipeline
}

/// A playlist with its published videos and totals over them
pub fn playlist_detail(playlist_id: ObjectId) -> Vec<Document> {
    let mut video_stages = vec![match_published()];
    video_stages.extend(video_card_stages());

    vec![
        match_eq("_id", playlist_id),
        lookup_with_pipeline(VIDEO_COLLECTION, "videos", "_id", "videos", video_stages),
        user_card_lookup("owner", "owner", Vec::new(), &[]),
        add_fields(doc! {
            "totalVideos": size_of("videos"),
            "totalViews": sum_of("videos.views"),
            "owner": first_of("owner"),
        }),
        project(doc! {
            "_id": 1,
            "name": 1,
            "description": 1,
            "createdAt": "$metadata.created_at",
            "updatedAt": "$metadata.updated_at",
            "totalVideos": 1,
            "totalViews": 1,
            "videos": 1,
            "owner": 1,
        }),
    ]
}

/// A user's playlists with totals, newest first
pub fn user_playlists(owner: ObjectId) -> Vec<Document> {
    vec![
        match_eq("owner", owner),
        sort_newest("metadata.created_at"),
        lookup_with_pipeline(
            VIDEO_COLLECTION,
            "videos",
            "_id",
            "videos",
            vec![doc! { "$project": { "views": 1 } }],
        ),
        add_fields(doc! {
            "totalVideos": size_of("videos"),
            "totalViews": sum_of("videos.views"),
        }),
        project(doc! {
            "_id": 1,
            "name": 1,
            "description": 1,
            "totalVideos": 1,
            "totalViews": 1,
            "createdAt": "$metadata.created_at",
            "updatedAt": "$metadata.updated_at",
        }),
    ]
}

/// Subscribers of a channel, each with their own subscriber count and
/// whether the channel subscribes back
pub fn channel_subscribers(channel: ObjectId) -> Vec<Document> {
    let subscriber_stages = vec![
        subscribers_of_user("subscribers"),
        add_fields(doc! {
            "subscribersCount": size_of("subscribers"),
            "subscribedToSubscriber": contains_id(&channel, "subscribers.subscriber"),
        }),
    ];

    vec![
        match_eq("channel", channel),
        sort_newest("metadata.created_at"),
        user_card_lookup(
            "subscriber",
            "subscriber",
            subscriber_stages,
            &["subscribersCount", "subscribedToSubscriber"],
        ),
        add_fields(doc! { "subscriber": first_of("subscriber") }),
        match_filter(doc! { "subscriber": { "$exists": true } }),
        project(doc! {
            "_id": 0,
            "subscriber": 1,
            "subscribedAt": "$metadata.created_at",
        }),
    ]
}

/// Channels a user subscribes to, with video count and latest video
pub fn subscribed_channels(subscriber: ObjectId) -> Vec<Document> {
    let mut latest_videos = vec![match_published(), sort_newest("metadata.created_at")];
    latest_videos.push(project(video_card_fields(false)));

    let channel_stages = vec![
        lookup_with_pipeline(VIDEO_COLLECTION, "_id", "owner", "videos", latest_videos),
        add_fields(doc! {
            "totalVideos": size_of("videos"),
            "latestVideo": first_of("videos"),
        }),
    ];

    vec![
        match_eq("subscriber", subscriber),
        sort_newest("metadata.created_at"),
        user_card_lookup(
            "channel",
            "channel",
            channel_stages,
            &["totalVideos", "latestVideo"],
        ),
        add_fields(doc! { "channel": first_of("channel") }),
        match_filter(doc! { "channel": { "$exists": true } }),
        project(doc! {
            "_id": 0,
            "channel": 1,
            "subscribedAt": "$metadata.created_at",
        }),
    ]
}

/// Published videos a user liked, most recent like first
pub fn liked_videos(user: ObjectId) -> Vec<Document> {
    let mut video_stages = vec![match_published()];
    video_stages.extend(video_card_stages());

    vec![
        match_filter(doc! { "liked_by": user, "target.kind": LikeKind::Video.as_str() }),
        sort_newest("metadata.created_at"),
        lookup_with_pipeline(VIDEO_COLLECTION, "target.id", "_id", "video", video_stages),
        add_fields(doc! { "video": first_of("video") }),
        match_filter(doc! { "video": { "$exists": true } }),
        project(doc! {
            "_id": 0,
            "video": 1,
            "likedAt": "$metadata.created_at",
        }),
    ]
}
