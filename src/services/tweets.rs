//! Tweets: short text posts on a user's channel

use bson::oid::ObjectId;
use tracing::info;

use crate::auth::Principal;
use crate::db::schemas::{set_content, validate_tweet_content, LikeKind, TweetDoc, TweetView};
use crate::db::Store;
use crate::query::views::TweetItem;
use crate::query::{fetch_page, pipelines, Page, PageRequest};
use crate::services::likes::purge_likes;
use crate::services::owned::{delete_owned, update_owned};
use crate::services::subscriptions::ensure_user_exists;
use crate::types::{Result, VidtubeError};

const NOUN: &str = "Tweet";

pub async fn create(store: &Store, principal: &Principal, content: Option<String>) -> Result<TweetView> {
    let tweet = TweetDoc::create(&content.unwrap_or_default(), principal.id)?;
    let id = store.tweets.insert_one(tweet).await?;

    let tweet = store
        .tweets
        .find_by_id(&id)
        .await?
        .ok_or_else(|| VidtubeError::Internal("Created tweet not found".into()))?;

    Ok(tweet.view())
}

pub async fn user_tweets(
    store: &Store,
    user_id: ObjectId,
    principal: Option<&Principal>,
    page: &PageRequest,
) -> Result<Page<TweetItem>> {
    ensure_user_exists(store, user_id, "User not found").await?;
    fetch_page(
        &store.tweets,
        pipelines::tweet_feed(user_id, principal.map(|p| &p.id)),
        page,
    )
    .await
}

pub async fn update(
    store: &Store,
    principal: &Principal,
    tweet_id: ObjectId,
    content: Option<String>,
) -> Result<TweetView> {
    let content = validate_tweet_content(&content.unwrap_or_default())?;

    let updated: TweetDoc = update_owned(
        &store.tweets,
        principal,
        tweet_id,
        set_content(&content),
        NOUN,
        "edit this tweet",
    )
    .await?;

    Ok(updated.view())
}

pub async fn delete(store: &Store, principal: &Principal, tweet_id: ObjectId) -> Result<()> {
    let _: TweetDoc =
        delete_owned(&store.tweets, principal, tweet_id, NOUN, "delete this tweet").await?;
    let likes = purge_likes(store, LikeKind::Tweet, &[tweet_id]).await?;

    info!(tweet = %tweet_id, likes, "Tweet deleted");
    Ok(())
}
