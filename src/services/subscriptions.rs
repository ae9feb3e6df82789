//! Channel subscriptions

use bson::{doc, oid::ObjectId};
use tracing::debug;

use crate::auth::Principal;
use crate::db::schemas::SubscriptionDoc;
use crate::db::Store;
use crate::query::views::{SubscribedChannelItem, SubscriberItem};
use crate::query::{fetch_page, pipelines, Page, PageRequest};
use crate::services::toggle::{toggle, ToggleState};
use crate::types::{Result, VidtubeError};

/// Flip the principal's subscription to a channel, returning whether it is
/// now subscribed
pub async fn toggle_subscription(
    store: &Store,
    principal: &Principal,
    channel_id: ObjectId,
) -> Result<bool> {
    if principal.id == channel_id {
        return Err(VidtubeError::InvalidInput(
            "You cannot subscribe to your own channel".into(),
        ));
    }
    ensure_user_exists(store, channel_id, "Channel not found").await?;

    let state = toggle(&store.subscriptions, SubscriptionDoc::new(principal.id, channel_id)).await?;
    debug!(channel = %channel_id, on = state.is_on(), "Subscription toggled");

    Ok(state == ToggleState::On)
}

pub async fn channel_subscribers(
    store: &Store,
    channel_id: ObjectId,
    page: &PageRequest,
) -> Result<Page<SubscriberItem>> {
    ensure_user_exists(store, channel_id, "Channel not found").await?;
    fetch_page(
        &store.subscriptions,
        pipelines::channel_subscribers(channel_id),
        page,
    )
    .await
}

pub async fn subscribed_channels(
    store: &Store,
    subscriber_id: ObjectId,
    page: &PageRequest,
) -> Result<Page<SubscribedChannelItem>> {
    ensure_user_exists(store, subscriber_id, "User not found").await?;
    fetch_page(
        &store.subscriptions,
        pipelines::subscribed_channels(subscriber_id),
        page,
    )
    .await
}

pub(crate) async fn ensure_user_exists(store: &Store, user_id: ObjectId, message: &str) -> Result<()> {
    if store.users.count(doc! { "_id": user_id }).await? == 0 {
        return Err(VidtubeError::NotFound(message.to_string()));
    }
    Ok(())
}
