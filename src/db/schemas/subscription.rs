//! Subscription document schema
//!
//! Links a subscriber to a channel (another user).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata, Toggleable};
use crate::db::schemas::Metadata;

/// Collection name for subscriptions
pub const SUBSCRIPTION_COLLECTION: &str = "subscriptions";

/// Subscription document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SubscriptionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// User who subscribes
    pub subscriber: ObjectId,

    /// User being subscribed to
    pub channel: ObjectId,
}

impl SubscriptionDoc {
    pub fn new(subscriber: ObjectId, channel: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            subscriber,
            channel,
        }
    }
}

impl Toggleable for SubscriptionDoc {
    fn stored_id(&self) -> Option<ObjectId> {
        self._id
    }

    fn toggle_key(&self) -> Document {
        doc! { "subscriber": self.subscriber, "channel": self.channel }
    }
}

impl IntoIndexes for SubscriptionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "subscriber": 1, "channel": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("subscriber_channel_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "channel": 1 },
                Some(
                    IndexOptions::builder()
                        .name("channel_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SubscriptionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
