//! Toggle engine
//!
//! A boolean relationship (like, subscription) is the presence of a row.
//! Toggling deletes the row when it exists and creates it otherwise. The
//! unique index on the row's key settles concurrent toggles: a create that
//! loses the race sees a conflict and removes the winner's row instead.

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::db::{IntoIndexes, MongoCollection, MutMetadata, Toggleable};
use crate::types::Result;

/// Storage the engine runs against
#[async_trait]
pub trait ToggleStore<T: Toggleable>: Send + Sync {
    async fn find_by_key(&self, key: Document) -> Result<Option<ObjectId>>;

    /// Create the row; a uniqueness violation must surface as `Conflict`
    async fn create(&self, row: T) -> Result<ObjectId>;

    async fn remove(&self, id: ObjectId) -> Result<bool>;
}

/// State of the relationship after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    On,
    Off,
}

impl ToggleState {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// Flip the relationship described by `candidate`
pub async fn toggle<T, S>(store: &S, candidate: T) -> Result<ToggleState>
where
    T: Toggleable,
    S: ToggleStore<T> + ?Sized,
{
    let key = candidate.toggle_key();

    if let Some(existing) = store.find_by_key(key.clone()).await? {
        store.remove(existing).await?;
        return Ok(ToggleState::Off);
    }

    match store.create(candidate).await {
        Ok(_) => Ok(ToggleState::On),
        Err(e) if e.is_conflict() => {
            debug!(key = %key, "Concurrent toggle created the row first, removing it");
            if let Some(existing) = store.find_by_key(key).await? {
                store.remove(existing).await?;
            }
            Ok(ToggleState::Off)
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl<T> ToggleStore<T> for MongoCollection<T>
where
    T: Toggleable
        + Serialize
        + DeserializeOwned
        + Unpin
        + Send
        + Sync
        + IntoIndexes
        + MutMetadata
        + 'static,
{
    async fn find_by_key(&self, key: Document) -> Result<Option<ObjectId>> {
        Ok(self.find_one(key).await?.and_then(|row| row.stored_id()))
    }

    async fn create(&self, row: T) -> Result<ObjectId> {
        self.insert_one(row).await
    }

    async fn remove(&self, id: ObjectId) -> Result<bool> {
        self.delete_one(bson::doc! { "_id": id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{LikeDoc, LikeKind, LikeTarget, SubscriptionDoc};
    use crate::types::VidtubeError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Rows keyed like the unique index; `race` makes the next create lose
    /// to a simulated concurrent request
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<(ObjectId, Document)>>,
        race: AtomicBool,
    }

    impl MemoryStore {
        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl<T: Toggleable + 'static> ToggleStore<T> for MemoryStore {
        async fn find_by_key(&self, key: Document) -> Result<Option<ObjectId>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|(_, k)| *k == key).map(|(id, _)| *id))
        }

        async fn create(&self, row: T) -> Result<ObjectId> {
            let key = row.toggle_key();
            let mut rows = self.rows.lock().unwrap();

            if self.race.swap(false, Ordering::SeqCst) {
                rows.push((ObjectId::new(), key.clone()));
            }
            if rows.iter().any(|(_, k)| *k == key) {
                return Err(VidtubeError::Conflict("Resource already exists".into()));
            }

            let id = ObjectId::new();
            rows.push((id, key));
            Ok(id)
        }

        async fn remove(&self, id: ObjectId) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|(row_id, _)| *row_id != id);
            Ok(rows.len() < before)
        }
    }

    fn like(user: ObjectId, video: ObjectId) -> LikeDoc {
        LikeDoc::new(user, LikeTarget::new(LikeKind::Video, video))
    }

    #[tokio::test]
    async fn test_two_toggles_return_to_start() {
        let store = MemoryStore::default();
        let (user, video) = (ObjectId::new(), ObjectId::new());

        assert_eq!(toggle(&store, like(user, video)).await.unwrap(), ToggleState::On);
        assert_eq!(store.len(), 1);
        assert_eq!(toggle(&store, like(user, video)).await.unwrap(), ToggleState::Off);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_rows_are_per_principal_and_target() {
        let store = MemoryStore::default();
        let video = ObjectId::new();
        let (u1, u2) = (ObjectId::new(), ObjectId::new());

        toggle(&store, like(u1, video)).await.unwrap();
        toggle(&store, like(u2, video)).await.unwrap();
        assert_eq!(store.len(), 2);

        // Same id, different kind is a different row
        let comment_like = LikeDoc::new(u1, LikeTarget::new(LikeKind::Comment, video));
        assert!(toggle(&store, comment_like).await.unwrap().is_on());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_lost_race_resolves_to_off() {
        let store = MemoryStore::default();
        store.race.store(true, Ordering::SeqCst);

        let state = toggle(&store, like(ObjectId::new(), ObjectId::new()))
            .await
            .unwrap();
        assert_eq!(state, ToggleState::Off);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_subscriptions_toggle() {
        let store = MemoryStore::default();
        let (subscriber, channel) = (ObjectId::new(), ObjectId::new());

        let first = toggle(&store, SubscriptionDoc::new(subscriber, channel)).await.unwrap();
        let second = toggle(&store, SubscriptionDoc::new(subscriber, channel)).await.unwrap();
        assert!(first.is_on());
        assert!(!second.is_on());
    }
}
