//! Ownership-checked writes
//!
//! Updates and deletes of comments, tweets, playlists and videos load the
//! document, compare its owner with the principal and only then touch the
//! store. A non-owner gets `Forbidden` and the store sees no write.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::{ensure_owner, Principal};
use crate::db::{IntoIndexes, MongoCollection, MutMetadata, Owned};
use crate::types::{Result, VidtubeError};

/// Storage the ownership-checked writes run against
#[async_trait]
pub trait OwnedStore<T: Owned>: Send + Sync {
    async fn load(&self, id: ObjectId) -> Result<Option<T>>;

    /// Apply an update, returning the document as stored afterwards
    async fn apply(&self, id: ObjectId, update: Document) -> Result<Option<T>>;

    async fn discard(&self, id: ObjectId) -> Result<bool>;
}

/// Load a document, failing unless the principal owns it
///
/// `noun` names the entity in the not-found message, `action` completes
/// "Only the owner can ...".
pub async fn load_owned<T, S>(
    store: &S,
    principal: &Principal,
    id: ObjectId,
    noun: &str,
    action: &str,
) -> Result<T>
where
    T: Owned,
    S: OwnedStore<T> + ?Sized,
{
    let document = store.load(id).await?.ok_or_else(|| not_found(noun))?;
    ensure_owner(principal, document.owner_id(), action)?;
    Ok(document)
}

/// Update a document the principal owns
pub async fn update_owned<T, S>(
    store: &S,
    principal: &Principal,
    id: ObjectId,
    update: Document,
    noun: &str,
    action: &str,
) -> Result<T>
where
    T: Owned,
    S: OwnedStore<T> + ?Sized,
{
    load_owned::<T, S>(store, principal, id, noun, action).await?;
    store.apply(id, update).await?.ok_or_else(|| not_found(noun))
}

/// Delete a document the principal owns, returning it for cascades
pub async fn delete_owned<T, S>(
    store: &S,
    principal: &Principal,
    id: ObjectId,
    noun: &str,
    action: &str,
) -> Result<T>
where
    T: Owned,
    S: OwnedStore<T> + ?Sized,
{
    let document = load_owned(store, principal, id, noun, action).await?;
    if !store.discard(id).await? {
        return Err(not_found(noun));
    }
    Ok(document)
}

fn not_found(noun: &str) -> VidtubeError {
    VidtubeError::NotFound(format!("{} not found", noun))
}

#[async_trait]
impl<T> OwnedStore<T> for MongoCollection<T>
where
    T: Owned
        + Serialize
        + DeserializeOwned
        + Unpin
        + Send
        + Sync
        + IntoIndexes
        + MutMetadata
        + 'static,
{
    async fn load(&self, id: ObjectId) -> Result<Option<T>> {
        self.find_by_id(&id).await
    }

    async fn apply(&self, id: ObjectId, update: Document) -> Result<Option<T>> {
        self.update_by_id(&id, update).await
    }

    async fn discard(&self, id: ObjectId) -> Result<bool> {
        self.delete_one(doc! { "_id": id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{
        set_content, CommentDoc, NewVideo, PlaylistDoc, TweetDoc, VideoDoc,
    };
    use hyper::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Documents by id, with every write recorded
    struct MemoryStore<T> {
        docs: Mutex<HashMap<ObjectId, T>>,
        writes: Mutex<Vec<Document>>,
        discarded: Mutex<Vec<ObjectId>>,
    }

    impl<T: Clone> MemoryStore<T> {
        fn with(id: ObjectId, document: T) -> Self {
            Self {
                docs: Mutex::new(HashMap::from([(id, document)])),
                writes: Mutex::new(Vec::new()),
                discarded: Mutex::new(Vec::new()),
            }
        }

        fn untouched(&self) -> bool {
            self.writes.lock().unwrap().is_empty() && self.discarded.lock().unwrap().is_empty()
        }
    }

    #[async_trait]
    impl<T: Owned + Clone + 'static> OwnedStore<T> for MemoryStore<T> {
        async fn load(&self, id: ObjectId) -> Result<Option<T>> {
            Ok(self.docs.lock().unwrap().get(&id).cloned())
        }

        async fn apply(&self, id: ObjectId, update: Document) -> Result<Option<T>> {
            self.writes.lock().unwrap().push(update);
            Ok(self.docs.lock().unwrap().get(&id).cloned())
        }

        async fn discard(&self, id: ObjectId) -> Result<bool> {
            self.discarded.lock().unwrap().push(id);
            Ok(self.docs.lock().unwrap().remove(&id).is_some())
        }
    }

    fn principal(id: ObjectId) -> Principal {
        Principal {
            id,
            username: "dana".into(),
            email: "dana@example.com".into(),
            fullname: "Dana".into(),
        }
    }

    /// A stranger can neither update nor delete, and nothing is written
    async fn assert_guarded<T: Owned + Clone + std::fmt::Debug + 'static>(document: T, noun: &str) {
        let id = ObjectId::new();
        let owner = *document.owner_id();
        let store = MemoryStore::with(id, document);
        let stranger = principal(ObjectId::new());

        let err = update_owned::<T, _>(&store, &stranger, id, set_content("x"), noun, "edit this")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = delete_owned::<T, _>(&store, &stranger, id, noun, "delete this")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        assert!(store.untouched());
        assert!(store.docs.lock().unwrap().contains_key(&id));

        let kept: T = load_owned(&store, &principal(owner), id, noun, "edit this")
            .await
            .unwrap();
        assert_eq!(kept.owner_id(), &owner);
    }

    #[tokio::test]
    async fn test_non_owner_writes_are_rejected_before_the_store() {
        let owner = ObjectId::new();

        assert_guarded(CommentDoc::create("nice", ObjectId::new(), owner).unwrap(), "Comment").await;
        assert_guarded(TweetDoc::create("hello", owner).unwrap(), "Tweet").await;
        assert_guarded(PlaylistDoc::create("Mix", "Favourites", owner).unwrap(), "Playlist").await;
        assert_guarded(
            VideoDoc::create(NewVideo {
                title: "Intro".into(),
                description: "First".into(),
                video_file: "https://cdn/video/upload/v1/a.mp4".into(),
                thumbnail: "https://cdn/image/upload/v1/a.png".into(),
                duration: 1.0,
                owner,
            })
            .unwrap(),
            "Video",
        )
        .await;
    }

    #[tokio::test]
    async fn test_owner_update_reaches_the_store() {
        let owner = ObjectId::new();
        let id = ObjectId::new();
        let store = MemoryStore::with(id, TweetDoc::create("hello", owner).unwrap());

        let updated: TweetDoc =
            update_owned(&store, &principal(owner), id, set_content("edited"), "Tweet", "edit this tweet")
                .await
                .unwrap();

        assert_eq!(updated.owner, owner);
        assert_eq!(store.writes.lock().unwrap().as_slice(), &[set_content("edited")]);
    }

    #[tokio::test]
    async fn test_owner_delete_returns_the_removed_document() {
        let owner = ObjectId::new();
        let id = ObjectId::new();
        let video = ObjectId::new();
        let store = MemoryStore::with(id, CommentDoc::create("bye", video, owner).unwrap());

        let removed: CommentDoc =
            delete_owned(&store, &principal(owner), id, "Comment", "delete this comment")
                .await
                .unwrap();

        assert_eq!(removed.video, video);
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found_without_writes() {
        let store: MemoryStore<PlaylistDoc> =
            MemoryStore::with(ObjectId::new(), PlaylistDoc::create("Mix", "Favourites", ObjectId::new()).unwrap());

        let err = update_owned::<PlaylistDoc, _>(
            &store,
            &principal(ObjectId::new()),
            ObjectId::new(),
            doc! { "$set": { "name": "x" } },
            "Playlist",
            "edit this playlist",
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Playlist not found");
        assert!(store.untouched());
    }
}
