//! MongoDB client and collection wrapper
//!
//! Every call made through [`MongoCollection`] runs under the configured
//! dependency deadline and surfaces as [`VidtubeError::Timeout`] on expiry.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use mongodb::{
    options::{IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::schemas::Metadata;
use crate::types::VidtubeError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Trait for rows whose presence encodes "on" (likes, subscriptions)
pub trait Toggleable: Send + Sync {
    /// `_id` once the row has been stored
    fn stored_id(&self) -> Option<ObjectId>;

    /// Filter identifying the row; matches the unique index
    fn toggle_key(&self) -> Document;
}

/// Trait for documents owned by a single user
pub trait Owned: Send + Sync {
    fn owner_id(&self) -> &ObjectId;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
    deadline: Duration,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str, deadline: Duration) -> Result<Self, VidtubeError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| VidtubeError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| VidtubeError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
            deadline,
        })
    }

    /// Get a typed collection, applying its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, VidtubeError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name, self.deadline).await
    }

    /// Round-trip to the server, used by readiness checks
    pub async fn ping(&self) -> Result<(), VidtubeError> {
        let db = self.client.database(&self.db_name);
        let ping = db.run_command(doc! { "ping": 1 });
        match tokio::time::timeout(self.deadline, ping.into_future()).await {
            Ok(result) => result.map(|_| ()).map_err(VidtubeError::from),
            Err(_) => Err(VidtubeError::Timeout("database (ping)".into())),
        }
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
    deadline: Duration,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
        deadline: Duration,
    ) -> Result<Self, VidtubeError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection {
            inner: collection,
            deadline,
        };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), VidtubeError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.bounded("create_indexes", self.inner.create_indexes(indices))
            .await
            .map_err(|e| match e {
                VidtubeError::Database(msg) => {
                    VidtubeError::Database(format!("Failed to create indexes: {}", msg))
                }
                other => other,
            })?;

        Ok(())
    }

    /// Run a driver call under the dependency deadline
    async fn bounded<F, R>(&self, op: &'static str, call: F) -> Result<R, VidtubeError>
    where
        F: IntoFuture<Output = mongodb::error::Result<R>>,
    {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result.map_err(VidtubeError::from),
            Err(_) => {
                warn!(
                    "MongoDB {} on '{}' exceeded {:?}",
                    op,
                    self.inner.name(),
                    self.deadline
                );
                Err(VidtubeError::Timeout(format!("database ({})", op)))
            }
        }
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, VidtubeError> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self.bounded("insert_one", self.inner.insert_one(item)).await?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| VidtubeError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, VidtubeError> {
        self.bounded("find_one", self.inner.find_one(filter)).await
    }

    /// Find one document by id
    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<T>, VidtubeError> {
        self.find_one(doc! { "_id": id }).await
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, VidtubeError> {
        let inner = &self.inner;
        self.bounded("find", async move {
            let cursor = inner.find(filter).await?;
            cursor.try_collect().await
        })
        .await
    }

    /// Apply an update to one document and return it as stored afterwards
    pub async fn update_by_id(
        &self,
        id: &ObjectId,
        update: Document,
    ) -> Result<Option<T>, VidtubeError> {
        let call = self
            .inner
            .find_one_and_update(doc! { "_id": id }, touch(update))
            .return_document(ReturnDocument::After);

        self.bounded("find_one_and_update", call).await
    }

    /// Apply a counter or set update to one document, leaving `updated_at` as is
    pub async fn bump_by_id(&self, id: &ObjectId, update: Document) -> Result<bool, VidtubeError> {
        let result = self
            .bounded("update_one", self.inner.update_one(doc! { "_id": id }, update))
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Update every document matching the filter
    pub async fn update_many(&self, filter: Document, update: Document) -> Result<u64, VidtubeError> {
        let result = self
            .bounded("update_many", self.inner.update_many(filter, touch(update)))
            .await?;
        Ok(result.modified_count)
    }

    /// Delete one document, reporting whether anything was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, VidtubeError> {
        let result = self.bounded("delete_one", self.inner.delete_one(filter)).await?;
        Ok(result.deleted_count > 0)
    }

    /// Delete every document matching the filter
    pub async fn delete_many(&self, filter: Document) -> Result<u64, VidtubeError> {
        let result = self.bounded("delete_many", self.inner.delete_many(filter)).await?;
        Ok(result.deleted_count)
    }

    /// Count documents matching the filter
    pub async fn count(&self, filter: Document) -> Result<u64, VidtubeError> {
        self.bounded("count_documents", self.inner.count_documents(filter))
            .await
    }

    /// Run an aggregation pipeline and collect the raw result documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, VidtubeError> {
        let inner = &self.inner;
        self.bounded("aggregate", async move {
            let cursor = inner.aggregate(pipeline).await?;
            cursor.try_collect().await
        })
        .await
    }
}

/// Stamp `metadata.updated_at` onto an update document
///
/// Merges into an existing `$set` when there is one.
pub fn touch(mut update: Document) -> Document {
    let now = DateTime::now();
    match update.get_document_mut("$set") {
        Ok(set) => {
            set.insert("metadata.updated_at", now);
        }
        Err(_) => {
            update.insert("$set", doc! { "metadata.updated_at": now });
        }
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;

    // Collection operations need a running MongoDB instance and are not
    // covered here.

    #[test]
    fn test_touch_merges_into_existing_set() {
        let update = touch(doc! { "$set": { "title": "New" } });
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("title").unwrap(), "New");
        assert!(set.get_datetime("metadata.updated_at").is_ok());
    }

    #[test]
    fn test_touch_adds_set_when_absent() {
        let update = touch(doc! { "$inc": { "views": 1 } });
        assert!(update.get_document("$inc").is_ok());
        assert!(update
            .get_document("$set")
            .unwrap()
            .get_datetime("metadata.updated_at")
            .is_ok());
    }
}
