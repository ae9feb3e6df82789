//! Aggregation query layer
//!
//! Stage primitives, the fixed per-endpoint pipelines built from them, the
//! pagination adapter and the typed views the pipelines decode into.

pub mod paginate;
pub mod pipelines;
pub mod stages;
pub mod views;

pub use paginate::{Page, PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use pipelines::FeedFilter;

use bson::Document;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::MongoCollection;
use crate::db::{IntoIndexes, MutMetadata};
use crate::types::Result;

/// Run a pipeline through the pagination facet
pub async fn fetch_page<C, T>(
    collection: &MongoCollection<C>,
    pipeline: Vec<Document>,
    request: &PageRequest,
) -> Result<Page<T>>
where
    C: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    T: Serialize + DeserializeOwned,
{
    let result = collection.aggregate(request.paginate(pipeline)).await?;
    Page::from_facet(request, result)
}

/// Run a pipeline expected to yield at most one document
pub async fn fetch_one<C, T>(collection: &MongoCollection<C>, pipeline: Vec<Document>) -> Result<Option<T>>
where
    C: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    T: DeserializeOwned,
{
    let mut rows = collection.aggregate(pipeline).await?;
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(bson::from_document(rows.swap_remove(0))?))
}
