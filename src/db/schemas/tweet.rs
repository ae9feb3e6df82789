//! Tweet document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata, Owned};
use crate::db::schemas::{require_fields, Metadata};
use crate::db::serde_ext::{optional_datetime_as_rfc3339, optional_object_id_as_hex};
use crate::types::{Result, VidtubeError};

/// Collection name for tweets
pub const TWEET_COLLECTION: &str = "tweets";

/// Tweet document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TweetDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub content: String,

    pub owner: ObjectId,
}

impl TweetDoc {
    pub fn create(content: &str, owner: ObjectId) -> Result<Self> {
        Ok(Self {
            _id: None,
            metadata: Metadata::new(),
            content: validate_content(content)?,
            owner,
        })
    }

    pub fn id(&self) -> Result<ObjectId> {
        self._id
            .ok_or_else(|| VidtubeError::Internal("Tweet document without _id".into()))
    }

    pub fn view(&self) -> TweetView {
        TweetView {
            id: self._id,
            content: self.content.clone(),
            owner: self.owner.to_hex(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
        }
    }
}

/// Trim and check tweet content for create and edit
pub fn validate_content(content: &str) -> Result<String> {
    let content = content.trim();
    require_fields(&[("content", content)])?;
    Ok(content.to_string())
}

/// Tweet as returned from write endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    #[serde(rename = "_id", serialize_with = "optional_object_id_as_hex")]
    pub id: Option<ObjectId>,
    pub content: String,
    pub owner: String,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
}

impl IntoIndexes for TweetDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "owner": 1, "metadata.created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("owner_created_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for TweetDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Owned for TweetDoc {
    fn owner_id(&self) -> &ObjectId {
        &self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_rules() {
        assert!(TweetDoc::create("hello", ObjectId::new()).is_ok());
        assert!(TweetDoc::create("", ObjectId::new()).is_err());
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
    }
}
