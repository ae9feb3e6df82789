//! Comment document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata, Owned};
use crate::db::schemas::{require_fields, Metadata};
use crate::db::serde_ext::{optional_datetime_as_rfc3339, optional_object_id_as_hex};
use crate::types::{Result, VidtubeError};

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Comment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub content: String,

    /// Video the comment was posted on
    pub video: ObjectId,

    pub owner: ObjectId,
}

impl CommentDoc {
    pub fn create(content: &str, video: ObjectId, owner: ObjectId) -> Result<Self> {
        let content = content.trim();
        require_fields(&[("content", content)])?;

        Ok(Self {
            _id: None,
            metadata: Metadata::new(),
            content: content.to_string(),
            video,
            owner,
        })
    }

    pub fn id(&self) -> Result<ObjectId> {
        self._id
            .ok_or_else(|| VidtubeError::Internal("Comment document without _id".into()))
    }

    pub fn view(&self) -> CommentView {
        CommentView {
            id: self._id,
            content: self.content.clone(),
            video: self.video.to_hex(),
            owner: self.owner.to_hex(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
        }
    }
}

/// Comment as returned from write endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id", serialize_with = "optional_object_id_as_hex")]
    pub id: Option<ObjectId>,
    pub content: String,
    pub video: String,
    pub owner: String,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "video": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("video_created_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "owner": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Owned for CommentDoc {
    fn owner_id(&self) -> &ObjectId {
        &self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_is_required() {
        let err = CommentDoc::create("   ", ObjectId::new(), ObjectId::new()).unwrap_err();
        assert_eq!(err.details(), vec!["content"]);
    }

    #[test]
    fn test_content_is_trimmed() {
        let comment = CommentDoc::create("  nice video ", ObjectId::new(), ObjectId::new()).unwrap();
        assert_eq!(comment.content, "nice video");
    }
}
