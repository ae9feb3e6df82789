//! Playlist document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata, Owned};
use crate::db::schemas::{require_fields, Metadata};
use crate::db::serde_ext::{object_ids_as_hex, optional_datetime_as_rfc3339, optional_object_id_as_hex};
use crate::types::{Result, VidtubeError};

/// Collection name for playlists
pub const PLAYLIST_COLLECTION: &str = "playlists";

/// Playlist document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PlaylistDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    pub description: String,

    pub owner: ObjectId,

    /// Member videos, each at most once
    #[serde(default)]
    pub videos: Vec<ObjectId>,
}

impl PlaylistDoc {
    pub fn create(name: &str, description: &str, owner: ObjectId) -> Result<Self> {
        let name = name.trim();
        let description = description.trim();
        require_fields(&[("name", name), ("description", description)])?;

        Ok(Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.to_string(),
            description: description.to_string(),
            owner,
            videos: Vec::new(),
        })
    }

    pub fn id(&self) -> Result<ObjectId> {
        self._id
            .ok_or_else(|| VidtubeError::Internal("Playlist document without _id".into()))
    }

    pub fn view(&self) -> PlaylistView {
        PlaylistView {
            id: self._id,
            name: self.name.clone(),
            description: self.description.clone(),
            owner: self.owner.to_hex(),
            videos: self.videos.clone(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
        }
    }
}

/// Playlist as returned from write endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    #[serde(rename = "_id", serialize_with = "optional_object_id_as_hex")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub owner: String,
    #[serde(serialize_with = "object_ids_as_hex")]
    pub videos: Vec<ObjectId>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
}

/// Partial update of playlist details
#[derive(Debug, Default, Clone)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl PlaylistUpdate {
    /// Build the `$set` for the provided fields, `None` when nothing changes
    pub fn into_update(self) -> Option<Document> {
        let mut set = Document::new();
        for (field, value) in [("name", self.name), ("description", self.description)] {
            if let Some(value) = value.map(|v| v.trim().to_string()) {
                if !value.is_empty() {
                    set.insert(field, value);
                }
            }
        }

        if set.is_empty() {
            None
        } else {
            Some(doc! { "$set": set })
        }
    }
}

/// Update adding a video, leaving the playlist unchanged if already present
pub fn add_video(video_id: &ObjectId) -> Document {
    doc! { "$addToSet": { "videos": video_id } }
}

/// Update removing a video
pub fn remove_video(video_id: &ObjectId) -> Document {
    doc! { "$pull": { "videos": video_id } }
}

impl IntoIndexes for PlaylistDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "owner": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_created_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "videos": 1 },
                Some(
                    IndexOptions::builder()
                        .name("videos_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PlaylistDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Owned for PlaylistDoc {
    fn owner_id(&self) -> &ObjectId {
        &self.owner
    }
}
