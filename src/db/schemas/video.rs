//! Video document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata, Owned};
use crate::db::schemas::{require_fields, Metadata};
use crate::db::serde_ext::{optional_datetime_as_rfc3339, optional_object_id_as_hex};
use crate::types::{Result, VidtubeError};

/// Collection name for videos
pub const VIDEO_COLLECTION: &str = "videos";

/// Video document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VideoDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Media host URL of the video asset
    pub video_file: String,

    /// Media host URL of the thumbnail image
    pub thumbnail: String,

    pub title: String,

    pub description: String,

    /// Length in seconds as reported by the media host
    pub duration: f64,

    #[serde(default)]
    pub views: i64,

    #[serde(default = "default_true")]
    pub is_published: bool,

    pub owner: ObjectId,
}

fn default_true() -> bool {
    true
}

/// Input for publishing a video once both assets are uploaded
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub owner: ObjectId,
}

impl VideoDoc {
    pub fn create(input: NewVideo) -> Result<Self> {
        let title = input.title.trim().to_string();
        let description = input.description.trim().to_string();

        require_fields(&[
            ("title", &title),
            ("description", &description),
            ("videoFile", &input.video_file),
            ("thumbnail", &input.thumbnail),
        ])?;

        if !input.duration.is_finite() || input.duration < 0.0 {
            return Err(VidtubeError::InvalidInput("Invalid video duration".into()));
        }

        Ok(Self {
            _id: None,
            metadata: Metadata::new(),
            video_file: input.video_file,
            thumbnail: input.thumbnail,
            title,
            description,
            duration: input.duration,
            views: 0,
            is_published: true,
            owner: input.owner,
        })
    }

    pub fn id(&self) -> Result<ObjectId> {
        self._id
            .ok_or_else(|| VidtubeError::Internal("Video document without _id".into()))
    }

    /// Published videos are visible to everyone, unpublished ones to their owner
    pub fn visible_to(&self, viewer: Option<&ObjectId>) -> bool {
        self.is_published || viewer == Some(&self.owner)
    }

    pub fn view(&self) -> VideoView {
        VideoView {
            id: self._id,
            video_file: self.video_file.clone(),
            thumbnail: self.thumbnail.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            duration: self.duration,
            views: self.views,
            is_published: self.is_published,
            owner: self.owner.to_hex(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
        }
    }
}

/// Video as returned from write endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(rename = "_id", serialize_with = "optional_object_id_as_hex")]
    pub id: Option<ObjectId>,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub owner: String,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
}

/// Partial update of video details
#[derive(Debug, Default, Clone)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl VideoUpdate {
    /// Whether any field would change
    pub fn is_empty(&self) -> bool {
        non_blank(&self.title).is_none()
            && non_blank(&self.description).is_none()
            && non_blank(&self.thumbnail).is_none()
    }

    /// Build the `$set` for the provided fields, `None` when nothing changes
    pub fn into_update(self) -> Option<Document> {
        let mut set = Document::new();
        if let Some(title) = non_blank(&self.title) {
            set.insert("title", title);
        }
        if let Some(description) = non_blank(&self.description) {
            set.insert("description", description);
        }
        if let Some(thumbnail) = non_blank(&self.thumbnail) {
            set.insert("thumbnail", thumbnail);
        }

        if set.is_empty() {
            None
        } else {
            Some(doc! { "$set": set })
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Update flipping the published flag to the given value
pub fn set_published(is_published: bool) -> Document {
    doc! { "$set": { "is_published": is_published } }
}

/// Update counting one more view
pub fn increment_views() -> Document {
    doc! { "$inc": { "views": 1 } }
}

impl IntoIndexes for VideoDoc {
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
                doc! { "is_published": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("published_created_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for VideoDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Owned for VideoDoc {
    fn owner_id(&self) -> &ObjectId {
        &self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_video() -> NewVideo {
        NewVideo {
            title: " Intro ".into(),
            description: "First upload".into(),
            video_file: "https://cdn/video/upload/v1/abc.mp4".into(),
            thumbnail: "https://cdn/image/upload/v1/thumb.png".into(),
            duration: 12.5,
            owner: ObjectId::new(),
        }
    }

    #[test]
    fn test_create_defaults() {
        let video = VideoDoc::create(new_video()).unwrap();
        assert_eq!(video.title, "Intro");
        assert_eq!(video.views, 0);
        assert!(video.is_published);
    }

    #[test]
    fn test_create_requires_fields() {
        let mut input = new_video();
        input.title = "  ".into();
        input.thumbnail = String::new();
        let err = VideoDoc::create(input).unwrap_err();
        assert_eq!(err.details(), vec!["title", "thumbnail"]);
    }

    #[test]
    fn test_create_rejects_negative_duration() {
        let mut input = new_video();
        input.duration = -1.0;
        assert!(VideoDoc::create(input).is_err());
    }

    #[test]
    fn test_update_builder_skips_blank_fields() {
        let update = VideoUpdate {
            title: Some("New title".into()),
            description: Some("   ".into()),
            thumbnail: None,
        };
        assert!(!update.is_empty());

        let doc = update.into_update().unwrap();
        let set = doc.get_document("$set").unwrap();
        assert_eq!(set.get_str("title").unwrap(), "New title");
        assert!(!set.contains_key("description"));
        assert!(!set.contains_key("thumbnail"));

        assert!(VideoUpdate::default().is_empty());
        assert!(VideoUpdate::default().into_update().is_none());
    }

    #[test]
    fn test_stored_document_round_trips() {
        let mut video = VideoDoc::create(new_video()).unwrap();
        video._id = Some(ObjectId::new());
        let stored = bson::to_document(&video).unwrap();
        assert!(stored.get_bool("is_published").unwrap());

        let back: VideoDoc = bson::from_document(stored).unwrap();
        assert_eq!(back._id, video._id);
        assert_eq!(back.owner, video.owner);
    }

    #[test]
    fn test_unpublished_video_visible_to_owner_only() {
        let mut video = VideoDoc::create(new_video()).unwrap();
        let owner = video.owner;
        let stranger = ObjectId::new();
        assert!(video.visible_to(None));
        assert!(video.visible_to(Some(&stranger)));

        video.is_published = false;
        assert!(video.visible_to(Some(&owner)));
        assert!(!video.visible_to(Some(&stranger)));
        assert!(!video.visible_to(None));
    }

    #[test]
    fn test_view_counter_only_increments() {
        let update = increment_views();
        assert_eq!(update.keys().collect::<Vec<_>>(), vec!["$inc"]);
        assert_eq!(update.get_document("$inc").unwrap().get_i32("views").unwrap(), 1);
    }
}
