//! Like document schema
//!
//! A like points at exactly one target through the tagged [`LikeTarget`];
//! its presence means "liked" and its absence "not liked".

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata, Toggleable};
use crate::db::schemas::Metadata;

/// Collection name for likes
pub const LIKE_COLLECTION: &str = "likes";

/// Kind of entity a like points at
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LikeKind {
    Video,
    Comment,
    Tweet,
}

impl LikeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Comment => "comment",
            Self::Tweet => "tweet",
        }
    }

    /// Parse the path segment used by the toggle routes
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "video" | "v" => Some(Self::Video),
            "comment" | "c" => Some(Self::Comment),
            "tweet" | "t" => Some(Self::Tweet),
            _ => None,
        }
    }
}

impl fmt::Display for LikeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single entity a like belongs to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LikeTarget {
    pub kind: LikeKind,
    pub id: ObjectId,
}

impl LikeTarget {
    pub fn new(kind: LikeKind, id: ObjectId) -> Self {
        Self { kind, id }
    }

    /// Filter matching every like on this target
    pub fn filter(&self) -> Document {
        doc! { "target.kind": self.kind.as_str(), "target.id": self.id }
    }
}

/// Like document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LikeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub liked_by: ObjectId,

    pub target: LikeTarget,
}

impl LikeDoc {
    pub fn new(liked_by: ObjectId, target: LikeTarget) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            liked_by,
            target,
        }
    }
}

impl Toggleable for LikeDoc {
    fn stored_id(&self) -> Option<ObjectId> {
        self._id
    }

    fn toggle_key(&self) -> Document {
        let mut key = self.target.filter();
        key.insert("liked_by", self.liked_by);
        key
    }
}

impl IntoIndexes for LikeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One like per (user, target)
            (
                doc! { "liked_by": 1, "target.kind": 1, "target.id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("liked_by_target_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "target.id": 1, "target.kind": 1 },
                Some(
                    IndexOptions::builder()
                        .name("target_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LikeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_stored_as_tagged_subdocument() {
        let video = ObjectId::new();
        let like = LikeDoc::new(ObjectId::new(), LikeTarget::new(LikeKind::Video, video));
        let stored = bson::to_document(&like).unwrap();

        let target = stored.get_document("target").unwrap();
        assert_eq!(target.get_str("kind").unwrap(), "video");
        assert_eq!(target.get_object_id("id").unwrap(), video);
        assert!(!stored.contains_key("video"));
        assert!(!stored.contains_key("comment"));
    }

    #[test]
    fn test_unknown_kind_is_rejected_at_the_boundary() {
        let stored = doc! {
            "liked_by": ObjectId::new(),
            "target": { "kind": "playlist", "id": ObjectId::new() },
        };
        assert!(bson::from_document::<LikeDoc>(stored).is_err());
    }

    #[test]
    fn test_toggle_key_covers_user_and_target() {
        let user = ObjectId::new();
        let tweet = ObjectId::new();
        let key = LikeDoc::new(user, LikeTarget::new(LikeKind::Tweet, tweet)).toggle_key();

        assert_eq!(key.get_object_id("liked_by").unwrap(), user);
        assert_eq!(key.get_str("target.kind").unwrap(), "tweet");
        assert_eq!(key.get_object_id("target.id").unwrap(), tweet);
    }

    #[test]
    fn test_route_segments() {
        assert_eq!(LikeKind::from_segment("video"), Some(LikeKind::Video));
        assert_eq!(LikeKind::from_segment("c"), Some(LikeKind::Comment));
        assert_eq!(LikeKind::from_segment("tweet"), Some(LikeKind::Tweet));
        assert_eq!(LikeKind::from_segment("playlist"), None);
    }
}
