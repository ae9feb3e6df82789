//! Media host integration
//!
//! Binary assets (avatars, cover images, videos, thumbnails) never live in
//! the database. Uploads are spooled to scoped temp files, relayed to a
//! Cloudinary-compatible host, and only the returned URLs are stored.

pub mod cloudinary;
pub mod upload;

pub use cloudinary::CloudinaryClient;
pub use upload::{boundary_from_content_type, MultipartForm, TempUpload, UploadLimits};

use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};

use crate::types::Result;

/// Resource class on the media host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Video,
    /// Let the host detect the type (uploads only)
    Auto,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the host returns for a stored asset
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
    /// Seconds, present for audio and video
    pub duration: Option<f64>,
}

/// Storage backend for binary assets
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Relay a spooled upload to the host
    async fn upload(&self, file: &TempUpload, kind: ResourceKind) -> Result<UploadedAsset>;

    /// Remove assets by their URLs
    async fn delete(&self, urls: &[String], kind: ResourceKind) -> Result<()>;
}

/// Delete assets, logging instead of failing
///
/// Used after the database write has already succeeded, where a leftover
/// asset must not turn a completed request into an error.
pub async fn delete_quietly(media: &dyn MediaStore, urls: Vec<String>, kind: ResourceKind) {
    let urls: Vec<String> = urls.into_iter().filter(|u| !u.is_empty()).collect();
    if urls.is_empty() {
        return;
    }

    match media.delete(&urls, kind).await {
        Ok(()) => info!(count = urls.len(), kind = %kind, "Removed assets from media host"),
        Err(e) => warn!(error = %e, urls = ?urls, "Failed to remove assets from media host"),
    }
}

/// Public id of an asset, taken from its delivery URL
///
/// `https://host/<cloud>/image/upload/v1712/abc123.png` → `abc123`: the
/// segment two after `upload`, without its extension.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let segments: Vec<&str> = url.split('/').collect();
    let upload = segments.iter().position(|s| *s == "upload")?;
    let segment = segments.get(upload + 2)?;
    let id = segment.split('.').next().unwrap_or_default();

    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_from_delivery_url() {
        assert_eq!(
            public_id_from_url(
                "http://res.cloudinary.com/demo/image/upload/v1712345678/p5dbvx6rdx5sp7szocxj.png"
            )
            .as_deref(),
            Some("p5dbvx6rdx5sp7szocxj")
        );
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/video/upload/v1/clip.mp4")
                .as_deref(),
            Some("clip")
        );
    }

    #[test]
    fn test_public_id_needs_upload_segment() {
        assert_eq!(public_id_from_url("https://example.com/a/b/c.png"), None);
        assert_eq!(public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1"), None);
        assert_eq!(public_id_from_url(""), None);
    }
}
