//! Multipart parsing into text fields and scoped temp files
//!
//! Each file part is streamed to its own [`TempUpload`]; the temp file is
//! removed when the guard drops, whichever way the request ends.

use bytes::Bytes;
use futures::Stream;
use multer::{Constraints, Multipart, SizeLimit};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::types::{Result, VidtubeError};

/// Limits applied while reading a multipart body
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum size of any single part
    pub max_file_bytes: u64,
    /// Directory for spooled files (system temp dir when `None`)
    pub tmp_dir: Option<PathBuf>,
}

/// An uploaded file spooled to disk
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
    field: String,
    file_name: String,
    content_type: Option<String>,
    size: u64,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Form field the file arrived in
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A parsed `multipart/form-data` body
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl MultipartForm {
    /// Read every part of the body
    ///
    /// Text parts become fields; parts with a file name are spooled to temp
    /// files. A part larger than `max_file_bytes` fails the whole body.
    pub async fn parse<S, E>(stream: S, boundary: &str, limits: &UploadLimits) -> Result<Self>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().per_field(limits.max_file_bytes));
        let mut multipart = Multipart::with_constraints(stream, boundary.to_string(), constraints);
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await.map_err(size_error)? {
            let name = field.name().unwrap_or_default().to_string();
            if name.is_empty() {
                continue;
            }

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field.text().await.map_err(size_error)?;
                form.fields.insert(name, text);
                continue;
            };
            let content_type = field.content_type().map(|m| m.to_string());

            let spooled = match &limits.tmp_dir {
                Some(dir) => tempfile::Builder::new().prefix("vidtube-").tempfile_in(dir)?,
                None => tempfile::Builder::new().prefix("vidtube-").tempfile()?,
            };
            let mut writer = tokio::fs::File::from_std(spooled.reopen()?);
            let mut size = 0u64;
            while let Some(chunk) = field.chunk().await.map_err(size_error)? {
                size += chunk.len() as u64;
                writer.write_all(&chunk).await?;
            }
            writer.flush().await?;

            // Browsers send an empty part for an untouched file input
            if size == 0 && file_name.is_empty() {
                continue;
            }

            debug!(field = %name, size, "Spooled upload");
            form.files.insert(
                name.clone(),
                TempUpload {
                    file: spooled,
                    field: name,
                    file_name,
                    content_type,
                    size,
                },
            );
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Take ownership of a spooled file
    pub fn take_file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

fn size_error(err: multer::Error) -> VidtubeError {
    match err {
        multer::Error::FieldSizeExceeded { field_name, .. } => VidtubeError::InvalidInput(format!(
            "Upload '{}' exceeds the maximum allowed size",
            field_name.unwrap_or_default()
        )),
        other => other.into(),
    }
}

/// Boundary of a `multipart/form-data` content type, if it is one
pub fn boundary_from_content_type(content_type: Option<&str>) -> Option<String> {
    multer::parse_boundary(content_type?).ok()
}
