//! Error types for vidtube
//!
//! Every handler failure ends up as one of these variants and is rendered
//! through [`crate::types::ErrorBody`].

use hyper::StatusCode;

/// MongoDB server error code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Main error type for vidtube operations
#[derive(Debug, thiserror::Error)]
pub enum VidtubeError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Media host error: {0}")]
    Media(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VidtubeError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::MissingFields(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Media(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Field-level details carried into the `errors` array of the envelope
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::MissingFields(fields) => fields.clone(),
            _ => Vec::new(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<std::io::Error> for VidtubeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for VidtubeError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for VidtubeError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for VidtubeError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            Self::Conflict("Resource already exists".into())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<bson::oid::Error> for VidtubeError {
    fn from(err: bson::oid::Error) -> Self {
        Self::InvalidInput(format!("Invalid identifier: {}", err))
    }
}

impl From<bson::de::Error> for VidtubeError {
    fn from(err: bson::de::Error) -> Self {
        Self::Internal(format!("Failed to decode document: {}", err))
    }
}

impl From<bson::ser::Error> for VidtubeError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("Failed to encode document: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for VidtubeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

impl From<reqwest::Error> for VidtubeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("media host".into())
        } else {
            Self::Media(err.to_string())
        }
    }
}

impl From<multer::Error> for VidtubeError {
    fn from(err: multer::Error) -> Self {
        Self::InvalidInput(format!("Invalid multipart body: {}", err))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Result type alias for vidtube operations
pub type Result<T> = std::result::Result<T, VidtubeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            VidtubeError::InvalidInput("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VidtubeError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            VidtubeError::Forbidden("not owner".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            VidtubeError::NotFound("video".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            VidtubeError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            VidtubeError::Media("upload".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            VidtubeError::Timeout("database".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let err = VidtubeError::MissingFields(vec!["title".into(), "description".into()]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing required fields: title, description");
        assert_eq!(err.details(), vec!["title", "description"]);
    }

    #[test]
    fn test_invalid_object_id_maps_to_bad_request() {
        let err: VidtubeError = bson::oid::ObjectId::parse_str("not-an-id").unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
