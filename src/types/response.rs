//! Uniform success and failure envelopes
//!
//! Success: `{statusCode, data, message, success: true}`
//! Failure: `{statusCode, message, success: false, errors: []}`

use hyper::StatusCode;
use serde::Serialize;

use crate::types::VidtubeError;

/// Successful response envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.is_success(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK)
    }
}

/// Error response envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub success: bool,
    pub errors: Vec<String>,
}

impl ErrorBody {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&VidtubeError> for ErrorBody {
    fn from(err: &VidtubeError) -> Self {
        Self {
            status_code: err.status_code().as_u16(),
            message: err.to_string(),
            success: false,
            errors: err.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let body = ApiResponse::ok(json!({ "isLiked": true }), "Video liked");
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "statusCode": 200,
                "data": { "isLiked": true },
                "message": "Video liked",
                "success": true,
            })
        );
    }

    #[test]
    fn test_created_envelope_echoes_status() {
        let body = ApiResponse::new(StatusCode::CREATED, json!({}), "User registered");
        assert_eq!(body.status(), StatusCode::CREATED);
        assert_eq!(body.status_code, 201);
        assert!(body.success);
    }

    #[test]
    fn test_error_envelope_shape() {
        let err = VidtubeError::Forbidden("Only the owner can edit this video".into());
        let value = serde_json::to_value(ErrorBody::from(&err)).unwrap();

        assert_eq!(
            value,
            json!({
                "statusCode": 403,
                "message": "Only the owner can edit this video",
                "success": false,
                "errors": [],
            })
        );
    }
}
