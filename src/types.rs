// Error types shared by the storage layer, the folder engine and the routes

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use s3::error::S3Error;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A multi-object folder operation failed part way through.
    /// Objects already handled are left where they are.
    #[error("Folder operation stopped after {completed} of {total} objects: {message}")]
    PartialTransform {
        completed: usize,
        total: usize,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Storage(_) => "storage_error",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::PartialTransform { .. } => "partial_transform",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::PartialTransform { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<S3Error> for AppError {
    fn from(e: S3Error) -> Self {
        match e {
            S3Error::HttpFailWithBody(404, body) => AppError::NotFound(body),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::InvalidRequest(format!("malformed JSON content: {}", e))
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::InvalidRequest(format!("malformed multipart body: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let mut body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let AppError::PartialTransform { completed, total, .. } = &self {
            body["completed"] = serde_json::json!(completed);
            body["total"] = serde_json::json!(total);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_not_found_maps_to_not_found() {
        let err: AppError = S3Error::HttpFailWithBody(404, "NoSuchKey".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_other_s3_failures_are_storage_errors() {
        let err: AppError = S3Error::HttpFailWithBody(503, "SlowDown".to_string()).into();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_partial_transform_message() {
        let err = AppError::PartialTransform {
            completed: 2,
            total: 5,
            message: "copy failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Folder operation stopped after 2 of 5 objects: copy failed"
        );
        assert_eq!(err.kind(), "partial_transform");
    }
}
