use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use tasktrack_store::StoreError;

/// Error surface for the REST handlers. Validation problems keep their
/// message; everything else returns a generic body, with the cause logged
/// server-side only.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self(StoreError::InvalidInput(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StoreError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Task not found".to_string()),
            other => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
