use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::queries::client::StoreError;
use crate::utils::lifecycle::ValidationError;

/// Uniform response envelope. Every handler returns this for both arms, so
/// no failure ever propagates past a handler boundary as an exception.
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
            errors: None,
        }
    }

    /// Create an error response
    pub fn error(
        status: StatusCode,
        message: impl Into<String>,
        errors: Option<serde_json::Value>,
    ) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
            errors,
        }
    }
}

impl ApiResponse<()> {
    /// 400 with the offending field named, for lifecycle validation failures.
    pub fn validation(err: ValidationError) -> Self {
        ApiResponse::error(
            StatusCode::BAD_REQUEST,
            err.to_string(),
            Some(json!({ "field": err.field })),
        )
    }

    /// Maps store-layer failures onto the envelope. Persistence failures are
    /// logged to the diagnostic sink and surfaced as a generic message.
    pub fn store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) | StoreError::EntryNotFound(_) => {
                ApiResponse::error(StatusCode::NOT_FOUND, err.to_string(), None)
            }
            StoreError::Forbidden => {
                ApiResponse::error(StatusCode::FORBIDDEN, err.to_string(), None)
            }
            StoreError::Persistence(e) => {
                tracing::error!("store failure: {e}");
                ApiResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred",
                    Some(json!({ "db_error": e.to_string() })),
                )
            }
        }
    }
}
