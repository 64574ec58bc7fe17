use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::workflow::error::WorkflowError;

/// JSON envelope returned by every endpoint. Workflow errors convert into
/// the error form, so handlers can use `?` on service calls.
#[derive(Debug, Serialize, Deserialize)]
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

impl From<WorkflowError> for ApiResponse<()> {
    fn from(err: WorkflowError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!("workflow operation failed: {err}");
        }
        let errors = match &err {
            WorkflowError::Store(e) => Some(json!({ "db_error": e.to_string() })),
            WorkflowError::Blob(e) => Some(json!({ "io_error": e.to_string() })),
            _ => None,
        };
        ApiResponse::error(status, err.to_string(), errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_keep_their_message() {
        let response: ApiResponse<()> = WorkflowError::not_found("Request N_01012025_001").into();
        assert!(!response.success);
        assert_eq!(response.status_code, 404);
        assert_eq!(response.message, "Request N_01012025_001 not found");
        assert!(response.errors.is_none());
    }

    #[test]
    fn store_errors_carry_the_database_message() {
        let response: ApiResponse<()> = WorkflowError::Store(sqlx::Error::RowNotFound).into();
        assert_eq!(response.status_code, 500);
        assert!(response.errors.is_some_and(|e| e["db_error"].is_string()));
    }
}
