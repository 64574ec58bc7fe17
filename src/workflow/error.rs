use axum::http::StatusCode;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors surfaced by the workflow core.
///
/// Notification and post-commit audit failures never show up here; they are
/// logged where they happen.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Store(sqlx::Error),

    #[error("Blob store error: {0}")]
    Blob(#[from] std::io::Error),

    #[error("Failed to serialize data: {0}")]
    Serialization(#[from] serde_json::Error),
}

// SQLITE_BUSY_SNAPSHOT: the transaction read a snapshot another writer has
// since replaced. A plain SQLITE_BUSY is a lock timeout and stays a store error.
const SQLITE_BUSY_SNAPSHOT: &str = "517";

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return WorkflowError::Conflict(db_err.message().to_string());
            }
            if db_err.code().is_some_and(|code| code == SQLITE_BUSY_SNAPSHOT) {
                return WorkflowError::Conflict(
                    "a concurrent write touched the same request; retry with fresh state".into(),
                );
            }
        }
        WorkflowError::Store(err)
    }
}

impl WorkflowError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        WorkflowError::NotFound(what.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::Authorization(_) => StatusCode::FORBIDDEN,
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Store(_) | WorkflowError::Blob(_) | WorkflowError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_http_status() {
        assert_eq!(
            WorkflowError::Validation("comment".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WorkflowError::Authorization("role".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(WorkflowError::not_found("Request X").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            WorkflowError::Conflict("version".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WorkflowError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
