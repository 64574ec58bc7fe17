use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// ✅ **Attachment metadata stored in the database** (bytes live in the blob store)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub attachment_id: String,
    pub request_id: String,
    pub file_name: String,
    pub file_type: String,
    pub version: i64,
    pub title: String,
    pub size: i64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata supplied alongside the bytes on upload.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub request_id: String,
    pub file_name: String,
    pub file_type: String,
    pub version: i64,
    pub title: String,
    pub uploaded_by: String,
}

#[derive(Serialize, ToSchema)]
pub struct AttachmentUploadSchema {
    /// The file to be uploaded (multipart/form-data)
    file: String,
    /// Details version the file belongs to; defaults to the latest
    version: Option<i64>,
    /// Display title; defaults to the file name
    title: Option<String>,
}
