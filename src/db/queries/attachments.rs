use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::attachment::{Attachment, NewAttachment};

pub async fn insert_attachment(
    pool: &SqlitePool,
    attachment_id: &str,
    meta: &NewAttachment,
    size: i64,
    uploaded_at: DateTime<Utc>,
) -> Result<Attachment, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(
        r#"
        INSERT INTO attachments (attachment_id, request_id, file_name, file_type, version,
                                 title, size, uploaded_by, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(attachment_id)
    .bind(&meta.request_id)
    .bind(&meta.file_name)
    .bind(&meta.file_type)
    .bind(meta.version)
    .bind(&meta.title)
    .bind(size)
    .bind(&meta.uploaded_by)
    .bind(uploaded_at)
    .fetch_one(pool)
    .await
}

pub async fn get_attachment(
    pool: &SqlitePool,
    attachment_id: &str,
) -> Result<Option<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE attachment_id = ?")
        .bind(attachment_id)
        .fetch_optional(pool)
        .await
}

/// Attachments of a request, newest details version first.
pub async fn list_for_request(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<Vec<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(
        "SELECT * FROM attachments WHERE request_id = ? ORDER BY version DESC, uploaded_at ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
}
