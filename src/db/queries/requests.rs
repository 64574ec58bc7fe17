use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::requests::{Request, RequestFilter, RequestKind, RequestStatus, RequestType};

pub struct InsertRequest<'a> {
    pub request_id: &'a str,
    pub request_type: RequestType,
    pub request_kind: RequestKind,
    pub original_request_id: Option<&'a str>,
    pub title: &'a str,
    pub status: RequestStatus,
    pub created_by: &'a str,
    pub now: DateTime<Utc>,
}

pub async fn insert_request(
    conn: &mut SqliteConnection,
    new: InsertRequest<'_>,
) -> Result<Request, sqlx::Error> {
    sqlx::query_as::<_, Request>(
        r#"
        INSERT INTO requests (request_id, request_type, request_kind, original_request_id,
                              title, status, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.request_id)
    .bind(new.request_type)
    .bind(new.request_kind)
    .bind(new.original_request_id)
    .bind(new.title)
    .bind(new.status)
    .bind(new.created_by)
    .bind(new.now)
    .bind(new.now)
    .fetch_one(conn)
    .await
}

pub async fn find_request(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> Result<Option<Request>, sqlx::Error> {
    sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE request_id = ?")
        .bind(request_id)
        .fetch_optional(conn)
        .await
}

pub async fn get_request(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<Option<Request>, sqlx::Error> {
    sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE request_id = ?")
        .bind(request_id)
        .fetch_optional(pool)
        .await
}

/// Lists requests, newest activity first.
pub async fn list_requests(
    pool: &SqlitePool,
    filter: &RequestFilter,
) -> Result<Vec<Request>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM requests WHERE 1 = 1");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(request_type) = filter.request_type {
        builder.push(" AND request_type = ").push_bind(request_type);
    }
    if let Some(created_by) = &filter.created_by {
        builder
            .push(" AND created_by = ")
            .push_bind(created_by.trim().to_ascii_lowercase());
    }
    builder.push(" ORDER BY updated_at DESC, request_id DESC");

    builder.build_query_as::<Request>().fetch_all(pool).await
}

pub async fn list_by_status(
    pool: &SqlitePool,
    status: RequestStatus,
) -> Result<Vec<Request>, sqlx::Error> {
    sqlx::query_as::<_, Request>(
        "SELECT * FROM requests WHERE status = ? ORDER BY updated_at ASC, request_id ASC",
    )
    .bind(status)
    .fetch_all(pool)
    .await
}

/// Writes a new status. Last write wins between concurrent approvers.
pub async fn update_status(
    conn: &mut SqliteConnection,
    request_id: &str,
    status: RequestStatus,
    now: DateTime<Utc>,
) -> Result<Request, sqlx::Error> {
    sqlx::query_as::<_, Request>(
        "UPDATE requests SET status = ?, updated_at = ? WHERE request_id = ? RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(request_id)
    .fetch_one(conn)
    .await
}

/// Resets status and title after a details resubmission.
pub async fn update_after_resubmission(
    conn: &mut SqliteConnection,
    request_id: &str,
    title: &str,
    now: DateTime<Utc>,
) -> Result<Request, sqlx::Error> {
    sqlx::query_as::<_, Request>(
        "UPDATE requests SET status = ?, title = ?, updated_at = ? WHERE request_id = ? RETURNING *",
    )
    .bind(RequestStatus::INITIAL)
    .bind(title)
    .bind(now)
    .bind(request_id)
    .fetch_one(conn)
    .await
}
