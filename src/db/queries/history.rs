use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use crate::db::models::history::{HistoryAction, HistoryEntry, HistoryMetadata};
use crate::workflow::error::WorkflowResult;

#[derive(FromRow)]
struct HistoryRow {
    id: i64,
    request_id: String,
    timestamp: DateTime<Utc>,
    action: HistoryAction,
    user: String,
    metadata: String,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = serde_json::Error;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryEntry {
            id: row.id,
            request_id: row.request_id,
            timestamp: row.timestamp,
            action: row.action,
            user: row.user,
            metadata: serde_json::from_str(&row.metadata)?,
        })
    }
}

/// Appends one audit entry. Entries are never updated afterwards.
pub async fn append<'e>(
    executor: impl SqliteExecutor<'e>,
    request_id: &str,
    action: HistoryAction,
    user: &str,
    timestamp: DateTime<Utc>,
    metadata: &HistoryMetadata,
) -> WorkflowResult<HistoryEntry> {
    let row = sqlx::query_as::<_, HistoryRow>(
        r#"
        INSERT INTO history_logs (request_id, timestamp, action, user, metadata)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, request_id, timestamp, action, user, metadata
        "#,
    )
    .bind(request_id)
    .bind(timestamp)
    .bind(action)
    .bind(user)
    .bind(serde_json::to_string(metadata)?)
    .fetch_one(executor)
    .await?;

    Ok(HistoryEntry::try_from(row)?)
}

/// Timeline for a request in timestamp order; the row id breaks ties.
pub async fn list_for_request(
    pool: &SqlitePool,
    request_id: &str,
) -> WorkflowResult<Vec<HistoryEntry>> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT id, request_id, timestamp, action, user, metadata
        FROM history_logs
        WHERE request_id = ?
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| HistoryEntry::try_from(row).map_err(Into::into))
        .collect()
}
