use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::approval::{Approval, Decision};
use crate::db::models::user::Role;

pub struct DecisionRecord<'a> {
    pub request_id: &'a str,
    pub approver_email: &'a str,
    pub role: Role,
    pub decision: Decision,
    pub comment: &'a str,
    pub attachment_id: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
}

/// Inserts the approver's decision, or overwrites their earlier one on the
/// same request. The ledger keeps only each approver's latest stance.
pub async fn record_decision(
    conn: &mut SqliteConnection,
    record: DecisionRecord<'_>,
) -> Result<Approval, sqlx::Error> {
    sqlx::query_as::<_, Approval>(
        r#"
        INSERT INTO approvals (request_id, approver_email, role, decision, comment, attachment_id, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (request_id, approver_email) DO UPDATE SET
            role = excluded.role,
            decision = excluded.decision,
            comment = excluded.comment,
            attachment_id = excluded.attachment_id,
            timestamp = excluded.timestamp
        RETURNING *
        "#,
    )
    .bind(record.request_id)
    .bind(record.approver_email)
    .bind(record.role)
    .bind(record.decision)
    .bind(record.comment)
    .bind(record.attachment_id)
    .bind(record.timestamp)
    .fetch_one(conn)
    .await
}

/// Ledger rows for a request, oldest decision first.
pub async fn list_for_request(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<Vec<Approval>, sqlx::Error> {
    sqlx::query_as::<_, Approval>(
        "SELECT * FROM approvals WHERE request_id = ? ORDER BY timestamp ASC, approver_email ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
}
