use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use crate::db::models::details::{column_name, DetailFields, DetailsRecord};
use crate::workflow::error::{WorkflowError, WorkflowResult};

fn field_columns<D: DetailsRecord>() -> Vec<String> {
    <D::Fields as DetailFields>::FIELDS
        .iter()
        .map(|f| column_name(f))
        .collect()
}

/// Reads one exact version, if stored.
pub async fn get_version<D: DetailsRecord>(
    conn: &mut SqliteConnection,
    request_id: &str,
    version: i64,
) -> Result<Option<D>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE request_id = ? AND version = ?",
        D::TABLE
    );
    sqlx::query_as::<_, D>(&sql)
        .bind(request_id)
        .bind(version)
        .fetch_optional(conn)
        .await
}

async fn max_version<D: DetailsRecord>(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!("SELECT MAX(version) FROM {} WHERE request_id = ?", D::TABLE);
    sqlx::query_scalar::<_, Option<i64>>(&sql)
        .bind(request_id)
        .fetch_one(conn)
        .await
}

/// Upserts the (request_id, version) snapshot and returns the stored row.
///
/// * latest version saved again by the same caller: overwritten in place
/// * same version already saved by someone else: conflict
/// * new version not above the stored latest: conflict
///
/// Callers own the transaction; concurrent inserts of the same new version
/// are rejected by the primary key.
pub async fn save_version<D: DetailsRecord>(
    conn: &mut SqliteConnection,
    request_id: &str,
    version: i64,
    fields: &D::Fields,
    saved_by: &str,
) -> WorkflowResult<D> {
    if version < 1 {
        return Err(WorkflowError::Validation(format!(
            "version must be a positive integer, got {version}"
        )));
    }
    fields.validate()?;

    let columns = field_columns::<D>();
    let values: Vec<Option<String>> = <D::Fields as DetailFields>::FIELDS
        .iter()
        .map(|f| fields.value(f).map(str::to_string))
        .collect();
    let saved_at = Utc::now();

    let latest = max_version::<D>(&mut *conn, request_id).await?;

    match get_version::<D>(&mut *conn, request_id, version).await? {
        Some(existing) if existing.saved_by() != saved_by => {
            return Err(WorkflowError::Conflict(format!(
                "version {version} of {request_id} was already saved by {}",
                existing.saved_by()
            )));
        }
        Some(_) if latest.is_some_and(|latest| version < latest) => {
            return Err(WorkflowError::Conflict(format!(
                "version {version} of {request_id} is stale; latest is {}",
                latest.unwrap_or(version)
            )));
        }
        Some(_) => {
            let assignments = columns
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {assignments}, saved_at = ? WHERE request_id = ? AND version = ?",
                D::TABLE
            );
            let mut query = sqlx::query(&sql);
            for value in &values {
                query = query.bind(value.as_deref());
            }
            query
                .bind(saved_at)
                .bind(request_id)
                .bind(version)
                .execute(&mut *conn)
                .await?;
            tracing::info!(request_id, version, "details version overwritten by retry");
        }
        None => {
            if let Some(latest) = latest {
                if version <= latest {
                    return Err(WorkflowError::Conflict(format!(
                        "version {version} of {request_id} is stale; latest is {latest}"
                    )));
                }
            }
            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} (request_id, version, {}, saved_by, saved_at) VALUES (?, ?, {placeholders}, ?, ?)",
                D::TABLE,
                columns.join(", ")
            );
            let mut query = sqlx::query(&sql).bind(request_id).bind(version);
            for value in &values {
                query = query.bind(value.as_deref());
            }
            query
                .bind(saved_by)
                .bind(saved_at)
                .execute(&mut *conn)
                .await?;
            tracing::info!(request_id, version, "details version saved");
        }
    }

    get_version::<D>(&mut *conn, request_id, version)
        .await?
        .ok_or_else(|| WorkflowError::not_found(format!("Version {version} of {request_id}")))
}

/// Snapshot with the highest version, if any exist.
pub async fn get_latest<'e, D: DetailsRecord>(
    executor: impl SqliteExecutor<'e>,
    request_id: &str,
) -> Result<Option<D>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE request_id = ? ORDER BY version DESC LIMIT 1",
        D::TABLE
    );
    sqlx::query_as::<_, D>(&sql)
        .bind(request_id)
        .fetch_optional(executor)
        .await
}

/// Every snapshot of the request, newest first.
pub async fn get_all_versions<D: DetailsRecord>(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<Vec<D>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE request_id = ? ORDER BY version DESC",
        D::TABLE
    );
    sqlx::query_as::<_, D>(&sql)
        .bind(request_id)
        .fetch_all(pool)
        .await
}

/// Two most recent snapshots, newest first.
pub async fn get_latest_two<D: DetailsRecord>(
    pool: &SqlitePool,
    request_id: &str,
) -> Result<Vec<D>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE request_id = ? ORDER BY version DESC LIMIT 2",
        D::TABLE
    );
    sqlx::query_as::<_, D>(&sql)
        .bind(request_id)
        .fetch_all(pool)
        .await
}
