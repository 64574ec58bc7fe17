//! Human readable request identifiers: `{N|C}_{DDMMYYYY}_{seq3}`.

use chrono::{Local, NaiveDate};
use sqlx::SqliteConnection;

use crate::db::models::requests::RequestKind;
use crate::db::queries::counters::increment_counter;
use crate::workflow::error::WorkflowResult;

impl RequestKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            RequestKind::New => "N",
            RequestKind::Change => "C",
        }
    }
}

pub fn format_request_id(kind: RequestKind, day: NaiveDate, seq: i64) -> String {
    format!("{}_{}_{:03}", kind.id_prefix(), day.format("%d%m%Y"), seq)
}

/// Allocates the next id for `kind` on `day`.
///
/// The counter bump is a single upsert statement; there is no read-then-write
/// fallback, so a failing store fails the allocation.
pub async fn allocate_on(
    conn: &mut SqliteConnection,
    kind: RequestKind,
    day: NaiveDate,
) -> WorkflowResult<String> {
    let seq = increment_counter(conn, kind.id_prefix(), &day.format("%Y%m%d").to_string()).await?;
    let request_id = format_request_id(kind, day, seq);
    tracing::debug!(%request_id, "allocated request id");
    Ok(request_id)
}

/// Allocates an id for today's local calendar day.
pub async fn allocate(conn: &mut SqliteConnection, kind: RequestKind) -> WorkflowResult<String> {
    allocate_on(conn, kind, Local::now().date_naive()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_dated_and_padded() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(format_request_id(RequestKind::New, day, 1), "N_01012025_001");
        assert_eq!(format_request_id(RequestKind::Change, day, 42), "C_01012025_042");
        assert_eq!(format_request_id(RequestKind::New, day, 1000), "N_01012025_1000");
    }
}
