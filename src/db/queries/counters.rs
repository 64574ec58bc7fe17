use sqlx::SqliteConnection;

/// Bumps the (prefix, day) counter and returns the post-increment value in
/// one statement, inserting the row at 1 on the first allocation of the day.
pub async fn increment_counter(
    conn: &mut SqliteConnection,
    prefix: &str,
    yyyymmdd: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO request_id_counters (prefix, yyyymmdd, last_seq)
        VALUES (?, ?, 1)
        ON CONFLICT (prefix, yyyymmdd) DO UPDATE SET last_seq = last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(prefix)
    .bind(yyyymmdd)
    .fetch_one(conn)
    .await
}
