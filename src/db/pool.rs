use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::config::Config;

/// Connection settings shared by the server pool and the concurrency tests.
pub fn tune_connect_options(options: SqliteConnectOptions) -> SqliteConnectOptions {
    options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
}

pub fn pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .idle_timeout(Duration::from_secs(30))
}

/// Opens the pool and applies the embedded migrations.
pub async fn get_db_pool(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = tune_connect_options(SqliteConnectOptions::from_str(&config.database_url)?);
    let pool = pool_options().connect_with(options).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database ready at {}", config.database_url);

    Ok(pool)
}

/// Starts a transaction that holds the database write lock from `BEGIN`.
///
/// A deferred transaction that reads before writing cannot upgrade its lock
/// once another connection has committed, so every read-then-write path
/// starts here instead of `pool.begin()`.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}
