use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::error::RegistryResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open the embedded-file Registry store in WAL mode with a multi-second
/// busy-wait, per §4.3: the process using this pool MUST be the sole
/// writer, since SQLite's file lock cannot be safely shared across
/// processes even with WAL journaling.
pub async fn connect(database_url: &str) -> RegistryResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));

    // A single writer connection avoids SQLITE_BUSY entirely for the
    // common case; reads may still use additional connections.
    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// An in-memory store for tests: each call gets an isolated database that
/// disappears when the returned pool is dropped.
pub async fn connect_in_memory() -> RegistryResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
