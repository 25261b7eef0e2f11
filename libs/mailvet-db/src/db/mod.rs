use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Opens the reputation store, creating the database file and applying
/// migrations on first use.
pub async fn init_db(database_url: &str) -> Result<SqlitePool> {
    if !database_url.starts_with("sqlite:") {
        return Err(anyhow::anyhow!("DATABASE_URL must start with sqlite:"));
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .context("Invalid SQLite connection string")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to open reputation store")?;

    crate::MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run DB migrations")?;

    tracing::debug!("Reputation store ready at {}", database_url);
    Ok(pool)
}

const LOCK_RETRIES: u32 = 3;

/// Runs a store write, retrying a bounded number of times when SQLite
/// reports the database busy or locked, then propagating the error.
pub async fn with_busy_retry<T, F, Fut>(what: &str, mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < LOCK_RETRIES && is_locked(&e) => {
                attempt += 1;
                tracing::debug!(
                    "{} hit a locked store, retrying ({}/{})",
                    what,
                    attempt,
                    LOCK_RETRIES
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// True for SQLITE_BUSY/SQLITE_LOCKED failures, which are transient and safe
/// to retry once the competing writer finishes.
pub fn is_locked(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let message = db.message();
            message.contains("database is locked") || message.contains("database table is locked")
        }
        _ => false,
    }
}
