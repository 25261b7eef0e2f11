use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::with_busy_retry;
use crate::models::whitelist::WhitelistEntry;

#[derive(Debug, Clone)]
pub struct WhitelistRepository {
    pool: SqlitePool,
}

impl WhitelistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, email: &str) -> Result<Option<WhitelistEntry>> {
        sqlx::query_as::<_, WhitelistEntry>("SELECT * FROM email_whitelist WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch whitelist entry")
    }

    pub async fn get_all(&self) -> Result<Vec<WhitelistEntry>> {
        sqlx::query_as::<_, WhitelistEntry>("SELECT * FROM email_whitelist ORDER BY added_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch whitelist entries")
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM email_whitelist")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count whitelist entries")
    }

    /// Idempotent approval. Re-adding refreshes the notes and leaves a single
    /// row; the blacklist override flag is updated in the same transaction.
    pub async fn add(&self, email: &str, notes: Option<&str>) -> Result<WhitelistEntry> {
        with_busy_retry("Whitelist add", || self.try_add(email, notes))
            .await
            .context("Failed to add whitelist entry")
    }

    async fn try_add(
        &self,
        email: &str,
        notes: Option<&str>,
    ) -> Result<WhitelistEntry, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query_as::<_, WhitelistEntry>(
            r#"
            INSERT INTO email_whitelist (email, notes, added_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(email) DO UPDATE SET notes = excluded.notes
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE email_blacklist SET whitelisted = 1 WHERE email = ?1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Removes an approval and clears the blacklist override flag in the same
    /// transaction. Returns false when no entry existed.
    pub async fn remove(&self, email: &str) -> Result<bool> {
        let rows = with_busy_retry("Whitelist remove", || self.try_remove(email))
            .await
            .context("Failed to remove whitelist entry")?;
        Ok(rows > 0)
    }

    async fn try_remove(&self, email: &str) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM email_whitelist WHERE email = ?1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE email_blacklist SET whitelisted = 0 WHERE email = ?1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::blacklist_repo::BlacklistRepository;
    use crate::test_util::memory_pool;

    #[tokio::test]
    async fn test_add_is_idempotent_and_refreshes_notes() {
        let pool = memory_pool().await;
        let repo = WhitelistRepository::new(pool);

        repo.add("a@example.com", Some("first")).await.unwrap();
        let second = repo.add("a@example.com", Some("updated")).await.unwrap();

        assert_eq!(second.notes.as_deref(), Some("updated"));
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_and_remove_maintain_blacklist_flag() {
        let pool = memory_pool().await;
        let blacklist = BlacklistRepository::new(pool.clone());
        let repo = WhitelistRepository::new(pool);

        blacklist
            .record_bounce("b@example.com", "hard bounce", true, 3)
            .await
            .unwrap();

        repo.add("b@example.com", Some("known good")).await.unwrap();
        let entry = blacklist.find("b@example.com").await.unwrap().unwrap();
        assert!(entry.whitelisted);
        assert!(!entry.is_gating());

        assert!(repo.remove("b@example.com").await.unwrap());
        let entry = blacklist.find("b@example.com").await.unwrap().unwrap();
        assert!(!entry.whitelisted);
        assert!(entry.is_gating());
    }

    #[tokio::test]
    async fn test_remove_reports_missing_entry() {
        let pool = memory_pool().await;
        let repo = WhitelistRepository::new(pool);

        assert!(!repo.remove("ghost@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_locked_store_propagates_after_bounded_retries() {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use sqlx::{Connection, SqliteConnection};
        use std::str::FromStr;
        use std::time::Duration;

        let path = std::env::temp_dir().join(format!(
            "mailvet-locked-{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .unwrap()
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(20));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .unwrap();
        crate::MIGRATOR.run(&pool).await.unwrap();

        let mut blocker = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::query("BEGIN EXCLUSIVE")
            .execute(&mut blocker)
            .await
            .unwrap();

        // The write must surface a hard error, never silently succeed or
        // read as "no record".
        let repo = WhitelistRepository::new(pool.clone());
        let err = repo
            .add("locked@example.com", None)
            .await
            .expect_err("write against a locked store must fail");
        assert!(err.to_string().contains("Failed to add whitelist entry"));

        sqlx::query("COMMIT").execute(&mut blocker).await.unwrap();
        repo.add("locked@example.com", None).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
