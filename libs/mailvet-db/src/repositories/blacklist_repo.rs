use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::with_busy_retry;
use crate::models::blacklist::BlacklistEntry;

#[derive(Debug, Clone)]
pub struct BlacklistRepository {
    pool: SqlitePool,
}

impl BlacklistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, email: &str) -> Result<Option<BlacklistEntry>> {
        sqlx::query_as::<_, BlacklistEntry>("SELECT * FROM email_blacklist WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch blacklist entry")
    }

    pub async fn get_all(&self) -> Result<Vec<BlacklistEntry>> {
        sqlx::query_as::<_, BlacklistEntry>(
            "SELECT * FROM email_blacklist ORDER BY first_listed_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch blacklist entries")
    }

    /// Entries that currently block sending: active and not overridden by a
    /// whitelist entry.
    pub async fn get_active(&self) -> Result<Vec<BlacklistEntry>> {
        sqlx::query_as::<_, BlacklistEntry>(
            "SELECT * FROM email_blacklist WHERE is_active = 1 AND whitelisted = 0 ORDER BY first_listed_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active blacklist entries")
    }

    pub async fn count_active(&self) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_blacklist WHERE is_active = 1 AND whitelisted = 0",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count active blacklist entries")
    }

    pub async fn count_overridden(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM email_blacklist WHERE whitelisted = 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count overridden blacklist entries")
    }

    /// Records one bounce as a single atomic upsert so concurrent bounces for
    /// the same address are both counted. Hard bounces activate the entry and
    /// overwrite the reason; soft bounces activate only once the cumulative
    /// count reaches `soft_threshold`.
    pub async fn record_bounce(
        &self,
        email: &str,
        reason: &str,
        hard: bool,
        soft_threshold: i64,
    ) -> Result<BlacklistEntry> {
        with_busy_retry("Bounce upsert", || {
            self.try_record_bounce(email, reason, hard, soft_threshold)
        })
        .await
        .context("Failed to record bounce")
    }

    async fn try_record_bounce(
        &self,
        email: &str,
        reason: &str,
        hard: bool,
        soft_threshold: i64,
    ) -> Result<BlacklistEntry, sqlx::Error> {
        sqlx::query_as::<_, BlacklistEntry>(
            r#"
            INSERT INTO email_blacklist
                (email, reason, bounce_count, is_active, first_listed_at, last_bounce_at, whitelisted)
            SELECT ?1, ?2, 1, (?3 OR 1 >= ?4), ?5, ?5,
                   EXISTS(SELECT 1 FROM email_whitelist WHERE email = ?1)
            WHERE true
            ON CONFLICT(email) DO UPDATE SET
                bounce_count = email_blacklist.bounce_count + 1,
                last_bounce_at = excluded.last_bounce_at,
                reason = CASE
                    WHEN ?3 THEN excluded.reason
                    WHEN email_blacklist.is_active = 0
                         AND email_blacklist.bounce_count + 1 >= ?4 THEN excluded.reason
                    ELSE email_blacklist.reason
                END,
                is_active = CASE
                    WHEN ?3 OR email_blacklist.bounce_count + 1 >= ?4 THEN 1
                    ELSE email_blacklist.is_active
                END
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(reason)
        .bind(hard)
        .bind(soft_threshold)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// Operator blacklisting. Activates the entry immediately and overwrites
    /// the reason; bounce history on an existing row is preserved.
    pub async fn add_manual(&self, email: &str, reason: &str) -> Result<BlacklistEntry> {
        with_busy_retry("Manual blacklist", || self.try_add_manual(email, reason))
            .await
            .context("Failed to add blacklist entry")
    }

    async fn try_add_manual(
        &self,
        email: &str,
        reason: &str,
    ) -> Result<BlacklistEntry, sqlx::Error> {
        sqlx::query_as::<_, BlacklistEntry>(
            r#"
            INSERT INTO email_blacklist
                (email, reason, bounce_count, is_active, first_listed_at, whitelisted)
            SELECT ?1, ?2, 0, 1, ?3,
                   EXISTS(SELECT 1 FROM email_whitelist WHERE email = ?1)
            WHERE true
            ON CONFLICT(email) DO UPDATE SET
                reason = excluded.reason,
                is_active = 1
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(reason)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// Administrative reset. Returns false when no entry existed.
    pub async fn delete(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM email_blacklist WHERE email = ?1")
            .bind(email)
            .execute(&self.pool)
            .await
            .context("Failed to delete blacklist entry")?;
        Ok(result.rows_affected() > 0)
    }
}
