use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::dnsbl_check::DnsblCheckRecord;

#[derive(Debug, Clone)]
pub struct DnsblCheckRepository {
    pool: SqlitePool,
}

impl DnsblCheckRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends one zone answer to the audit trail.
    pub async fn record(
        &self,
        target: &str,
        zone: &str,
        is_listed: bool,
    ) -> Result<DnsblCheckRecord> {
        sqlx::query_as::<_, DnsblCheckRecord>(
            r#"
            INSERT INTO dnsbl_checks (target, zone, is_listed, checked_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(target)
        .bind(zone)
        .bind(is_listed)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to record DNSBL check")
    }

    pub async fn history(&self, target: &str, limit: i64) -> Result<Vec<DnsblCheckRecord>> {
        sqlx::query_as::<_, DnsblCheckRecord>(
            "SELECT * FROM dnsbl_checks WHERE target = ?1 ORDER BY checked_at DESC, id DESC LIMIT ?2",
        )
        .bind(target)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch DNSBL check history")
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM dnsbl_checks")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count DNSBL checks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::memory_pool;

    #[tokio::test]
    async fn test_history_is_newest_first_and_bounded() {
        let pool = memory_pool().await;
        let repo = DnsblCheckRepository::new(pool);

        repo.record("example.com", "zen.spamhaus.org", false)
            .await
            .unwrap();
        repo.record("example.com", "b.barracudacentral.org", true)
            .await
            .unwrap();
        repo.record("other.org", "zen.spamhaus.org", false)
            .await
            .unwrap();

        let history = repo.history("example.com", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].zone, "b.barracudacentral.org");
        assert!(history[0].is_listed);

        let bounded = repo.history("example.com", 1).await.unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
