//! Bounce intake: what the mail transport calls after a delivery failure.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use mailvet_db::models::BlacklistEntry;
use mailvet_db::repositories::BlacklistRepository;

use crate::config::EngineConfig;
use crate::validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceKind {
    /// Permanent failure (non-existent mailbox). Blacklists immediately.
    Hard,
    /// Transient failure (mailbox full, greylisting). Blacklists only once
    /// the cumulative count reaches the configured threshold.
    Soft,
}

impl BounceKind {
    pub fn is_hard(self) -> bool {
        matches!(self, BounceKind::Hard)
    }

    pub fn reason(self) -> &'static str {
        match self {
            BounceKind::Hard => "hard bounce",
            BounceKind::Soft => "soft bounce",
        }
    }
}

pub struct BounceTracker {
    blacklist: BlacklistRepository,
    soft_threshold: i64,
}

impl BounceTracker {
    pub fn new(pool: SqlitePool, config: &EngineConfig) -> Self {
        Self {
            blacklist: BlacklistRepository::new(pool),
            soft_threshold: config.soft_bounce_threshold,
        }
    }

    /// Records one bounce and returns the post-update entry. The count and
    /// activation update is a single atomic upsert, so concurrent bounces
    /// for the same address are all counted.
    pub async fn record_bounce(&self, address: &str, kind: BounceKind) -> Result<BlacklistEntry> {
        let email = validator::canonicalize(address);
        let entry = self
            .blacklist
            .record_bounce(&email, kind.reason(), kind.is_hard(), self.soft_threshold)
            .await?;

        if entry.is_active {
            info!(
                "Recorded {} for {}: blacklisted with {} bounces",
                kind.reason(),
                email,
                entry.bounce_count
            );
        } else {
            info!(
                "Recorded {} for {}: {} of {} before blacklisting",
                kind.reason(),
                email,
                entry.bounce_count,
                self.soft_threshold
            );
        }
        Ok(entry)
    }
}
