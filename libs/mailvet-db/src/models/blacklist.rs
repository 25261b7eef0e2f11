use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One reputation record per address that has ever bounced or been listed.
///
/// `is_active` separates rows that actually block sending from rows that only
/// accumulate soft-bounce history below the threshold. `bounce_count` is
/// monotonic and never reset by normal operation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlacklistEntry {
    pub id: i64,
    pub email: String,
    pub reason: String,
    pub bounce_count: i64,
    pub is_active: bool,
    pub first_listed_at: DateTime<Utc>,
    pub last_bounce_at: Option<DateTime<Utc>>,
    /// True while a whitelist entry exists for this address. Kept consistent
    /// with `email_whitelist` by updating both inside one transaction.
    pub whitelisted: bool,
}

impl BlacklistEntry {
    /// Whether this entry currently blocks sending.
    pub fn is_gating(&self) -> bool {
        self.is_active && !self.whitelisted
    }
}
