use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One DNSBL zone answer, appended per interactive check and never mutated.
/// Used for reporting and audit only; live decisions re-query the zones.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DnsblCheckRecord {
    pub id: i64,
    pub target: String,
    pub zone: String,
    pub is_listed: bool,
    pub checked_at: DateTime<Utc>,
}
