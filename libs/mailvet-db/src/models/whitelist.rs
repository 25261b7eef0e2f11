use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A manually approved address. Presence here overrides every automated
/// signal in the deliverability decision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WhitelistEntry {
    pub id: i64,
    pub email: String,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}
