//! Aggregate reporting over the reputation store. Read-only, no network.

use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use mailvet_db::models::{BlacklistEntry, WhitelistEntry};
use mailvet_db::repositories::{BlacklistRepository, DnsblCheckRepository, WhitelistRepository};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Actively gating blacklist entries.
    pub blacklist_count: i64,
    pub whitelist_count: i64,
    /// Blacklist rows currently overridden by a whitelist entry.
    pub overridden_count: i64,
    /// Size of the DNSBL audit trail.
    pub dnsbl_check_count: i64,
    pub blacklist_entries: Vec<BlacklistEntry>,
    pub whitelist_entries: Vec<WhitelistEntry>,
}

pub struct ReportGenerator {
    blacklist: BlacklistRepository,
    whitelist: WhitelistRepository,
    history: DnsblCheckRepository,
}

impl ReportGenerator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            blacklist: BlacklistRepository::new(pool.clone()),
            whitelist: WhitelistRepository::new(pool.clone()),
            history: DnsblCheckRepository::new(pool),
        }
    }

    pub async fn generate(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            blacklist_count: self.blacklist.count_active().await?,
            whitelist_count: self.whitelist.count().await?,
            overridden_count: self.blacklist.count_overridden().await?,
            dnsbl_check_count: self.history.count().await?,
            blacklist_entries: self.blacklist.get_active().await?,
            whitelist_entries: self.whitelist.get_all().await?,
        })
    }
}
