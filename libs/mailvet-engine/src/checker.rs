//! The deliverability decision. Strict precedence: format, then whitelist,
//! then blacklist; everything network-derived is advisory.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use mailvet_db::repositories::{BlacklistRepository, DnsblCheckRepository, WhitelistRepository};

use crate::auth::{AuthPostureResult, DomainAuthValidator};
use crate::config::EngineConfig;
use crate::dns::DnsClient;
use crate::dnsbl::{DnsblResolver, DnsblResult};
use crate::validator;

#[derive(Debug, Clone, Serialize)]
pub struct DeliverabilityReport {
    pub email: String,
    pub is_valid_format: bool,
    pub is_whitelisted: bool,
    /// Actively gating blacklist state. Factual even when whitelisting wins,
    /// so "previously bad, now approved" is visible to operators.
    pub is_blacklisted: bool,
    pub bounce_count: i64,
    pub last_bounce_at: Option<DateTime<Utc>>,
    pub whitelist_notes: Option<String>,
    /// The stored blacklist reason, present whenever an entry exists, even
    /// when a whitelist override wins the decision.
    pub blacklist_reason: Option<String>,
    /// Why sending is refused, when it is.
    pub reason: Option<String>,
    pub dnsbl: Option<DnsblResult>,
    pub auth_posture: Option<AuthPostureResult>,
    pub should_send: bool,
}

impl DeliverabilityReport {
    fn rejected_format(address: &str, failure: Option<String>) -> Self {
        Self {
            email: address.trim().to_string(),
            is_valid_format: false,
            is_whitelisted: false,
            is_blacklisted: false,
            bounce_count: 0,
            last_bounce_at: None,
            whitelist_notes: None,
            blacklist_reason: None,
            reason: Some(format!(
                "invalid address format: {}",
                failure.unwrap_or_else(|| "malformed address".to_string())
            )),
            dnsbl: None,
            auth_posture: None,
            should_send: false,
        }
    }
}

pub struct DeliverabilityChecker {
    blacklist: BlacklistRepository,
    whitelist: WhitelistRepository,
    history: DnsblCheckRepository,
    dnsbl: DnsblResolver,
    auth: DomainAuthValidator,
    config: EngineConfig,
}

impl DeliverabilityChecker {
    pub fn new(pool: SqlitePool, dns: Arc<dyn DnsClient>, config: EngineConfig) -> Self {
        Self {
            blacklist: BlacklistRepository::new(pool.clone()),
            whitelist: WhitelistRepository::new(pool.clone()),
            history: DnsblCheckRepository::new(pool),
            dnsbl: DnsblResolver::new(dns.clone(), config.dnsbl_zones.clone()),
            auth: DomainAuthValidator::new(dns),
            config,
        }
    }

    /// The local-only decision: format, whitelist, blacklist. Always
    /// computable without network; this is what the mail transport calls on
    /// the send path. Store errors propagate; an unreachable store must
    /// never read as "no record".
    pub async fn evaluate(&self, address: &str) -> Result<DeliverabilityReport> {
        let validation = validator::validate(address);
        let Some(email) = validation.normalized else {
            return Ok(DeliverabilityReport::rejected_format(
                address,
                validation.failure_reason,
            ));
        };

        let whitelist_entry = self.whitelist.find(&email).await?;
        let blacklist_entry = self.blacklist.find(&email).await?;

        let is_whitelisted = whitelist_entry.is_some();
        let (is_blacklisted, bounce_count, last_bounce_at, stored_reason) = match &blacklist_entry {
            Some(entry) => (
                entry.is_active,
                entry.bounce_count,
                entry.last_bounce_at,
                Some(entry.reason.clone()),
            ),
            None => (false, 0, None, None),
        };

        // Precedence: whitelist beats blacklist; absence of any record means
        // send. DNSBL and auth posture never participate.
        let (should_send, reason) = if is_whitelisted {
            (true, None)
        } else if is_blacklisted {
            (
                false,
                stored_reason
                    .as_ref()
                    .map(|r| format!("{} ({} bounces)", r, bounce_count)),
            )
        } else {
            (true, None)
        };
        debug!(
            "Decision for {}: should_send={} (whitelisted={}, blacklisted={})",
            email, should_send, is_whitelisted, is_blacklisted
        );

        Ok(DeliverabilityReport {
            email,
            is_valid_format: true,
            is_whitelisted,
            is_blacklisted,
            bounce_count,
            last_bounce_at,
            whitelist_notes: whitelist_entry.and_then(|w| w.notes),
            blacklist_reason: stored_reason,
            reason,
            dnsbl: None,
            auth_posture: None,
            should_send,
        })
    }

    /// Convenience for the hot send path.
    pub async fn should_send(&self, address: &str) -> Result<bool> {
        Ok(self.evaluate(address).await?.should_send)
    }

    /// The interactive pass: the local decision plus DNSBL and auth-posture
    /// diagnostics. Determinate zone answers are appended to the check
    /// history; degraded network signals land in the diagnostics' error
    /// lists and never fail the call.
    pub async fn check(&self, address: &str) -> Result<DeliverabilityReport> {
        let mut report = self.evaluate(address).await?;
        if !report.is_valid_format {
            return Ok(report);
        }
        let Some((_, domain)) = report.email.split_once('@').map(|(l, d)| (l, d.to_string()))
        else {
            return Ok(report);
        };

        let dnsbl = self.dnsbl.check_domain(&domain).await;
        for zone_check in &dnsbl.checks {
            self.history
                .record(&domain, &zone_check.zone, zone_check.listed)
                .await?;
        }
        report.dnsbl = Some(dnsbl);

        report.auth_posture = Some(
            self.auth
                .check_domain(&domain, self.config.dkim_selector.as_deref())
                .await,
        );

        Ok(report)
    }
}
