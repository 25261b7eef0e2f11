//! SPF / DKIM / DMARC posture checks for a sending domain. Advisory only:
//! these results annotate diagnostics and never gate the send decision.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::dns::DnsClient;

#[derive(Debug, Clone, Serialize)]
pub struct AuthPostureResult {
    pub domain: String,
    pub has_spf: bool,
    pub has_dmarc: bool,
    /// The selector that was probed, when one was configured.
    pub dkim_selector: Option<String>,
    /// None when no selector was supplied, so "not checked" is
    /// distinguishable from "checked and absent".
    pub has_dkim: Option<bool>,
}

pub struct DomainAuthValidator {
    dns: Arc<dyn DnsClient>,
}

impl DomainAuthValidator {
    pub fn new(dns: Arc<dyn DnsClient>) -> Self {
        Self { dns }
    }

    /// Each lookup is independent; absence of a record is a normal result and
    /// lookup failures degrade to "absent" with a warning.
    pub async fn check_domain(&self, domain: &str, dkim_selector: Option<&str>) -> AuthPostureResult {
        let has_spf = self
            .txt_any(domain, |record| record.starts_with("v=spf1"))
            .await;

        let dmarc_name = format!("_dmarc.{}", domain);
        let has_dmarc = self
            .txt_any(&dmarc_name, |record| record.starts_with("v=DMARC1"))
            .await;

        let has_dkim = match dkim_selector {
            Some(selector) => {
                let dkim_name = format!("{}._domainkey.{}", selector, domain);
                Some(
                    self.txt_any(&dkim_name, |record| {
                        record.contains("v=DKIM1") || record.contains("p=")
                    })
                    .await,
                )
            }
            None => None,
        };

        AuthPostureResult {
            domain: domain.to_string(),
            has_spf,
            has_dmarc,
            dkim_selector: dkim_selector.map(str::to_string),
            has_dkim,
        }
    }

    async fn txt_any<F>(&self, name: &str, predicate: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        match self.dns.txt(name).await {
            Ok(records) => records.iter().any(|r| predicate(r)),
            Err(e) if e.is_no_records() => false,
            Err(e) => {
                warn!("TXT lookup for {} degraded to absent: {}", name, e);
                false
            }
        }
    }
}
