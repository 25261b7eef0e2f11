use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// One DNS blacklist to query, as data rather than a hardcoded literal so
/// zones can be added or retired per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsblZone {
    /// Display name, e.g. "Spamhaus ZEN".
    pub name: String,
    /// Query suffix, e.g. "zen.spamhaus.org".
    pub zone: String,
}

impl DnsblZone {
    pub fn new(name: &str, zone: &str) -> Self {
        Self {
            name: name.to_string(),
            zone: zone.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cumulative soft bounces before an address is actively blacklisted.
    #[serde(default = "default_soft_bounce_threshold")]
    pub soft_bounce_threshold: i64,
    /// Upper bound on every external DNS query.
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
    /// DKIM selector to probe during auth-posture checks, if any.
    #[serde(default)]
    pub dkim_selector: Option<String>,
    #[serde(default = "default_dnsbl_zones")]
    pub dnsbl_zones: Vec<DnsblZone>,
}

fn default_soft_bounce_threshold() -> i64 {
    3
}

fn default_dns_timeout_secs() -> u64 {
    5
}

fn default_dnsbl_zones() -> Vec<DnsblZone> {
    vec![
        DnsblZone::new("Spamhaus ZEN", "zen.spamhaus.org"),
        DnsblZone::new("Spamhaus PBL", "pbl.spamhaus.org"),
        DnsblZone::new("Barracuda", "b.barracudacentral.org"),
        DnsblZone::new("SORBS", "dnsbl.sorbs.net"),
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soft_bounce_threshold: default_soft_bounce_threshold(),
            dns_timeout_secs: default_dns_timeout_secs(),
            dkim_selector: None,
            dnsbl_zones: default_dnsbl_zones(),
        }
    }
}

impl EngineConfig {
    /// Loads from the well-known TOML paths first, then falls back to
    /// environment variables on top of the defaults.
    pub fn load() -> Result<Self> {
        let config_paths = ["/etc/mailvet/mailvet.toml", "./mailvet.toml"];

        for path in config_paths {
            if fs::metadata(path).is_ok() {
                tracing::info!("Loading engine config from {}", path);
                return Self::load_from(path);
            }
        }

        tracing::debug!("No config file found, using environment and defaults");
        let mut config = Self::default();
        if let Some(threshold) = env_parse("MAILVET_SOFT_BOUNCE_THRESHOLD") {
            config.soft_bounce_threshold = threshold;
        }
        if let Some(secs) = env_parse("MAILVET_DNS_TIMEOUT_SECS") {
            config.dns_timeout_secs = secs;
        }
        if let Ok(selector) = std::env::var("MAILVET_DKIM_SELECTOR") {
            config.dkim_selector = Some(selector);
        }
        Ok(config)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_the_standard_zone_list() {
        let config = EngineConfig::default();
        assert_eq!(config.soft_bounce_threshold, 3);
        assert_eq!(config.dns_timeout_secs, 5);
        assert_eq!(config.dnsbl_zones.len(), 4);
        assert!(
            config
                .dnsbl_zones
                .iter()
                .any(|z| z.zone == "zen.spamhaus.org")
        );
    }

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        let config: EngineConfig = toml::from_str("soft_bounce_threshold = 5").unwrap();
        assert_eq!(config.soft_bounce_threshold, 5);
        assert_eq!(config.dns_timeout_secs, 5);
        assert_eq!(config.dnsbl_zones.len(), 4);
        assert!(config.dkim_selector.is_none());
    }

    #[test]
    fn test_explicit_zone_list_replaces_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            dkim_selector = "mail"

            [[dnsbl_zones]]
            name = "SpamCop"
            zone = "bl.spamcop.net"
            "#,
        )
        .unwrap();
        assert_eq!(config.dnsbl_zones.len(), 1);
        assert_eq!(config.dnsbl_zones[0].zone, "bl.spamcop.net");
        assert_eq!(config.dkim_selector.as_deref(), Some("mail"));
    }
}
