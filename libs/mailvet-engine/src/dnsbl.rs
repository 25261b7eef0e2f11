//! DNS-blacklist lookups for a mail domain's outbound server.

use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::DnsblZone;
use crate::dns::DnsClient;

/// One zone's determinate answer. Zones that failed to answer appear in
/// `DnsblResult::errors` instead.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneCheck {
    pub name: String,
    pub zone: String,
    pub listed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DnsblResult {
    pub domain: String,
    pub mx_host: Option<String>,
    pub mx_ip: Option<Ipv4Addr>,
    pub checks: Vec<ZoneCheck>,
    pub errors: Vec<String>,
}

impl DnsblResult {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            mx_host: None,
            mx_ip: None,
            checks: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn listed_zones(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.listed)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn is_listed(&self) -> bool {
        self.checks.iter().any(|c| c.listed)
    }
}

pub struct DnsblResolver {
    dns: Arc<dyn DnsClient>,
    zones: Vec<DnsblZone>,
}

impl DnsblResolver {
    pub fn new(dns: Arc<dyn DnsClient>, zones: Vec<DnsblZone>) -> Self {
        Self { dns, zones }
    }

    /// Resolves the domain's preferred MX to an IPv4 address and queries each
    /// configured zone with the reversed octets. Zones are independent:
    /// a timeout or resolver failure lands in `errors` ("unknown") and never
    /// fails the whole check. Missing MX / unresolvable MX host are likewise
    /// reported, not raised.
    pub async fn check_domain(&self, domain: &str) -> DnsblResult {
        let mut result = DnsblResult::new(domain);

        let mx_host = match self.dns.mx_hosts(domain).await {
            Ok(hosts) => match hosts.into_iter().next() {
                Some(mx) => mx.host,
                None => {
                    result.errors.push(format!("no MX record for {}", domain));
                    return result;
                }
            },
            Err(e) if e.is_no_records() => {
                result.errors.push(format!("no MX record for {}", domain));
                return result;
            }
            Err(e) => {
                warn!("MX lookup for {} failed: {}", domain, e);
                result.errors.push(e.to_string());
                return result;
            }
        };
        debug!("Domain {} MX: {}", domain, mx_host);

        let mx_ip = match self.dns.ipv4(&mx_host).await {
            Ok(addrs) => match addrs.into_iter().next() {
                Some(ip) => ip,
                None => {
                    result
                        .errors
                        .push(format!("could not resolve MX host {}", mx_host));
                    result.mx_host = Some(mx_host);
                    return result;
                }
            },
            Err(e) => {
                warn!("Could not resolve MX host {}: {}", mx_host, e);
                result
                    .errors
                    .push(format!("could not resolve MX host {}: {}", mx_host, e));
                result.mx_host = Some(mx_host);
                return result;
            }
        };
        result.mx_host = Some(mx_host);
        result.mx_ip = Some(mx_ip);

        let reversed = reverse_octets(mx_ip);
        for zone in &self.zones {
            let query = format!("{}.{}", reversed, zone.zone);
            match self.dns.ipv4(&query).await {
                // Any A record answer means listed.
                Ok(_) => {
                    warn!("{} is listed in {} ({})", mx_ip, zone.name, zone.zone);
                    result.checks.push(ZoneCheck {
                        name: zone.name.clone(),
                        zone: zone.zone.clone(),
                        listed: true,
                    });
                }
                Err(e) if e.is_no_records() => {
                    result.checks.push(ZoneCheck {
                        name: zone.name.clone(),
                        zone: zone.zone.clone(),
                        listed: false,
                    });
                }
                Err(e) => {
                    warn!("DNSBL query against {} degraded to unknown: {}", zone.zone, e);
                    result.errors.push(format!("{}: {}", zone.name, e));
                }
            }
        }

        result
    }
}

fn reverse_octets(ip: Ipv4Addr) -> String {
    let o = ip.octets();
    format!("{}.{}.{}.{}", o[3], o[2], o[1], o[0])
}
