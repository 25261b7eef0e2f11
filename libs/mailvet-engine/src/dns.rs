//! DNS access behind a trait so the resolvers can be stubbed in tests.

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// NXDOMAIN / no answer. For DNSBL queries this is the "clean" result.
    #[error("no records found for {name}")]
    NoRecords { name: String },
    #[error("DNS query for {name} timed out after {secs}s")]
    Timeout { name: String, secs: u64 },
    #[error("DNS resolution failed for {name}: {message}")]
    Resolution { name: String, message: String },
}

impl DnsError {
    pub fn is_no_records(&self) -> bool {
        matches!(self, DnsError::NoRecords { .. })
    }

    fn from_resolve(name: &str, err: ResolveError, timeout_secs: u64) -> Self {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => DnsError::NoRecords {
                name: name.to_string(),
            },
            ResolveErrorKind::Timeout => DnsError::Timeout {
                name: name.to_string(),
                secs: timeout_secs,
            },
            _ => DnsError::Resolution {
                name: name.to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxHost {
    pub preference: u16,
    pub host: String,
}

/// The three lookups the engine needs. Production uses hickory; tests inject
/// stubs.
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// MX hosts for a domain, sorted by preference (lowest first).
    async fn mx_hosts(&self, domain: &str) -> Result<Vec<MxHost>, DnsError>;
    async fn ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, DnsError>;
    async fn txt(&self, name: &str) -> Result<Vec<String>, DnsError>;
}

pub struct HickoryDnsClient {
    resolver: TokioAsyncResolver,
    query_timeout: Duration,
}

impl HickoryDnsClient {
    /// Uses the system resolver configuration when readable, otherwise a
    /// public resolver. Every query is bounded by `query_timeout`.
    pub fn new(query_timeout: Duration) -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                tracing::warn!(
                    "System resolver config unavailable ({}), falling back to Cloudflare",
                    e
                );
                TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), ResolverOpts::default())
            }
        };
        Self {
            resolver,
            query_timeout,
        }
    }

    fn timeout_error(&self, name: &str) -> DnsError {
        DnsError::Timeout {
            name: name.to_string(),
            secs: self.query_timeout.as_secs(),
        }
    }
}

#[async_trait]
impl DnsClient for HickoryDnsClient {
    async fn mx_hosts(&self, domain: &str) -> Result<Vec<MxHost>, DnsError> {
        let lookup = timeout(self.query_timeout, self.resolver.mx_lookup(domain))
            .await
            .map_err(|_| self.timeout_error(domain))?
            .map_err(|e| DnsError::from_resolve(domain, e, self.query_timeout.as_secs()))?;

        let mut hosts: Vec<MxHost> = lookup
            .iter()
            .map(|mx| MxHost {
                preference: mx.preference(),
                host: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
            })
            .collect();
        hosts.sort_by_key(|h| h.preference);

        if hosts.is_empty() {
            return Err(DnsError::NoRecords {
                name: domain.to_string(),
            });
        }
        Ok(hosts)
    }

    async fn ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, DnsError> {
        let lookup = timeout(self.query_timeout, self.resolver.ipv4_lookup(host))
            .await
            .map_err(|_| self.timeout_error(host))?
            .map_err(|e| DnsError::from_resolve(host, e, self.query_timeout.as_secs()))?;

        let addrs: Vec<Ipv4Addr> = lookup.iter().map(|a| a.0).collect();
        if addrs.is_empty() {
            return Err(DnsError::NoRecords {
                name: host.to_string(),
            });
        }
        Ok(addrs)
    }

    async fn txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        let lookup = timeout(self.query_timeout, self.resolver.txt_lookup(name))
            .await
            .map_err(|_| self.timeout_error(name))?
            .map_err(|e| DnsError::from_resolve(name, e, self.query_timeout.as_secs()))?;

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.iter()
                    .map(|part| String::from_utf8_lossy(part))
                    .collect::<String>()
            })
            .collect())
    }
}
