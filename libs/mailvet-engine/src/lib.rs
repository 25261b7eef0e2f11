//! Email deliverability and reputation engine.
//!
//! Decides, for any recipient address, whether a message should be attempted,
//! and maintains the evidence base behind that decision: bounce history,
//! manual overrides, and cached network-reputation signals. The store lives
//! in `mailvet-db`; this crate layers the decision logic, the DNS probes and
//! the reporting on top of injected store handles.

pub mod auth;
pub mod bounce;
pub mod checker;
pub mod config;
pub mod dns;
pub mod dnsbl;
pub mod report;
pub mod validator;

pub use auth::{AuthPostureResult, DomainAuthValidator};
pub use bounce::{BounceKind, BounceTracker};
pub use checker::{DeliverabilityChecker, DeliverabilityReport};
pub use config::{DnsblZone, EngineConfig};
pub use dns::{DnsClient, DnsError, HickoryDnsClient, MxHost};
pub use dnsbl::{DnsblResolver, DnsblResult, ZoneCheck};
pub use report::{ReportGenerator, StatusReport};
pub use validator::ValidationResult;
