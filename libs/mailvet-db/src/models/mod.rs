pub mod blacklist;
pub mod dnsbl_check;
pub mod whitelist;

pub use blacklist::BlacklistEntry;
pub use dnsbl_check::DnsblCheckRecord;
pub use whitelist::WhitelistEntry;
