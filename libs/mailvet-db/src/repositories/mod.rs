pub mod blacklist_repo;
pub mod dnsbl_repo;
pub mod whitelist_repo;

pub use blacklist_repo::BlacklistRepository;
pub use dnsbl_repo::DnsblCheckRepository;
pub use whitelist_repo::WhitelistRepository;
