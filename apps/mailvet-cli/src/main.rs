use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mailvet_engine::{
    BounceKind, BounceTracker, DeliverabilityChecker, DnsClient, EngineConfig, HickoryDnsClient,
    ReportGenerator, validator,
};

mod output;

#[derive(Parser)]
#[command(name = "mailvet")]
#[command(about = "Email deliverability & reputation management", version)]
struct Cli {
    /// Reputation store URL
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://mailvet.db",
        global = true
    )]
    database: String,

    /// Engine config file (TOML); defaults to the well-known paths
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check deliverability of an address, with network diagnostics
    Check {
        address: String,
        /// Skip DNSBL and auth-posture lookups
        #[arg(long)]
        local: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// DKIM selector to probe (overrides config)
        #[arg(long)]
        dkim_selector: Option<String>,
    },
    /// Approve an address; overrides every automated signal
    Whitelist {
        address: String,
        /// Justification to store with the entry
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove an address from the whitelist
    Unwhitelist { address: String },
    /// Manually blacklist an address
    Blacklist {
        address: String,
        #[arg(long, default_value = "manual addition")]
        reason: String,
    },
    /// Record a delivery failure reported out of band
    Bounce {
        address: String,
        #[arg(value_enum)]
        kind: BounceKindArg,
    },
    /// Administrative reset: delete an address's blacklist entry
    Reset { address: String },
    /// List blacklisted addresses
    List {
        /// Include overridden and below-threshold tracking rows
        #[arg(long)]
        all: bool,
    },
    /// List whitelisted addresses
    WhitelistList,
    /// Show the DNSBL check history for a domain
    History {
        target: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Aggregate blacklist/whitelist report
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BounceKindArg {
    Hard,
    Soft,
}

impl From<BounceKindArg> for BounceKind {
    fn from(kind: BounceKindArg) -> Self {
        match kind {
            BounceKindArg::Hard => BounceKind::Hard,
            BounceKindArg::Soft => BounceKind::Soft,
        }
    }
}

/// Validates and canonicalizes an address for operations that create state.
fn valid_address(address: &str) -> Result<String> {
    let validation = validator::validate(address);
    match validation.normalized {
        Some(email) => Ok(email),
        None => bail!(
            "refusing to store '{}': {}",
            address,
            validation
                .failure_reason
                .unwrap_or_else(|| "malformed address".to_string())
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => EngineConfig::load()?,
    };

    let pool = mailvet_db::init_db(&cli.database).await?;

    match cli.command {
        Commands::Check {
            address,
            local,
            json,
            dkim_selector,
        } => {
            if let Some(selector) = dkim_selector {
                config.dkim_selector = Some(selector);
            }
            let dns: Arc<dyn DnsClient> = Arc::new(HickoryDnsClient::new(config.dns_timeout()));
            let checker = DeliverabilityChecker::new(pool, dns, config);
            let report = if local {
                checker.evaluate(&address).await?
            } else {
                checker.check(&address).await?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_check(&report, local);
            }
        }
        Commands::Whitelist { address, notes } => {
            let email = valid_address(&address)?;
            let entry = mailvet_db::repositories::WhitelistRepository::new(pool)
                .add(&email, notes.as_deref())
                .await?;
            println!("{} Whitelisted {}", style("✓").green(), entry.email);
        }
        Commands::Unwhitelist { address } => {
            let email = validator::canonicalize(&address);
            let removed = mailvet_db::repositories::WhitelistRepository::new(pool)
                .remove(&email)
                .await?;
            if removed {
                println!("{} Removed {} from whitelist", style("✓").green(), email);
            } else {
                bail!("{} is not whitelisted", email);
            }
        }
        Commands::Blacklist { address, reason } => {
            let email = valid_address(&address)?;
            let entry = mailvet_db::repositories::BlacklistRepository::new(pool)
                .add_manual(&email, &reason)
                .await?;
            println!(
                "{} Blacklisted {} ({})",
                style("✓").green(),
                entry.email,
                entry.reason
            );
        }
        Commands::Bounce { address, kind } => {
            let email = valid_address(&address)?;
            let tracker = BounceTracker::new(pool, &config);
            let entry = tracker.record_bounce(&email, kind.into()).await?;
            if entry.is_gating() {
                println!(
                    "{} Recorded bounce for {}: blacklisted ({} bounces)",
                    style("✓").green(),
                    entry.email,
                    entry.bounce_count
                );
            } else {
                println!(
                    "{} Recorded bounce for {}: {} bounces, not blacklisted",
                    style("✓").green(),
                    entry.email,
                    entry.bounce_count
                );
            }
        }
        Commands::Reset { address } => {
            let email = validator::canonicalize(&address);
            let deleted = mailvet_db::repositories::BlacklistRepository::new(pool)
                .delete(&email)
                .await?;
            if deleted {
                println!("{} Reset blacklist entry for {}", style("✓").green(), email);
            } else {
                bail!("{} has no blacklist entry", email);
            }
        }
        Commands::List { all } => {
            let repo = mailvet_db::repositories::BlacklistRepository::new(pool);
            let entries = if all {
                repo.get_all().await?
            } else {
                repo.get_active().await?
            };
            output::print_blacklist(&entries, all);
        }
        Commands::WhitelistList => {
            let entries = mailvet_db::repositories::WhitelistRepository::new(pool)
                .get_all()
                .await?;
            output::print_whitelist(&entries);
        }
        Commands::History { target, limit } => {
            let records = mailvet_db::repositories::DnsblCheckRepository::new(pool)
                .history(&target, limit)
                .await?;
            output::print_history(&target, &records);
        }
        Commands::Report { json } => {
            let report = ReportGenerator::new(pool).generate().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_report(&report);
            }
        }
    }

    Ok(())
}
