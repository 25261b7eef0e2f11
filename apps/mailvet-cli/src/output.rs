//! Human-readable rendering of reports and listings.

use console::style;

use mailvet_db::models::{BlacklistEntry, DnsblCheckRecord, WhitelistEntry};
use mailvet_engine::{DeliverabilityReport, StatusReport};

const TIME_FMT: &str = "%Y-%m-%d %H:%M";

pub fn print_check(report: &DeliverabilityReport, local: bool) {
    println!(
        "{}",
        style(format!("Deliverability check: {}", report.email)).bold()
    );

    if report.is_valid_format {
        println!("  {} Valid address format", style("✓").green());
    } else {
        println!(
            "  {} {}",
            style("✗").red(),
            report.reason.as_deref().unwrap_or("invalid address format")
        );
    }

    if report.is_whitelisted {
        match &report.whitelist_notes {
            Some(notes) => println!("  {} Whitelisted ({})", style("✓").green(), notes),
            None => println!("  {} Whitelisted", style("✓").green()),
        }
    }
    if report.is_blacklisted {
        println!(
            "  {} Blacklisted: {} ({} bounces)",
            style("⚠").yellow(),
            report.blacklist_reason.as_deref().unwrap_or("blacklisted"),
            report.bounce_count
        );
        if let Some(at) = report.last_bounce_at {
            println!("    last bounce {}", at.format(TIME_FMT));
        }
    } else if report.bounce_count > 0 {
        println!(
            "  {} {} prior bounce(s), below blacklist threshold",
            style("⚠").yellow(),
            report.bounce_count
        );
    }

    if let Some(dnsbl) = &report.dnsbl {
        match dnsbl.mx_ip {
            Some(ip) => println!(
                "  Mail server: {} ({})",
                dnsbl.mx_host.as_deref().unwrap_or("?"),
                ip
            ),
            None => println!("  Mail server: {}", style("unresolved").dim()),
        }
        let listed = dnsbl.listed_zones();
        if listed.is_empty() && !dnsbl.checks.is_empty() {
            println!(
                "  {} Not listed in {} DNSBL zone(s)",
                style("✓").green(),
                dnsbl.checks.len()
            );
        }
        for zone in &listed {
            println!("  {} Listed in {}", style("⚠").yellow(), zone);
        }
        for error in &dnsbl.errors {
            println!("  {} {}", style("?").dim(), style(error).dim());
        }
    } else if !local && report.is_valid_format {
        println!("  {}", style("Network diagnostics unavailable").dim());
    }

    if let Some(auth) = &report.auth_posture {
        println!(
            "  SPF: {}   DMARC: {}   DKIM: {}",
            presence(auth.has_spf),
            presence(auth.has_dmarc),
            match auth.has_dkim {
                Some(present) => presence(present),
                None => style("selector required").dim().to_string(),
            }
        );
    }

    println!();
    if report.should_send {
        println!("{}", style("Decision: SEND").green().bold());
    } else {
        println!("{}", style("Decision: DO NOT SEND").red().bold());
    }

    for line in recommendations(report) {
        println!("  {} {}", style("→").cyan(), line);
    }
}

fn presence(present: bool) -> String {
    if present {
        style("present").green().to_string()
    } else {
        style("missing").red().to_string()
    }
}

fn recommendations(report: &DeliverabilityReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.is_blacklisted && !report.is_whitelisted {
        lines.push("Whitelist this address if the mailbox is known to be valid".to_string());
        lines.push("Check the bounce reason against the mail server logs".to_string());
    }
    if let Some(dnsbl) = &report.dnsbl {
        if dnsbl.is_listed() {
            lines.push("Contact the mail server hosting provider".to_string());
            lines.push("Request delisting from the DNSBL operators".to_string());
        }
    }
    if let Some(auth) = &report.auth_posture {
        if !auth.has_spf {
            lines.push(format!("Domain {} is missing an SPF record", auth.domain));
        }
        if !auth.has_dmarc {
            lines.push(format!("Domain {} is missing a DMARC record", auth.domain));
        }
        if auth.has_dkim == Some(false) {
            lines.push(format!(
                "No DKIM key found for selector '{}'",
                auth.dkim_selector.as_deref().unwrap_or("?")
            ));
        }
    }
    lines
}

pub fn print_blacklist(entries: &[BlacklistEntry], all: bool) {
    let title = if all {
        "All blacklist records"
    } else {
        "Blacklisted addresses"
    };
    println!("{} ({})", style(title).bold(), entries.len());
    for entry in entries {
        let mut flags = Vec::new();
        if !entry.is_active {
            flags.push("tracking");
        }
        if entry.whitelisted {
            flags.push("whitelisted");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  {:<35} {} ({} bounces, since {}){}",
            entry.email,
            entry.reason,
            entry.bounce_count,
            entry.first_listed_at.format(TIME_FMT),
            style(suffix).dim()
        );
    }
}

pub fn print_whitelist(entries: &[WhitelistEntry]) {
    println!("{} ({})", style("Whitelisted addresses").bold(), entries.len());
    for entry in entries {
        println!(
            "  {:<35} {} (added {})",
            entry.email,
            entry.notes.as_deref().unwrap_or("-"),
            entry.added_at.format(TIME_FMT)
        );
    }
}

pub fn print_history(target: &str, records: &[DnsblCheckRecord]) {
    println!(
        "{} ({} records)",
        style(format!("DNSBL history for {}", target)).bold(),
        records.len()
    );
    for record in records {
        let verdict = if record.is_listed {
            style("listed").red().to_string()
        } else {
            style("clean").green().to_string()
        };
        println!(
            "  {}  {:<28} {}",
            record.checked_at.format(TIME_FMT),
            record.zone,
            verdict
        );
    }
}

pub fn print_report(report: &StatusReport) {
    println!("{}", style("Email reputation report").bold());
    println!("  Blacklisted addresses:  {}", report.blacklist_count);
    println!("  Whitelisted addresses:  {}", report.whitelist_count);
    println!("  Overridden by whitelist: {}", report.overridden_count);
    println!("  DNSBL checks recorded:  {}", report.dnsbl_check_count);

    if !report.blacklist_entries.is_empty() {
        println!("\n{}", style("Currently blacklisted:").bold());
        for entry in report.blacklist_entries.iter().take(10) {
            println!(
                "  {:<35} {} ({} bounces)",
                entry.email, entry.reason, entry.bounce_count
            );
        }
        if report.blacklist_entries.len() > 10 {
            println!("  ... and {} more", report.blacklist_entries.len() - 10);
        }
    }

    if !report.whitelist_entries.is_empty() {
        println!("\n{}", style("Whitelisted:").bold());
        for entry in report.whitelist_entries.iter().take(10) {
            println!(
                "  {:<35} {}",
                entry.email,
                entry.notes.as_deref().unwrap_or("-")
            );
        }
        if report.whitelist_entries.len() > 10 {
            println!("  ... and {} more", report.whitelist_entries.len() - 10);
        }
    }
}
