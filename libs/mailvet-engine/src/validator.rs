//! Syntactic address validation. Pure functions, no I/O.

use serde::Serialize;

const MAX_LOCAL_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Lower-cased canonical form, set only when the address is valid.
    pub normalized: Option<String>,
    pub failure_reason: Option<String>,
}

impl ValidationResult {
    fn valid(normalized: String) -> Self {
        Self {
            is_valid: true,
            normalized: Some(normalized),
            failure_reason: None,
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            normalized: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Lower-cased, trimmed form used as the store key. Does not imply validity;
/// removal operations accept whatever string was stored.
pub fn canonicalize(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// RFC-5322-compatible syntactic check: local part of `[A-Za-z0-9._%+-]`
/// without edge or doubled dots, one `@`, dotted domain with an alphabetic
/// top-level label.
pub fn validate(address: &str) -> ValidationResult {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return ValidationResult::invalid("address is empty");
    }
    if trimmed.matches('@').count() != 1 {
        return ValidationResult::invalid("address must contain exactly one '@'");
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return ValidationResult::invalid("address must contain exactly one '@'");
    };

    if let Some(reason) = local_part_error(local) {
        return ValidationResult::invalid(reason);
    }
    if let Some(reason) = domain_error(domain) {
        return ValidationResult::invalid(reason);
    }

    ValidationResult::valid(trimmed.to_ascii_lowercase())
}

fn local_part_error(local: &str) -> Option<String> {
    if local.is_empty() {
        return Some("local part is empty".to_string());
    }
    if local.len() > MAX_LOCAL_LEN {
        return Some(format!("local part exceeds {} characters", MAX_LOCAL_LEN));
    }
    if let Some(c) = local
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !"._%+-".contains(*c))
    {
        return Some(format!("disallowed character '{}' in local part", c));
    }
    if local.starts_with('.') || local.ends_with('.') {
        return Some("local part must not begin or end with a dot".to_string());
    }
    if local.contains("..") {
        return Some("local part contains consecutive dots".to_string());
    }
    None
}

fn domain_error(domain: &str) -> Option<String> {
    if domain.is_empty() {
        return Some("domain is empty".to_string());
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Some(format!("domain exceeds {} characters", MAX_DOMAIN_LEN));
    }
    if !domain.contains('.') {
        return Some("domain must contain at least one dot".to_string());
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Some("domain contains an empty label".to_string());
        }
        if label.len() > MAX_LABEL_LEN {
            return Some(format!("domain label exceeds {} characters", MAX_LABEL_LEN));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            return Some(format!("disallowed character '{}' in domain", c));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Some("domain label must not begin or end with a hyphen".to_string());
        }
    }
    let tld = domain.rsplit('.').next().unwrap_or_default();
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some("top-level domain must be at least two letters".to_string());
    }
    None
}
