//! Target validation
//!
//! Targets stay opaque strings: hostnames are resolved by the probe at
//! connect time. Validation only rejects strings no connection could ever be
//! attempted against.

use crate::error::ScanError;
use std::net::IpAddr;

/// Longest DNS name accepted
const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Validate a target and return its normalized form.
///
/// Surrounding whitespace and IPv6 brackets (`[::1]`) are stripped.
pub fn normalize_target(target: &str) -> crate::Result<String> {
    let target = target.trim();

    if target.is_empty() {
        return Err(ScanError::config("Target cannot be empty"));
    }

    let unbracketed = target
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(target);

    if unbracketed.parse::<IpAddr>().is_ok() {
        return Ok(unbracketed.to_string());
    }

    validate_hostname(target)?;
    Ok(target.to_string())
}

fn validate_hostname(host: &str) -> crate::Result<()> {
    if host.len() > MAX_HOSTNAME_LEN {
        return Err(ScanError::config(format!(
            "Target too long (max {} characters)",
            MAX_HOSTNAME_LEN
        )));
    }

    let host = host.strip_suffix('.').unwrap_or(host);

    for label in host.split('.') {
        if label.is_empty() {
            return Err(ScanError::config(format!("Invalid target '{}': empty label", host)));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(ScanError::config(format!(
                "Invalid target '{}': label longer than {} characters",
                host, MAX_LABEL_LEN
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ScanError::config(format!(
                "Invalid target '{}': label cannot start or end with '-'",
                host
            )));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ScanError::config(format!(
                "Invalid character '{}' in target '{}'",
                c, host
            )));
        }
    }

    Ok(())
}
