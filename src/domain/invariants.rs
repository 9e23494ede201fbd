// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Identity and Host Table Invariants
//!
//! Checks run by the planner on its own output before any action is emitted.
//! A violation here is a planning bug or an input the resolver let through,
//! so it surfaces as `PlanError::InvalidInput` and the run stops.

use std::collections::HashSet;

use super::hostname::{Hostname, ResolvedIdentity};
use super::network::HostAddress;
use crate::errors::PlanError;
use crate::hosts::planner::{DEBIAN_SELF_ADDRESS, LOOPBACK_ADDRESS};
use crate::hosts::{HostAction, HostEntry};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Resolved names are not a valid DNS hostname
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// FQDN does not equal `short_name.domain`
    #[error("Identity is inconsistent: {0}")]
    InconsistentIdentity(String),

    /// Two planned entries share an address
    #[error("Address {0} planned more than once")]
    DuplicateAddress(String),

    /// Both loopback strategies would be applied in one pass
    #[error("Loopback strategy violated: {0}")]
    LoopbackStrategy(String),
}

impl From<ValidationError> for PlanError {
    fn from(err: ValidationError) -> Self {
        PlanError::InvalidInput(err.to_string())
    }
}

/// Validate a resolved identity
///
/// # Rules
/// - FQDN is lowercase and equals `short_name + "." + domain`
/// - Short name has no dot
/// - FQDN is a valid RFC 1123 hostname
pub fn validate_identity(identity: &ResolvedIdentity) -> ValidationResult {
    let fqdn = identity.fqdn();

    if identity.short_name().contains('.') {
        return Err(ValidationError::InconsistentIdentity(format!(
            "short name '{}' contains a dot",
            identity.short_name()
        )));
    }

    if fqdn != format!("{}.{}", identity.short_name(), identity.domain()) {
        return Err(ValidationError::InconsistentIdentity(format!(
            "'{}' is not '{}' joined with '{}'",
            fqdn,
            identity.short_name(),
            identity.domain()
        )));
    }

    if fqdn != fqdn.to_lowercase() {
        return Err(ValidationError::InconsistentIdentity(format!(
            "'{}' is not lowercase",
            fqdn
        )));
    }

    Hostname::new(fqdn)
        .map(|_| ())
        .map_err(|err| ValidationError::InvalidHostname(err.to_string()))
}

/// Validate that every address appears at most once
pub fn validate_unique_addresses(entries: &[HostEntry]) -> ValidationResult {
    let mut seen: HashSet<&HostAddress> = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(&entry.ip) {
            return Err(ValidationError::DuplicateAddress(entry.ip.to_string()));
        }
    }
    Ok(())
}

/// Validate that exactly one loopback strategy is in effect
///
/// # Rules
/// - Permanent-IP mode never upserts `127.0.1.1`
/// - Default mode never maps the FQDN on both `127.0.1.1` and `127.0.0.1`
pub fn validate_loopback_strategy(
    entries: &[HostEntry],
    fqdn: &str,
    permanent_ip: bool,
) -> ValidationResult {
    let upsert_on = |address: &str| {
        entries
            .iter()
            .find(|entry| entry.action == HostAction::Upsert && entry.ip.as_str() == address)
    };

    match (permanent_ip, upsert_on(DEBIAN_SELF_ADDRESS), upsert_on(LOOPBACK_ADDRESS)) {
        (true, Some(_), _) => Err(ValidationError::LoopbackStrategy(format!(
            "{} upserted in permanent-IP mode",
            DEBIAN_SELF_ADDRESS
        ))),
        (false, Some(own), Some(loopback)) if own.names(fqdn) && loopback.names(fqdn) => {
            Err(ValidationError::LoopbackStrategy(format!(
                "{} mapped on both {} and {}",
                fqdn, DEBIAN_SELF_ADDRESS, LOOPBACK_ADDRESS
            )))
        }
        _ => Ok(()),
    }
}
