// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hostname Value Objects and FQDN Resolution
//!
//! Turns partial or ambiguous hostname input into the canonical
//! `(short_name, domain, fqdn)` triple used by every later planning stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::errors::{PlanError, PlanResult};

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Hostname is empty")]
    Empty,

    #[error("Hostname exceeds maximum length of 253 characters: {0}")]
    TooLong(usize),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Empty label in hostname: {0}")]
    EmptyLabel(String),

    #[error("Invalid character in hostname: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),
}

impl From<HostnameError> for PlanError {
    fn from(err: HostnameError) -> Self {
        PlanError::InvalidInput(err.to_string())
    }
}

/// DNS name value object
///
/// Represents a lowercase DNS name following RFC 1123 with invariants:
/// - Total length ≤ 253 characters
/// - Each label 1..=63 characters
/// - Labels contain only alphanumeric and hyphens
/// - Labels cannot start or end with hyphens
///
/// # Examples
///
/// ```rust
/// use cim_host_identity::domain::Hostname;
///
/// let host = Hostname::new("Web01.Example.com").unwrap();
/// assert_eq!(host.as_str(), "web01.example.com");
/// assert_eq!(host.short_name(), "web01");
///
/// assert!(Hostname::new("").is_err());
/// assert!(Hostname::new("-invalid").is_err());
/// assert!(Hostname::new("web01..example.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hostname(String);

impl Hostname {
    /// Maximum total length for FQDN (RFC 1123)
    pub const MAX_LENGTH: usize = 253;

    /// Maximum length for a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    /// Create a new hostname, case-folded to lowercase
    pub fn new(hostname: impl AsRef<str>) -> Result<Self, HostnameError> {
        let hostname = hostname.as_ref().trim().to_ascii_lowercase();

        if hostname.is_empty() {
            return Err(HostnameError::Empty);
        }

        if hostname.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong(hostname.len()));
        }

        for label in hostname.split('.') {
            Self::validate_label(label, &hostname)?;
        }

        Ok(Self(hostname))
    }

    fn validate_label(label: &str, hostname: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::EmptyLabel(hostname.to_string()));
        }

        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }

        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(HostnameError::InvalidCharacter(ch));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::InvalidLabelFormat(label.to_string()));
        }

        Ok(())
    }

    /// Get the hostname as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the short name (first label before first dot)
    pub fn short_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Get the domain name (everything after first dot)
    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, domain)| domain)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Hostname {
    type Error = HostnameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hostname> for String {
    fn from(value: Hostname) -> Self {
        value.0
    }
}

/// Raw hostname input for one run
///
/// `raw_hostname` may itself be a dotted FQDN. Explicit overrides take
/// precedence over anything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnameSpec {
    pub raw_hostname: String,
    pub explicit_short_name: Option<String>,
    pub explicit_domain: Option<String>,
    pub fallback_domain: String,
}

impl HostnameSpec {
    /// Domain used when nothing else yields one
    pub const DEFAULT_FALLBACK_DOMAIN: &'static str = "localdomain";

    pub fn new(raw_hostname: impl Into<String>, fallback_domain: impl Into<String>) -> Self {
        Self {
            raw_hostname: raw_hostname.into(),
            explicit_short_name: None,
            explicit_domain: None,
            fallback_domain: fallback_domain.into(),
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.explicit_short_name = Some(short_name.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.explicit_domain = Some(domain.into());
        self
    }
}

/// Canonical identity derived from a [`HostnameSpec`]
///
/// Invariants: everything is lowercase, `short_name` has no dot and
/// `fqdn == short_name + "." + domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    short_name: String,
    domain: String,
    fqdn: String,
}

impl ResolvedIdentity {
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Content of the hostname file for this identity
    pub fn hostname_file_content(&self) -> String {
        format!("{}\n", self.fqdn)
    }

    /// Feed this identity back in as fully explicit input
    pub fn to_spec(&self, fallback_domain: impl Into<String>) -> HostnameSpec {
        HostnameSpec::new(self.fqdn.clone(), fallback_domain)
            .with_short_name(self.short_name.clone())
            .with_domain(self.domain.clone())
    }
}

impl fmt::Display for ResolvedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqdn)
    }
}

fn explicit(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Resolve the canonical `(short_name, domain, fqdn)` triple
///
/// # Rules
/// - Explicit short name and domain are case-folded and win when present
/// - Otherwise the short name is the first label of `raw_hostname`
/// - Otherwise the domain is every label after the first, when there are
///   at least two labels
/// - Otherwise the domain is `fallback_domain`
///
/// # Errors
/// `PlanError::InvalidInput` for an empty raw hostname or when the pieces do
/// not form a valid DNS name.
pub fn resolve(spec: &HostnameSpec) -> PlanResult<ResolvedIdentity> {
    // An absolute name ("web01.example.com.") carries no empty root label
    let raw = spec.raw_hostname.trim().trim_end_matches('.');
    if raw.is_empty() {
        return Err(PlanError::InvalidInput("raw hostname is empty".to_string()));
    }

    let short_name = match explicit(&spec.explicit_short_name) {
        Some(short) => short,
        None => raw.split('.').next().unwrap_or(raw).to_string(),
    };

    if short_name.contains('.') {
        return Err(PlanError::InvalidInput(format!(
            "short name '{}' must not contain a dot",
            short_name
        )));
    }

    let domain = match explicit(&spec.explicit_domain) {
        Some(domain) => domain,
        None => match raw.split_once('.') {
            Some((_, rest)) => rest.to_string(),
            None => spec.fallback_domain.trim().trim_end_matches('.').to_string(),
        },
    };

    if domain.is_empty() {
        return Err(PlanError::InvalidInput(format!(
            "no domain could be derived for '{}'",
            raw
        )));
    }

    let fqdn = Hostname::new(format!("{}.{}", short_name, domain))?;
    let (short_name, domain) = match fqdn.as_str().split_once('.') {
        Some((short, domain)) => (short.to_string(), domain.to_string()),
        None => {
            return Err(PlanError::InvalidInput(format!(
                "'{}' is not a fully qualified name",
                fqdn
            )))
        }
    };

    Ok(ResolvedIdentity {
        short_name,
        domain,
        fqdn: fqdn.into(),
    })
}
