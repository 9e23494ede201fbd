// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::errors::PlanError;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),
}

impl From<NetworkError> for PlanError {
    fn from(err: NetworkError) -> Self {
        PlanError::InvalidInput(err.to_string())
    }
}

/// Literal host-table address
///
/// Keeps the textual form it was given (`fe00::0` stays `fe00::0` when
/// rendered) while comparing and hashing by the parsed address, so the
/// observed `fe00::` line and the planned `fe00::0` rule share one key.
/// Addresses are never resolved.
///
/// # Examples
///
/// ```rust
/// use cim_host_identity::domain::HostAddress;
///
/// let planned = HostAddress::new("fe00::0").unwrap();
/// let observed = HostAddress::new("fe00::").unwrap();
/// assert_eq!(planned, observed);
/// assert_eq!(planned.to_string(), "fe00::0");
/// assert!(HostAddress::new("db1.example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostAddress {
    text: String,
    address: IpAddr,
}

impl HostAddress {
    /// Parse a literal IPv4 or IPv6 address
    pub fn new(ip: impl AsRef<str>) -> Result<Self, NetworkError> {
        let text = ip.as_ref().trim();
        let address = IpAddr::from_str(text)
            .map_err(|_| NetworkError::InvalidIpAddress(text.to_string()))?;

        Ok(Self {
            text: text.to_string(),
            address,
        })
    }

    /// Get the parsed IP address
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Textual form as it will be written
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check if this is an IPv6 address
    pub fn is_ipv6(&self) -> bool {
        matches!(self.address, IpAddr::V6(_))
    }
}

impl PartialEq for HostAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for HostAddress {}

impl Hash for HostAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl From<IpAddr> for HostAddress {
    fn from(address: IpAddr) -> Self {
        Self {
            text: address.to_string(),
            address,
        }
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl FromStr for HostAddress {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for HostAddress {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostAddress> for String {
    fn from(value: HostAddress) -> Self {
        value.text
    }
}
