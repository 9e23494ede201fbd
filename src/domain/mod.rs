// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Identity Domain Models
//!
//! Value objects with validation invariants for one machine's identity.
//!
//! # Value Objects with Invariants
//!
//! - [`Hostname`] - DNS-validated hostnames (RFC 1123)
//! - [`HostAddress`] - literal IPv4/IPv6 host table key
//! - [`PlatformContext`] - platform family, distro, version and service manager
//!
//! # Resolution
//!
//! [`resolve`] turns a partial [`HostnameSpec`] into a [`ResolvedIdentity`]
//! (short name, domain, FQDN).

pub mod hostname;
pub mod invariants;
pub mod network;
pub mod platform;

// Re-export value objects
pub use hostname::{resolve, Hostname, HostnameError, HostnameSpec, ResolvedIdentity};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{HostAddress, NetworkError};
pub use platform::{
    PlatformContext, PlatformFamily, PlatformVersion, ServiceCommand, ServiceManager, ServiceSpec,
    ServiceSupports,
};
