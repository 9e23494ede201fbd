// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform Identity Domain Model
//!
//! A closed taxonomy of the platform facts that drive every branch in host
//! table planning and guard evaluation. The planner and guards match on
//! these enums exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Coarse OS classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFamily {
    /// Debian, Ubuntu and derivatives
    Debian,
    /// RHEL, CentOS, Amazon Linux and derivatives
    Rhel,
    /// macOS
    MacOsX,
    /// Anything else
    Other,
}

impl PlatformFamily {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debian => "debian",
            Self::Rhel => "rhel",
            Self::MacOsX => "mac_os_x",
            Self::Other => "other",
        }
    }

    /// Parse from a family or distro identifier
    ///
    /// Fedora is a family of its own and maps to `Other`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" => Self::Debian,
            "rhel" | "redhat" | "centos" | "amazon" | "amzn" | "scientific" | "oracle"
            | "ol" | "rocky" | "almalinux" | "cloudlinux" => Self::Rhel,
            "mac_os_x" | "macos" | "darwin" => Self::MacOsX,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Init system / service manager in charge of the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceManager {
    Init,
    Upstart,
    Systemd,
    Launchd,
    None,
}

impl ServiceManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Upstart => "upstart",
            Self::Systemd => "systemd",
            Self::Launchd => "launchd",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ServiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dotted platform version compared numerically
///
/// `"6.10"` sorts before `"7.0"`; missing components count as zero.
/// A version without a leading number has no numeric form and is never
/// considered older than anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PlatformVersion {
    raw: String,
    components: Vec<u64>,
}

impl PlatformVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let numeric: String = raw
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let components = numeric
            .split('.')
            .map_while(|part| part.parse::<u64>().ok())
            .collect();

        Self { raw, components }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Numeric comparison against another dotted version
    pub fn compare(&self, other: &str) -> Option<Ordering> {
        let other = PlatformVersion::new(other);
        if self.components.is_empty() || other.components.is_empty() {
            return None;
        }

        let len = self.components.len().max(other.components.len());
        let at = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
        let ordering = (0..len)
            .map(|i| at(&self.components, i).cmp(&at(&other.components, i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal);
        Some(ordering)
    }

    /// True only when both versions are numeric and this one is lower
    pub fn is_older_than(&self, other: &str) -> bool {
        self.compare(other) == Some(Ordering::Less)
    }
}

impl From<String> for PlatformVersion {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<PlatformVersion> for String {
    fn from(value: PlatformVersion) -> Self {
        value.raw
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Operation requested from a service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCommand {
    Start,
    Restart,
}

/// Operations a service script understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ServiceSupports {
    pub start: bool,
    pub restart: bool,
    pub status: bool,
    pub reload: bool,
}

/// A service to poke after identity files change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub supports: ServiceSupports,
    pub provider: ServiceManager,
    pub command: ServiceCommand,
}

/// Platform facts for one run, supplied by the host info reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContext {
    pub family: PlatformFamily,
    pub distro: String,
    pub version: PlatformVersion,
    pub service_manager: ServiceManager,
}

impl PlatformContext {
    /// Releases before this use `/etc/sysconfig/network` and the `network` service
    pub const LEGACY_RHEL_BEFORE: &'static str = "7.0";

    pub fn new(
        family: PlatformFamily,
        distro: impl Into<String>,
        version: impl Into<String>,
        service_manager: ServiceManager,
    ) -> Self {
        Self {
            family,
            distro: distro.into().to_lowercase(),
            version: PlatformVersion::new(version),
            service_manager,
        }
    }

    pub fn is_mac(&self) -> bool {
        self.family == PlatformFamily::MacOsX
    }

    pub fn is_debian_family(&self) -> bool {
        self.family == PlatformFamily::Debian
    }

    /// RHEL-family release older than 7.0
    pub fn is_legacy_rhel(&self) -> bool {
        self.family == PlatformFamily::Rhel && self.version.is_older_than(Self::LEGACY_RHEL_BEFORE)
    }

    /// Service refreshed after the hostname file is rewritten
    ///
    /// Keyed on the exact distro name: `debian` gets the start-only
    /// `hostname.sh` init script, `ubuntu` gets the upstart `hostname` job.
    pub fn hostname_service(&self) -> Option<ServiceSpec> {
        if self.family != PlatformFamily::Debian {
            return None;
        }

        match self.distro.as_str() {
            "debian" => Some(ServiceSpec {
                name: "hostname.sh".to_string(),
                supports: ServiceSupports {
                    start: true,
                    ..ServiceSupports::default()
                },
                provider: ServiceManager::Init,
                command: ServiceCommand::Start,
            }),
            "ubuntu" => Some(ServiceSpec {
                name: "hostname".to_string(),
                supports: ServiceSupports {
                    start: true,
                    restart: true,
                    status: false,
                    reload: true,
                },
                provider: ServiceManager::Upstart,
                command: ServiceCommand::Restart,
            }),
            _ => None,
        }
    }

    /// Legacy RHEL network service restarted after the sysconfig update
    pub fn network_service(&self) -> Option<ServiceSpec> {
        if !self.is_legacy_rhel() {
            return None;
        }

        Some(ServiceSpec {
            name: "network".to_string(),
            supports: ServiceSupports {
                start: true,
                restart: true,
                status: true,
                reload: false,
            },
            provider: self.service_manager,
            command: ServiceCommand::Restart,
        })
    }
}
