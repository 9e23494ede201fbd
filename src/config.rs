// Copyright (c) 2025 - Cowboy AI, Inc.
//! Run Configuration
//!
//! Loaded once per invocation: an optional JSON file named by
//! `HOST_IDENTITY_CONFIG`, then `HOST_IDENTITY_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::command::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::domain::{HostAddress, HostnameSpec};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::hosts::HostTablePolicy;

/// Environment variable naming the JSON configuration file
pub const CONFIG_FILE_ENV: &str = "HOST_IDENTITY_CONFIG";

const ENV_PREFIX: &str = "HOST_IDENTITY_";

/// Files the system reader and dispatcher touch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPaths {
    pub hosts: PathBuf,
    pub hostname: PathBuf,
    pub sysconfig_network: PathBuf,
    pub os_release: PathBuf,
    pub redhat_release: PathBuf,
    /// Present only when systemd is the running init
    pub systemd_run_dir: PathBuf,
    pub init_d: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            hosts: PathBuf::from("/etc/hosts"),
            hostname: PathBuf::from("/etc/hostname"),
            sysconfig_network: PathBuf::from("/etc/sysconfig/network"),
            os_release: PathBuf::from("/etc/os-release"),
            redhat_release: PathBuf::from("/etc/redhat-release"),
            systemd_run_dir: PathBuf::from("/run/systemd/system"),
            init_d: PathBuf::from("/etc/init.d"),
        }
    }
}

impl SystemPaths {
    /// Every path placed under `root`, for tests and chroots
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let rebase = |path: PathBuf| root.join(path.strip_prefix("/").unwrap_or(&path));
        let defaults = Self::default();
        Self {
            hosts: rebase(defaults.hosts),
            hostname: rebase(defaults.hostname),
            sysconfig_network: rebase(defaults.sysconfig_network),
            os_release: rebase(defaults.os_release),
            redhat_release: rebase(defaults.redhat_release),
            systemd_run_dir: rebase(defaults.systemd_run_dir),
            init_d: rebase(defaults.init_d),
        }
    }
}

/// Configuration for one convergence run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostIdentityConfig {
    /// Desired hostname, short or fully qualified
    pub hostname: String,
    pub short_hostname: Option<String>,
    pub domain_name: Option<String>,
    /// Domain used when none can be derived
    pub fallback_domain: String,
    /// Map the real address to the FQDN instead of a loopback address
    pub permanent_ip: bool,
    /// Extra `ip → hostname` host table rows
    pub static_hosts: BTreeMap<String, String>,
    pub netbios_name: Option<String>,
    pub workgroup: Option<String>,
    /// Overrides local address discovery
    pub local_ip: Option<String>,
    pub paths: SystemPaths,
    /// Upper bound for any single external command
    pub command_timeout_secs: u64,
    /// Plan and log without touching the machine
    pub dry_run: bool,
}

impl Default for HostIdentityConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            short_hostname: None,
            domain_name: None,
            fallback_domain: HostnameSpec::DEFAULT_FALLBACK_DOMAIN.to_string(),
            permanent_ip: false,
            static_hosts: BTreeMap::new(),
            netbios_name: None,
            workgroup: None,
            local_ip: None,
            paths: SystemPaths::default(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            dry_run: false,
        }
    }
}

impl HostIdentityConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    pub fn with_paths(mut self, paths: SystemPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_permanent_ip(mut self, permanent_ip: bool) -> Self {
        self.permanent_ip = permanent_ip;
        self
    }

    pub fn with_static_host(mut self, ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        self.static_hosts.insert(ip.into(), hostname.into());
        self
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            InfrastructureError::Configuration(format!("cannot read {}: {}", path.display(), err))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> InfrastructureResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> InfrastructureResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST_IDENTITY_*` overrides
    pub fn apply_overrides<F>(&mut self, lookup: F) -> InfrastructureResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(hostname) = var("HOSTNAME") {
            self.hostname = hostname;
        }
        if let Some(short) = var("SHORT_HOSTNAME") {
            self.short_hostname = Some(short);
        }
        if let Some(domain) = var("DOMAIN_NAME") {
            self.domain_name = Some(domain);
        }
        if let Some(fallback) = var("FALLBACK_DOMAIN") {
            self.fallback_domain = fallback;
        }
        if let Some(flag) = var("PERMANENT_IP") {
            self.permanent_ip = parse_flag("PERMANENT_IP", &flag)?;
        }
        if let Some(hosts) = var("STATIC_HOSTS") {
            self.static_hosts = parse_static_hosts(&hosts)?;
        }
        if let Some(name) = var("NETBIOS_NAME") {
            self.netbios_name = Some(name);
        }
        if let Some(workgroup) = var("WORKGROUP") {
            self.workgroup = Some(workgroup);
        }
        if let Some(ip) = var("LOCAL_IP") {
            self.local_ip = Some(ip);
        }
        if let Some(secs) = var("COMMAND_TIMEOUT") {
            self.command_timeout_secs = secs.trim().parse().map_err(|_| {
                InfrastructureError::Configuration(format!(
                    "{}COMMAND_TIMEOUT must be a number of seconds, got '{}'",
                    ENV_PREFIX, secs
                ))
            })?;
        }
        if let Some(flag) = var("DRY_RUN") {
            self.dry_run = parse_flag("DRY_RUN", &flag)?;
        }
        if let Some(path) = var("HOSTS_FILE") {
            self.paths.hosts = PathBuf::from(path);
        }
        if let Some(path) = var("HOSTNAME_FILE") {
            self.paths.hostname = PathBuf::from(path);
        }
        if let Some(path) = var("SYSCONFIG_NETWORK") {
            self.paths.sysconfig_network = PathBuf::from(path);
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a plan
    pub fn validate(&self) -> InfrastructureResult<()> {
        if self.hostname.trim().is_empty() {
            return Err(InfrastructureError::Configuration(format!(
                "hostname not set (use {}HOSTNAME or {})",
                ENV_PREFIX, CONFIG_FILE_ENV
            )));
        }
        if self.command_timeout_secs == 0 {
            return Err(InfrastructureError::Configuration(
                "command timeout must be at least one second".to_string(),
            ));
        }
        self.local_ip()?;
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn hostname_spec(&self) -> HostnameSpec {
        let mut spec = HostnameSpec::new(self.hostname.clone(), self.fallback_domain.clone());
        if let Some(short) = &self.short_hostname {
            spec = spec.with_short_name(short.clone());
        }
        if let Some(domain) = &self.domain_name {
            spec = spec.with_domain(domain.clone());
        }
        spec
    }

    pub fn host_table_policy(&self) -> HostTablePolicy {
        HostTablePolicy {
            permanent_ip: self.permanent_ip,
            static_hosts: self.static_hosts.clone(),
        }
    }

    /// Configured local address, if any
    pub fn local_ip(&self) -> InfrastructureResult<Option<HostAddress>> {
        self.local_ip
            .as_deref()
            .map(|ip| {
                HostAddress::new(ip)
                    .map_err(|err| InfrastructureError::Configuration(err.to_string()))
            })
            .transpose()
    }
}

fn parse_flag(name: &str, value: &str) -> InfrastructureResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(InfrastructureError::Configuration(format!(
            "{}{} must be a boolean, got '{}'",
            ENV_PREFIX, name, other
        ))),
    }
}

/// Parse `ip=name[,ip=name...]`
fn parse_static_hosts(value: &str) -> InfrastructureResult<BTreeMap<String, String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((ip, name)) if !ip.trim().is_empty() && !name.trim().is_empty() => {
                Ok((ip.trim().to_string(), name.trim().to_string()))
            }
            _ => Err(InfrastructureError::Configuration(format!(
                "static host '{}' is not ip=name",
                pair
            ))),
        })
        .collect()
}
