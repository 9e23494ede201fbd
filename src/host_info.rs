// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Info Reader
//!
//! Observes the machine at the start of a run: platform identity, current
//! names, file contents and tool presence. Every probe is recorded as an
//! [`Observed`] value so a failing probe degrades to "not converged" instead
//! of aborting the run.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::SystemPaths;
use crate::convergence::{ConfigdParameter, Observed, ObservedState, SmbParameter, ToolPresence};
use crate::dispatch::command::{CommandRunner, Invocation};
use crate::domain::{HostAddress, PlatformContext, PlatformFamily, ServiceManager};
use crate::errors::InfrastructureResult;
use crate::sysconfig;

/// Apple SMB server preference domain
pub const SMB_SERVER_PREFERENCES: &str = "/Library/Preferences/SystemConfiguration/com.apple.smb.server";

/// Remote address used only to select the outbound route; nothing is sent
const ROUTE_PROBE_ADDRESS: &str = "8.8.8.8:53";

/// Observes the local machine
#[async_trait]
pub trait HostInfoReader: Send + Sync {
    /// Platform facts for this run
    async fn platform(&self) -> InfrastructureResult<PlatformContext>;

    /// Snapshot of every store the guards consult
    async fn observe(&self, platform: &PlatformContext) -> ObservedState;
}

/// Fields of `/etc/os-release` the platform detection needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub version_id: String,
}

/// Parse `/etc/os-release` (`KEY=value`, values optionally quoted)
pub fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        match key {
            "ID" => release.id = value.to_lowercase(),
            "ID_LIKE" => {
                release.id_like = value.split_whitespace().map(str::to_lowercase).collect()
            }
            "VERSION_ID" => release.version_id = value.to_string(),
            _ => {}
        }
    }
    release
}

/// Platform family for an os-release `ID` and `ID_LIKE`
///
/// `ID` wins; otherwise the first `ID_LIKE` entry with a known family.
pub fn family_for(id: &str, id_like: &[String]) -> PlatformFamily {
    std::iter::once(id)
        .chain(id_like.iter().map(String::as_str))
        .map(PlatformFamily::from_str)
        .find(|family| *family != PlatformFamily::Other)
        .unwrap_or(PlatformFamily::Other)
}

/// Parse `/etc/redhat-release`, e.g. `CentOS release 6.10 (Final)`
///
/// Returns the lowercased first word and the first dotted number.
pub fn parse_redhat_release(content: &str) -> Option<(String, String)> {
    let line = content.lines().next()?.trim();
    let distro = line.split_whitespace().next()?.to_lowercase();
    let version = line
        .split_whitespace()
        .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))?;
    Some((distro, version.to_string()))
}

/// Reads platform facts and current state from the local machine
#[derive(Debug, Clone)]
pub struct SystemHostInfo<R> {
    runner: R,
    paths: SystemPaths,
}

impl<R: CommandRunner> SystemHostInfo<R> {
    pub fn new(runner: R, paths: SystemPaths) -> Self {
        Self { runner, paths }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn detect_service_manager(&self, family: PlatformFamily) -> ServiceManager {
        if family == PlatformFamily::MacOsX {
            return ServiceManager::Launchd;
        }
        if path_exists(&self.paths.systemd_run_dir).await {
            return ServiceManager::Systemd;
        }
        let initctl = Invocation::new("initctl", ["--version"]);
        if matches!(self.runner.run(&initctl).await, Ok(output) if output.is_success()) {
            return ServiceManager::Upstart;
        }
        if path_exists(&self.paths.init_d).await {
            return ServiceManager::Init;
        }
        ServiceManager::None
    }

    async fn observe_output(&self, invocation: Invocation) -> Observed<String> {
        let result = self
            .runner
            .run_checked(&invocation)
            .await
            .map(|output| output.stdout_trimmed().to_string());
        Observed::from_result(result)
    }

    async fn observe_tool(&self, tool: &str) -> Observed<bool> {
        Observed::from_result(self.runner.tool_exists(tool).await)
    }
}

#[async_trait]
impl<R: CommandRunner> HostInfoReader for SystemHostInfo<R> {
    async fn platform(&self) -> InfrastructureResult<PlatformContext> {
        let (family, distro, version) = match read_optional(&self.paths.os_release).await? {
            Some(content) => {
                let release = parse_os_release(&content);
                let family = family_for(&release.id, &release.id_like);
                (family, release.id, release.version_id)
            }
            None => match read_optional(&self.paths.redhat_release).await? {
                Some(content) => match parse_redhat_release(&content) {
                    Some((distro, version)) => (PlatformFamily::Rhel, distro, version),
                    None => (PlatformFamily::Rhel, "redhat".to_string(), String::new()),
                },
                None => {
                    let sw_vers = Invocation::new("sw_vers", ["-productVersion"]);
                    match self.runner.run_checked(&sw_vers).await {
                        Ok(output) => (
                            PlatformFamily::MacOsX,
                            PlatformFamily::MacOsX.as_str().to_string(),
                            output.stdout_trimmed().to_string(),
                        ),
                        Err(err) => {
                            debug!("sw_vers unavailable: {}", err);
                            (PlatformFamily::Other, "unknown".to_string(), String::new())
                        }
                    }
                }
            },
        };

        let service_manager = self.detect_service_manager(family).await;
        let platform = PlatformContext::new(family, distro, version, service_manager);
        debug!(
            "Detected platform {} ({} {}, {})",
            platform.family, platform.distro, platform.version, platform.service_manager
        );
        Ok(platform)
    }

    async fn observe(&self, platform: &PlatformContext) -> ObservedState {
        let kernel_fqdn = self.observe_output(Invocation::new("hostname", ["-f"])).await;

        let hostname_file = Observed::from_result(read_optional(&self.paths.hostname).await);
        let host_table = Observed::from_result(
            read_optional(&self.paths.hosts)
                .await
                .map(Option::unwrap_or_default),
        );
        let network_config_hostname = Observed::from_result(
            read_optional(&self.paths.sysconfig_network)
                .await
                .map(|content| content.as_deref().and_then(sysconfig::hostname_value)),
        );

        let tools = ToolPresence {
            hostnamectl: self.observe_tool("hostnamectl").await,
            domainname: self.observe_tool("domainname").await,
            rs_tag: self.observe_tool("rs_tag").await,
        };

        let mut observed = ObservedState {
            kernel_fqdn,
            hostname_file,
            host_table,
            network_config_hostname,
            local_ip: discover_local_ip().await,
            tools,
            ..ObservedState::default()
        };

        if platform.is_mac() {
            for parameter in ConfigdParameter::ALL {
                let probe = Invocation::new("scutil", ["--get", parameter.as_str()]);
                observed.configd.insert(parameter, self.observe_output(probe).await);
            }
            for parameter in SmbParameter::ALL {
                let probe = Invocation::new("defaults", ["read", SMB_SERVER_PREFERENCES, parameter.as_str()]);
                observed.smb_server.insert(parameter, self.observe_output(probe).await);
            }
        }

        observed
    }
}

/// File content, or `None` when the file does not exist
pub async fn read_optional(path: &Path) -> InfrastructureResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

/// Primary non-loopback address, found by asking the kernel which source
/// address it would use for an outbound route
pub async fn discover_local_ip() -> Option<HostAddress> {
    let socket = match tokio::net::UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(err) => {
            warn!("Cannot open probe socket: {}", err);
            return None;
        }
    };
    if let Err(err) = socket.connect(ROUTE_PROBE_ADDRESS).await {
        debug!("No outbound route: {}", err);
        return None;
    }
    match socket.local_addr() {
        Ok(addr) if !addr.ip().is_unspecified() && !addr.ip().is_loopback() => {
            Some(HostAddress::from(addr.ip()))
        }
        Ok(_) => None,
        Err(err) => {
            debug!("Cannot read probe socket address: {}", err);
            None
        }
    }
}

/// What the machine reports about itself after convergence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSummary {
    pub hostname: Option<String>,
    pub network_node: Option<String>,
    pub aliases: Option<String>,
    pub short_name: Option<String>,
    pub domain: Option<String>,
    pub fqdn: Option<String>,
    pub addresses: Option<String>,
    pub apple_smb_server: Option<String>,
}

impl HostSummary {
    /// Collect the summary; probes that fail or print nothing are `None`
    pub async fn collect<R: CommandRunner + ?Sized>(runner: &R, include_smb: bool) -> Self {
        async fn probe<R: CommandRunner + ?Sized>(runner: &R, invocation: Invocation) -> Option<String> {
            match runner.run_checked(&invocation).await {
                Ok(output) if !output.stdout_trimmed().is_empty() => {
                    Some(output.stdout_trimmed().to_string())
                }
                _ => None,
            }
        }

        let apple_smb_server = if include_smb {
            probe(runner, Invocation::new("defaults", ["read", SMB_SERVER_PREFERENCES])).await
        } else {
            None
        };

        Self {
            hostname: probe(runner, Invocation::new("hostname", Vec::<String>::new())).await,
            network_node: probe(runner, Invocation::new("uname", ["-n"])).await,
            aliases: probe(runner, Invocation::new("hostname", ["-a"])).await,
            short_name: probe(runner, Invocation::new("hostname", ["-s"])).await,
            domain: probe(runner, Invocation::new("hostname", ["-d"])).await,
            fqdn: probe(runner, Invocation::new("hostname", ["-f"])).await,
            addresses: probe(runner, Invocation::new("hostname", ["-i"])).await,
            apple_smb_server,
        }
    }

    /// Log the summary next to the FQDN the run aimed for
    pub fn log(&self, desired_fqdn: &str) {
        fn shown(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("<none>")
        }

        info!("== New host/node information ==");
        info!("Hostname: {}", shown(&self.hostname));
        info!("Network node hostname: {}", shown(&self.network_node));
        info!("Alias names of host: {}", shown(&self.aliases));
        info!("Short host name: {}", shown(&self.short_name));
        info!("Domain of hostname: {}", shown(&self.domain));
        info!("FQDN of host: {}", shown(&self.fqdn));
        info!("IP address(es) for the hostname: {}", shown(&self.addresses));
        info!("Desired FQDN: {}", desired_fqdn);
        if let Some(smb) = &self.apple_smb_server {
            info!("Apple SMB Server: {}", smb);
        }
    }

    /// Whether the machine now reports `fqdn`
    pub fn reports(&self, fqdn: &str) -> bool {
        self.fqdn.as_deref() == Some(fqdn)
    }
}
