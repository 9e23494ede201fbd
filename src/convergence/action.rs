// Copyright (c) 2025 - Cowboy AI, Inc.
//! Convergence Actions
//!
//! Units of potential OS-level work. Actions are data: the planner emits
//! them with their guard already evaluated and their dependency edges
//! attached, and a dispatcher interprets them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::guard::GuardDecision;
use crate::domain::ServiceSpec;

/// macOS System Configuration parameters managed through `scutil`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigdParameter {
    HostName,
    ComputerName,
    LocalHostName,
}

impl ConfigdParameter {
    pub const ALL: [ConfigdParameter; 3] = [Self::HostName, Self::ComputerName, Self::LocalHostName];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HostName => "HostName",
            Self::ComputerName => "ComputerName",
            Self::LocalHostName => "LocalHostName",
        }
    }
}

/// macOS SMB server preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SmbParameter {
    NetBIOSName,
    Workgroup,
}

impl SmbParameter {
    pub const ALL: [SmbParameter; 2] = [Self::NetBIOSName, Self::Workgroup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetBIOSName => "NetBIOSName",
            Self::Workgroup => "Workgroup",
        }
    }
}

/// Discriminant of an [`Operation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SetKernelHostname,
    WriteHostnameFile,
    WriteHostTable,
    UpdateNetworkConfigFile,
    RunHostnamectl,
    RunDomainname,
    RestartService,
    TagCloudMetadata,
    SetConfigdParameter,
    SetSmbServerParameter,
    ShowHostInfo,
    ShowHostnamectl,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetKernelHostname => "set_kernel_hostname",
            Self::WriteHostnameFile => "write_hostname_file",
            Self::WriteHostTable => "write_host_table",
            Self::UpdateNetworkConfigFile => "update_network_config_file",
            Self::RunHostnamectl => "run_hostnamectl",
            Self::RunDomainname => "run_domainname",
            Self::RestartService => "restart_service",
            Self::TagCloudMetadata => "tag_cloud_metadata",
            Self::SetConfigdParameter => "set_configd_parameter",
            Self::SetSmbServerParameter => "set_smb_server_parameter",
            Self::ShowHostInfo => "show_host_info",
            Self::ShowHostnamectl => "show_hostnamectl",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Desired state carried by an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// `hostname <fqdn>`
    SetKernelHostname { fqdn: String },
    /// Replace the hostname file with `content`
    WriteHostnameFile { content: String },
    /// Replace the host table with `content`
    WriteHostTable { content: String },
    /// Set the `HOSTNAME=` line of the legacy network config
    UpdateNetworkConfigFile { hostname: String },
    /// `hostnamectl set-hostname <fqdn>`
    RunHostnamectl { fqdn: String },
    /// `domainname <domain>`
    RunDomainname { domain: String },
    RestartService { service: ServiceSpec },
    /// `rs_tag --add <tag>`
    TagCloudMetadata { tag: String },
    SetConfigdParameter {
        parameter: ConfigdParameter,
        value: String,
    },
    SetSmbServerParameter { parameter: SmbParameter, value: String },
    /// Log the resulting host information
    ShowHostInfo { fqdn: String },
    /// Log `hostnamectl` status
    ShowHostnamectl,
}

impl Operation {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SetKernelHostname { .. } => ActionKind::SetKernelHostname,
            Self::WriteHostnameFile { .. } => ActionKind::WriteHostnameFile,
            Self::WriteHostTable { .. } => ActionKind::WriteHostTable,
            Self::UpdateNetworkConfigFile { .. } => ActionKind::UpdateNetworkConfigFile,
            Self::RunHostnamectl { .. } => ActionKind::RunHostnamectl,
            Self::RunDomainname { .. } => ActionKind::RunDomainname,
            Self::RestartService { .. } => ActionKind::RestartService,
            Self::TagCloudMetadata { .. } => ActionKind::TagCloudMetadata,
            Self::SetConfigdParameter { .. } => ActionKind::SetConfigdParameter,
            Self::SetSmbServerParameter { .. } => ActionKind::SetSmbServerParameter,
            Self::ShowHostInfo { .. } => ActionKind::ShowHostInfo,
            Self::ShowHostnamectl => ActionKind::ShowHostnamectl,
        }
    }

    /// Stable identifier, unique within one plan
    pub fn id(&self) -> ActionId {
        let id = match self {
            Self::RestartService { service } => format!("restart_service[{}]", service.name),
            Self::SetConfigdParameter { parameter, .. } => {
                format!("set_configd_parameter[{}]", parameter.as_str())
            }
            Self::SetSmbServerParameter { parameter, .. } => {
                format!("set_smb_server_parameter[{}]", parameter.as_str())
            }
            other => other.kind().as_str().to_string(),
        };
        ActionId(id)
    }
}

/// Identifier of an action within a plan
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a dependent relates to its prerequisite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Run after the prerequisite; a prerequisite failure blocks
    After,
    /// Notification: the prerequisite actually changing something fires the
    /// dependent. Also implies `After`.
    Triggers,
}

/// Incoming dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub on: ActionId,
    pub edge: EdgeKind,
}

/// When an action is eligible to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Runs whenever its guard says the store is not converged
    Standalone,
    /// Runs only when a `Triggers` prerequisite applied successfully
    OnNotification,
}

/// One unit of potential OS-level work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceAction {
    pub id: ActionId,
    pub operation: Operation,
    pub guard: GuardDecision,
    pub activation: Activation,
    pub depends_on: Vec<Dependency>,
}

impl ConvergenceAction {
    pub fn new(operation: Operation, activation: Activation, guard: GuardDecision) -> Self {
        Self {
            id: operation.id(),
            operation,
            guard,
            activation,
            depends_on: Vec::new(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.operation.kind()
    }

    pub fn depends(&mut self, on: &ActionId, edge: EdgeKind) {
        let dependency = Dependency {
            on: on.clone(),
            edge,
        };
        if !self.depends_on.contains(&dependency) {
            self.depends_on.push(dependency);
        }
    }

    /// Prerequisites whose successful application fires this action
    pub fn triggered_by(&self) -> impl Iterator<Item = &ActionId> {
        self.depends_on
            .iter()
            .filter(|d| d.edge == EdgeKind::Triggers)
            .map(|d| &d.on)
    }
}
