// Copyright (c) 2025 - Cowboy AI, Inc.
//! Convergence Guard Evaluator
//!
//! Decides, per operation, whether the observed machine already holds the
//! desired state. Guards are pure and never fail: when the observation they
//! need is missing they answer `Apply` and leave any resulting error to the
//! dispatcher.
//!
//! | Operation | Skipped when |
//! |---|---|
//! | SetKernelHostname | `hostname -f` equals the FQDN |
//! | RunHostnamectl | tool absent, or `hostname -f` equals the FQDN |
//! | WriteHostnameFile | macOS, or file content already identical |
//! | WriteHostTable | rendered table already identical |
//! | UpdateNetworkConfigFile | not RHEL < 7.0, or `HOSTNAME=` already set |
//! | RestartService | no service manager to talk to |
//! | RunDomainname / TagCloudMetadata / ShowHostnamectl | tool absent |
//! | SetConfigdParameter / SetSmbServerParameter | not macOS, or value already set |

use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::Operation;
use super::observed::{Observed, ObservedState};
use crate::domain::{PlatformContext, ServiceManager};

/// Outcome of a guard evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Apply,
    Skip { reason: String },
}

impl GuardDecision {
    fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    pub fn applies(&self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for GuardDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Skip { reason } => write!(f, "skip ({})", reason),
        }
    }
}

/// Whether `operation` must run this cycle
pub fn should_apply(operation: &Operation, observed: &ObservedState, platform: &PlatformContext) -> bool {
    evaluate(operation, observed, platform).applies()
}

/// Evaluate the guard for `operation`, with the reason when skipped
pub fn evaluate(
    operation: &Operation,
    observed: &ObservedState,
    platform: &PlatformContext,
) -> GuardDecision {
    match operation {
        Operation::SetKernelHostname { fqdn } => kernel_hostname_guard(fqdn, observed),

        Operation::RunHostnamectl { fqdn } => match tool_guard("hostnamectl", &observed.tools.hostnamectl) {
            GuardDecision::Apply => kernel_hostname_guard(fqdn, observed),
            skip => skip,
        },

        Operation::WriteHostnameFile { content } => {
            if platform.is_mac() {
                return GuardDecision::skip("hostname file is not authoritative on mac_os_x");
            }
            match &observed.hostname_file {
                Observed::Value(Some(current)) if current == content => {
                    GuardDecision::skip("hostname file already up to date")
                }
                _ => GuardDecision::Apply,
            }
        }

        Operation::WriteHostTable { content } => match &observed.host_table {
            Observed::Value(current) if current == content => {
                GuardDecision::skip("host table already up to date")
            }
            _ => GuardDecision::Apply,
        },

        Operation::UpdateNetworkConfigFile { hostname } => {
            if !platform.is_legacy_rhel() {
                return GuardDecision::skip(format!(
                    "network config file only managed on rhel before {}",
                    PlatformContext::LEGACY_RHEL_BEFORE
                ));
            }
            match &observed.network_config_hostname {
                Observed::Value(Some(current)) if current == hostname => {
                    GuardDecision::skip(format!("HOSTNAME={} already set", hostname))
                }
                _ => GuardDecision::Apply,
            }
        }

        Operation::RestartService { service } => match service.provider {
            ServiceManager::None => {
                GuardDecision::skip(format!("no service manager to restart {}", service.name))
            }
            _ => GuardDecision::Apply,
        },

        Operation::RunDomainname { .. } => tool_guard("domainname", &observed.tools.domainname),

        Operation::TagCloudMetadata { .. } => tool_guard("rs_tag", &observed.tools.rs_tag),

        Operation::ShowHostnamectl => tool_guard("hostnamectl", &observed.tools.hostnamectl),

        Operation::SetConfigdParameter { parameter, value } => {
            if !platform.is_mac() {
                return GuardDecision::skip("configd parameters only exist on mac_os_x");
            }
            value_guard(parameter.as_str(), value, observed.configd.get(parameter))
        }

        Operation::SetSmbServerParameter { parameter, value } => {
            if !platform.is_mac() {
                return GuardDecision::skip("smb server preferences only exist on mac_os_x");
            }
            value_guard(parameter.as_str(), value, observed.smb_server.get(parameter))
        }

        Operation::ShowHostInfo { .. } => GuardDecision::Apply,
    }
}

fn kernel_hostname_guard(fqdn: &str, observed: &ObservedState) -> GuardDecision {
    match &observed.kernel_fqdn {
        Observed::Value(current) if current == fqdn => {
            GuardDecision::skip(format!("kernel hostname already {}", fqdn))
        }
        _ => GuardDecision::Apply,
    }
}

fn tool_guard(tool: &str, presence: &Observed<bool>) -> GuardDecision {
    match presence {
        Observed::Value(false) => GuardDecision::skip(format!("{} not installed", tool)),
        _ => GuardDecision::Apply,
    }
}

fn value_guard(name: &str, desired: &str, current: Option<&Observed<String>>) -> GuardDecision {
    match current {
        Some(Observed::Value(current)) if current == desired => {
            GuardDecision::skip(format!("{} already {}", name, desired))
        }
        _ => GuardDecision::Apply,
    }
}
