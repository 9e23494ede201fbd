// Copyright (c) 2025 - Cowboy AI, Inc.
//! Observed Machine State
//!
//! Snapshot of what the host info reader saw at the start of a run. Each
//! probe records either its value or why it could not be taken; guards
//! treat a failed probe as "not converged".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

use super::action::{ConfigdParameter, SmbParameter};
use crate::domain::HostAddress;

/// Result of a single observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observed<T> {
    Value(T),
    Failed(String),
}

impl<T> Observed<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

impl<T> Default for Observed<T> {
    fn default() -> Self {
        Self::Failed("not observed".to_string())
    }
}

/// Presence of optional external tools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPresence {
    pub hostnamectl: Observed<bool>,
    pub domainname: Observed<bool>,
    pub rs_tag: Observed<bool>,
}

/// Everything the guards may consult
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    /// Output of `hostname -f`, trimmed
    pub kernel_fqdn: Observed<String>,
    /// Hostname file content; `None` when the file does not exist
    pub hostname_file: Observed<Option<String>>,
    /// Host table content; empty when the file does not exist
    pub host_table: Observed<String>,
    /// Value of the `HOSTNAME=` line; `None` when absent
    pub network_config_hostname: Observed<Option<String>>,
    /// Primary non-loopback address
    pub local_ip: Option<HostAddress>,
    pub tools: ToolPresence,
    /// macOS only
    pub configd: BTreeMap<ConfigdParameter, Observed<String>>,
    /// macOS only
    pub smb_server: BTreeMap<SmbParameter, Observed<String>>,
}
