// Copyright (c) 2025 - Cowboy AI, Inc.
//! Convergence Plan
//!
//! Ties the pure stages together for one run:
//!
//! ```text
//! HostnameSpec ──resolve──> ResolvedIdentity ──hosts::plan──> HostEntry list
//!                                  │                               │
//!                                  │                 HostTable::reconcile(observed)
//!                                  ▼                               ▼
//!                          actions + guards ──topological_order──> ConvergencePlan
//! ```
//!
//! Either a complete plan comes back or a `PlanError`; nothing is applied
//! here.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::action::{
    Activation, ActionId, ConfigdParameter, ConvergenceAction, EdgeKind, Operation, SmbParameter,
};
use super::graph::topological_order;
use super::guard::evaluate;
use super::observed::{Observed, ObservedState};
use crate::domain::invariants::{
    validate_identity, validate_loopback_strategy, validate_unique_addresses,
};
use crate::domain::{resolve, HostAddress, HostnameSpec, PlatformContext, ResolvedIdentity};
use crate::errors::PlanResult;
use crate::hosts::{self, EntryOutcome, HostEntry, HostTable, HostTablePolicy};

/// Everything the planner needs besides the observed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInput {
    pub spec: HostnameSpec,
    pub policy: HostTablePolicy,
    pub platform: PlatformContext,
    /// SMB NetBIOS name (macOS); defaults to the uppercase short name
    pub netbios_name: Option<String>,
    /// SMB workgroup (macOS); defaults to the NetBIOS name
    pub workgroup: Option<String>,
    /// Overrides the observed local address
    pub local_ip: Option<HostAddress>,
}

impl PlanInput {
    pub fn new(spec: HostnameSpec, platform: PlatformContext) -> Self {
        Self {
            spec,
            policy: HostTablePolicy::default(),
            platform,
            netbios_name: None,
            workgroup: None,
            local_ip: None,
        }
    }

    pub fn with_policy(mut self, policy: HostTablePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_local_ip(mut self, local_ip: HostAddress) -> Self {
        self.local_ip = Some(local_ip);
        self
    }
}

/// Ordered, guarded actions for one run plus the content they write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergencePlan {
    pub identity: ResolvedIdentity,
    pub host_entries: Vec<HostEntry>,
    pub entry_outcomes: Vec<EntryOutcome>,
    pub hostname_file_content: String,
    pub host_table_content: String,
    pub actions: Vec<ConvergenceAction>,
}

impl ConvergencePlan {
    /// Build the plan for `input` against a snapshot of the machine
    ///
    /// # Errors
    /// - `InvalidInput` from resolution, static hosts or invariant checks
    /// - `ConflictingHostEntry` from the host table planner
    /// - `DependencyCycle` if the emitted edges are not acyclic
    pub fn build(input: &PlanInput, observed: &ObservedState) -> PlanResult<Self> {
        let identity = resolve(&input.spec)?;
        validate_identity(&identity)?;

        let local_ip = input.local_ip.as_ref().or(observed.local_ip.as_ref());
        let host_entries = hosts::plan(&identity, &input.platform, &input.policy, local_ip)?;
        validate_unique_addresses(&host_entries)?;
        validate_loopback_strategy(&host_entries, identity.fqdn(), input.policy.permanent_ip)?;

        let mut table = match &observed.host_table {
            Observed::Value(content) => HostTable::parse(content),
            Observed::Failed(reason) => {
                warn!("Host table could not be read ({}); planning from an empty table", reason);
                HostTable::new()
            }
        };
        let entry_outcomes = table.reconcile(&host_entries);
        let host_table_content = table.render();
        let hostname_file_content = identity.hostname_file_content();

        let actions = emit_actions(
            input,
            &identity,
            &hostname_file_content,
            &host_table_content,
            observed,
        );
        let actions = topological_order(actions)?;

        debug!(
            "Planned {} actions for {} ({} pending)",
            actions.len(),
            identity.fqdn(),
            actions.iter().filter(|a| a.guard.applies()).count()
        );

        Ok(Self {
            identity,
            host_entries,
            entry_outcomes,
            hostname_file_content,
            host_table_content,
            actions,
        })
    }

    pub fn action(&self, id: &str) -> Option<&ConvergenceAction> {
        self.actions.iter().find(|action| action.id.as_str() == id)
    }

    /// Actions whose guard says the machine is not converged
    pub fn pending(&self) -> impl Iterator<Item = &ConvergenceAction> {
        self.actions.iter().filter(|action| action.guard.applies())
    }

    /// Host table entries that change the file
    pub fn changed_entries(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entry_outcomes.iter().filter(|outcome| outcome.changed)
    }
}

/// Collects actions in emission order, evaluating each guard as it goes
struct ActionSet<'a> {
    observed: &'a ObservedState,
    platform: &'a PlatformContext,
    actions: Vec<ConvergenceAction>,
}

impl<'a> ActionSet<'a> {
    fn push(&mut self, operation: Operation, activation: Activation) -> ActionId {
        let guard = evaluate(&operation, self.observed, self.platform);
        let action = ConvergenceAction::new(operation, activation, guard);
        let id = action.id.clone();
        self.actions.push(action);
        id
    }

    fn push_after(
        &mut self,
        operation: Operation,
        activation: Activation,
        edges: &[(&ActionId, EdgeKind)],
    ) -> ActionId {
        let id = self.push(operation, activation);
        if let Some(action) = self.actions.last_mut() {
            for (on, edge) in edges {
                action.depends(on, *edge);
            }
        }
        id
    }
}

fn emit_actions(
    input: &PlanInput,
    identity: &ResolvedIdentity,
    hostname_file_content: &str,
    host_table_content: &str,
    observed: &ObservedState,
) -> Vec<ConvergenceAction> {
    let platform = &input.platform;
    let fqdn = identity.fqdn();
    let mut set = ActionSet {
        observed,
        platform,
        actions: Vec::new(),
    };

    let mut host_info_triggers = Vec::new();
    if platform.is_mac() {
        for parameter in ConfigdParameter::ALL {
            let value = match parameter {
                ConfigdParameter::HostName => fqdn.to_string(),
                ConfigdParameter::ComputerName | ConfigdParameter::LocalHostName => {
                    identity.short_name().to_string()
                }
            };
            host_info_triggers.push(set.push(
                Operation::SetConfigdParameter { parameter, value },
                Activation::Standalone,
            ));
        }

        let netbios_name = input
            .netbios_name
            .clone()
            .unwrap_or_else(|| identity.short_name().to_uppercase());
        let workgroup = input.workgroup.clone().unwrap_or_else(|| netbios_name.clone());
        for parameter in SmbParameter::ALL {
            let value = match parameter {
                SmbParameter::NetBIOSName => netbios_name.clone(),
                SmbParameter::Workgroup => workgroup.clone(),
            };
            host_info_triggers.push(set.push(
                Operation::SetSmbServerParameter { parameter, value },
                Activation::Standalone,
            ));
        }
    }

    let host_table = set.push(
        Operation::WriteHostTable {
            content: host_table_content.to_string(),
        },
        Activation::Standalone,
    );

    let hostname_file = set.push_after(
        Operation::WriteHostnameFile {
            content: hostname_file_content.to_string(),
        },
        Activation::Standalone,
        &[(&host_table, EdgeKind::After)],
    );
    host_info_triggers.insert(0, hostname_file.clone());

    if let Some(service) = platform.hostname_service() {
        set.push_after(
            Operation::RestartService { service },
            Activation::OnNotification,
            &[(&hostname_file, EdgeKind::Triggers)],
        );
    }

    let network_config = set.push_after(
        Operation::UpdateNetworkConfigFile {
            hostname: fqdn.to_string(),
        },
        Activation::Standalone,
        &[(&hostname_file, EdgeKind::Triggers)],
    );

    set.push_after(
        Operation::RunDomainname {
            domain: identity.domain().to_string(),
        },
        Activation::OnNotification,
        &[(&hostname_file, EdgeKind::Triggers)],
    );

    let kernel = set.push_after(
        Operation::SetKernelHostname {
            fqdn: fqdn.to_string(),
        },
        Activation::Standalone,
        &[
            (&hostname_file, EdgeKind::Triggers),
            (&host_table, EdgeKind::After),
        ],
    );

    let hostnamectl = set.push_after(
        Operation::RunHostnamectl {
            fqdn: fqdn.to_string(),
        },
        Activation::Standalone,
        &[(&kernel, EdgeKind::After)],
    );

    set.push(
        Operation::TagCloudMetadata {
            tag: format!("node:hostname={}", fqdn),
        },
        Activation::Standalone,
    );

    if let Some(service) = platform.network_service() {
        set.push_after(
            Operation::RestartService { service },
            Activation::OnNotification,
            &[(&network_config, EdgeKind::Triggers)],
        );
    }

    set.push_after(
        Operation::ShowHostnamectl,
        Activation::OnNotification,
        &[(&hostnamectl, EdgeKind::Triggers)],
    );

    let triggers: Vec<(&ActionId, EdgeKind)> = host_info_triggers
        .iter()
        .map(|id| (id, EdgeKind::Triggers))
        .collect();
    set.push_after(
        Operation::ShowHostInfo {
            fqdn: fqdn.to_string(),
        },
        Activation::OnNotification,
        &triggers,
    );

    set.actions
}
