// Copyright (c) 2025 - Cowboy AI, Inc.
//! Action Dispatch
//!
//! Interprets a [`ConvergencePlan`] against the machine.
//!
//! ```text
//! ConvergencePlan (pure)            ActionDispatcher
//! ──────────────────────           ─────────────────
//!   ordered actions  ──run_plan──>   apply(operation)   (awaited one by one)
//!   guards + edges                        │
//!                                         ▼
//!                                  ConvergenceReport
//! ```
//!
//! Per action, in plan order:
//!
//! 1. a failed or blocked prerequisite blocks it
//! 2. a notification-only action with no `Triggers` prerequisite that
//!    applied is not run
//! 3. a guard that says "converged" skips it
//! 4. otherwise it is applied; an error is recorded, never retried
//!
//! A prerequisite skipped as already converged does not block its
//! dependents.

pub mod command;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SystemPaths;
use crate::convergence::{
    ActionId, ActionKind, Activation, ConvergencePlan, GuardDecision, Operation,
};
use crate::domain::PlatformContext;
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::host_info::{read_optional, HostSummary, SMB_SERVER_PREFERENCES};
use crate::sysconfig;
use command::{service_invocations, CommandRunner, Invocation};

/// Performs individual operations
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Apply one operation to the machine
    async fn apply(&mut self, operation: &Operation) -> InfrastructureResult<()>;

    /// Whether this dispatcher leaves the machine untouched
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// What happened to one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Applied successfully; fires `Triggers` dependents
    Applied,
    /// Guard found the store already converged
    Skipped { reason: String },
    /// Notification-only action that nothing fired
    NotTriggered,
    /// A prerequisite failed or was blocked
    Blocked { by: ActionId },
    Failed { error: String },
}

impl ActionOutcome {
    /// Whether dependents must not run
    pub fn blocks(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Blocked { .. })
    }
}

/// Outcome of one action in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub id: ActionId,
    pub kind: ActionKind,
    pub outcome: ActionOutcome,
}

/// Record of one dispatch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub run_id: Uuid,
    pub fqdn: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ActionResult>,
}

impl ConvergenceReport {
    pub fn outcome(&self, id: &str) -> Option<&ActionOutcome> {
        self.results
            .iter()
            .find(|result| result.id.as_str() == id)
            .map(|result| &result.outcome)
    }

    pub fn applied(&self) -> impl Iterator<Item = &ActionResult> {
        self.results
            .iter()
            .filter(|result| result.outcome == ActionOutcome::Applied)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.results.iter().filter(|result| result.outcome.blocks())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Nothing needed changing
    pub fn is_converged(&self) -> bool {
        self.is_success() && self.applied().next().is_none()
    }
}

/// Run every action of `plan` in order
pub async fn run_plan<D>(dispatcher: &mut D, plan: &ConvergencePlan) -> ConvergenceReport
where
    D: ActionDispatcher + ?Sized,
{
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    info!("Converging host identity to {} (run {})", plan.identity.fqdn(), run_id);

    let mut outcomes: HashMap<&ActionId, ActionOutcome> = HashMap::with_capacity(plan.actions.len());
    let mut results = Vec::with_capacity(plan.actions.len());

    for action in &plan.actions {
        let blocker = action
            .depends_on
            .iter()
            .find(|dependency| outcomes.get(&dependency.on).is_some_and(ActionOutcome::blocks));

        let fired = action
            .triggered_by()
            .any(|on| outcomes.get(on) == Some(&ActionOutcome::Applied));

        let outcome = if let Some(dependency) = blocker {
            warn!("{} blocked by {}", action.id, dependency.on);
            ActionOutcome::Blocked {
                by: dependency.on.clone(),
            }
        } else if action.activation == Activation::OnNotification && !fired {
            debug!("{} not triggered", action.id);
            ActionOutcome::NotTriggered
        } else if let GuardDecision::Skip { reason } = &action.guard {
            debug!("{} skipped: {}", action.id, reason);
            ActionOutcome::Skipped {
                reason: reason.clone(),
            }
        } else {
            match dispatcher.apply(&action.operation).await {
                Ok(()) => {
                    info!("{} applied", action.id);
                    ActionOutcome::Applied
                }
                Err(err) => {
                    warn!("{} failed: {}", action.id, err);
                    ActionOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            }
        };

        outcomes.insert(&action.id, outcome.clone());
        results.push(ActionResult {
            id: action.id.clone(),
            kind: action.kind(),
            outcome,
        });
    }

    let report = ConvergenceReport {
        run_id,
        fqdn: plan.identity.fqdn().to_string(),
        dry_run: dispatcher.is_dry_run(),
        started_at,
        finished_at: Utc::now(),
        results,
    };
    info!(
        "Run {} finished: {} applied, {} failed or blocked",
        report.run_id,
        report.applied().count(),
        report.failures().count()
    );
    report
}

/// Dry-run dispatcher - logs operations but doesn't perform them
#[derive(Debug, Clone, Default)]
pub struct LoggingDispatcher {
    /// Operations that would have been applied
    pub logged_operations: Vec<Operation>,
}

impl LoggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.logged_operations
    }
}

#[async_trait]
impl ActionDispatcher for LoggingDispatcher {
    async fn apply(&mut self, operation: &Operation) -> InfrastructureResult<()> {
        info!("[dry run] {}: {}", operation.kind(), describe(operation));
        self.logged_operations.push(operation.clone());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// Human-readable form of an operation
pub fn describe(operation: &Operation) -> String {
    match operation {
        Operation::WriteHostnameFile { content } => format!("write hostname file ({:?})", content),
        Operation::WriteHostTable { content } => {
            format!("write host table ({} lines)", content.lines().count())
        }
        Operation::UpdateNetworkConfigFile { hostname } => format!("set HOSTNAME={}", hostname),
        Operation::ShowHostInfo { fqdn } => format!("show host info for {}", fqdn),
        Operation::ShowHostnamectl => "show hostnamectl".to_string(),
        other => command_invocations(other)
            .iter()
            .map(Invocation::command_line)
            .collect::<Vec<_>>()
            .join(" || "),
    }
}

/// Commands that carry out a command-backed operation, tried in order
fn command_invocations(operation: &Operation) -> Vec<Invocation> {
    match operation {
        Operation::SetKernelHostname { fqdn } => vec![Invocation::new("hostname", [fqdn.as_str()])],
        Operation::RunHostnamectl { fqdn } => {
            vec![Invocation::new("hostnamectl", ["set-hostname", fqdn.as_str()])]
        }
        Operation::RunDomainname { domain } => {
            vec![Invocation::new("domainname", [domain.as_str()])]
        }
        Operation::RestartService { service } => service_invocations(service),
        Operation::TagCloudMetadata { tag } => vec![Invocation::new("rs_tag", ["--add", tag.as_str()])],
        Operation::SetConfigdParameter { parameter, value } => vec![Invocation::new(
            "scutil",
            ["--set", parameter.as_str(), value.as_str()],
        )],
        Operation::SetSmbServerParameter { parameter, value } => vec![Invocation::new(
            "defaults",
            ["write", SMB_SERVER_PREFERENCES, parameter.as_str(), value.as_str()],
        )],
        Operation::ShowHostnamectl => vec![Invocation::new("hostnamectl", Vec::<String>::new())],
        Operation::WriteHostnameFile { .. }
        | Operation::WriteHostTable { .. }
        | Operation::UpdateNetworkConfigFile { .. }
        | Operation::ShowHostInfo { .. } => Vec::new(),
    }
}

/// Dispatcher that changes the local machine
#[derive(Debug, Clone)]
pub struct SystemDispatcher<R> {
    runner: R,
    paths: SystemPaths,
    platform: PlatformContext,
}

impl<R: CommandRunner> SystemDispatcher<R> {
    pub fn new(runner: R, paths: SystemPaths, platform: PlatformContext) -> Self {
        Self {
            runner,
            paths,
            platform,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run the first invocation that succeeds
    async fn run_first_success(&self, invocations: Vec<Invocation>) -> InfrastructureResult<()> {
        let mut last_error = None;
        for invocation in invocations {
            match self.runner.run_checked(&invocation).await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    debug!("`{}` failed: {}", invocation.command_line(), err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            InfrastructureError::Configuration("no command available for this operation".to_string())
        }))
    }
}

#[async_trait]
impl<R: CommandRunner> ActionDispatcher for SystemDispatcher<R> {
    async fn apply(&mut self, operation: &Operation) -> InfrastructureResult<()> {
        match operation {
            Operation::WriteHostnameFile { content } => write_file(&self.paths.hostname, content).await,

            Operation::WriteHostTable { content } => write_file(&self.paths.hosts, content).await,

            Operation::UpdateNetworkConfigFile { hostname } => {
                let current = read_optional(&self.paths.sysconfig_network)
                    .await?
                    .unwrap_or_default();
                let updated = sysconfig::set_hostname(&current, hostname);
                write_file(&self.paths.sysconfig_network, &updated).await
            }

            Operation::ShowHostInfo { fqdn } => {
                let summary = HostSummary::collect(&self.runner, self.platform.is_mac()).await;
                summary.log(fqdn);
                if !summary.reports(fqdn) {
                    warn!("Host reports FQDN {:?}, expected {}", summary.fqdn, fqdn);
                }
                Ok(())
            }

            Operation::ShowHostnamectl => {
                let output = self
                    .runner
                    .run_checked(&Invocation::new("hostnamectl", Vec::<String>::new()))
                    .await?;
                info!("== hostnamectl ==");
                for line in output.stdout.lines() {
                    info!("{}", line);
                }
                Ok(())
            }

            command_backed => self.run_first_success(command_invocations(command_backed)).await,
        }
    }
}

async fn write_file(path: &Path, content: &str) -> InfrastructureResult<()> {
    debug!("Writing {} ({} bytes)", path.display(), content.len());
    tokio::fs::write(path, content).await?;
    Ok(())
}
