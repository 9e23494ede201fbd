// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Host Identity Convergence
//!
//! One run, end to end:
//!
//! ```text
//! HostIdentityConfig
//!     ↓
//! HostInfoReader (platform + observed state)
//!     ↓
//! ConvergencePlan::build (pure)
//!     ↓
//! ActionDispatcher (system, or logging on dry run)
//!     ↓
//! ConvergenceReport
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_host_identity::{HostIdentityConfig, HostIdentityService};
//!
//! let service = HostIdentityService::system(HostIdentityConfig::from_env()?);
//! let report = service.converge().await?;
//! ```

use tracing::info;

use crate::config::HostIdentityConfig;
use crate::convergence::{ConvergencePlan, ObservedState, PlanInput};
use crate::dispatch::command::{CommandRunner, SystemCommandRunner};
use crate::dispatch::{run_plan, ConvergenceReport, LoggingDispatcher, SystemDispatcher};
use crate::domain::PlatformContext;
use crate::errors::InfrastructureResult;
use crate::host_info::{HostInfoReader, SystemHostInfo};

/// Planning output for one run, before anything is applied
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub platform: PlatformContext,
    pub observed: ObservedState,
    pub plan: ConvergencePlan,
}

/// Observes, plans and converges this machine's identity
#[derive(Debug, Clone)]
pub struct HostIdentityService<H, R> {
    config: HostIdentityConfig,
    reader: H,
    runner: R,
}

impl HostIdentityService<SystemHostInfo<SystemCommandRunner>, SystemCommandRunner> {
    /// Service wired to the local machine
    pub fn system(config: HostIdentityConfig) -> Self {
        let runner = SystemCommandRunner::new().with_timeout(config.command_timeout());
        let reader = SystemHostInfo::new(runner.clone(), config.paths.clone());
        Self::new(config, reader, runner)
    }
}

impl<H, R> HostIdentityService<H, R>
where
    H: HostInfoReader,
    R: CommandRunner + Clone,
{
    pub fn new(config: HostIdentityConfig, reader: H, runner: R) -> Self {
        Self {
            config,
            reader,
            runner,
        }
    }

    pub fn config(&self) -> &HostIdentityConfig {
        &self.config
    }

    /// Planner input for `platform`
    pub fn plan_input(&self, platform: PlatformContext) -> InfrastructureResult<PlanInput> {
        let mut input = PlanInput::new(self.config.hostname_spec(), platform)
            .with_policy(self.config.host_table_policy());
        input.netbios_name = self.config.netbios_name.clone();
        input.workgroup = self.config.workgroup.clone();
        input.local_ip = self.config.local_ip()?;
        Ok(input)
    }

    /// Observe the machine and build the plan without applying it
    pub async fn plan(&self) -> InfrastructureResult<PlannedRun> {
        let platform = self.reader.platform().await?;
        let observed = self.reader.observe(&platform).await;
        let input = self.plan_input(platform.clone())?;
        let plan = ConvergencePlan::build(&input, &observed)?;
        Ok(PlannedRun {
            platform,
            observed,
            plan,
        })
    }

    /// Observe, plan and apply
    pub async fn converge(&self) -> InfrastructureResult<ConvergenceReport> {
        let PlannedRun { platform, plan, .. } = self.plan().await?;
        info!(
            "Planned {} actions for {} on {} {} ({} pending)",
            plan.actions.len(),
            plan.identity.fqdn(),
            platform.distro,
            platform.version,
            plan.pending().count()
        );

        let report = if self.config.dry_run {
            let mut dispatcher = LoggingDispatcher::new();
            run_plan(&mut dispatcher, &plan).await
        } else {
            let mut dispatcher =
                SystemDispatcher::new(self.runner.clone(), self.config.paths.clone(), platform);
            run_plan(&mut dispatcher, &plan).await
        };
        Ok(report)
    }
}
