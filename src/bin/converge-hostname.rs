// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Identity Convergence
//!
//! Sets this machine's hostname, domain and host table to the configured
//! identity, changing only what differs.
//!
//! Run with: cargo run --bin converge-hostname
//!
//! Configuration:
//! 1. `HOST_IDENTITY_CONFIG` - optional JSON config file
//! 2. `HOST_IDENTITY_HOSTNAME` - desired hostname (required unless in the file)
//! 3. `HOST_IDENTITY_DRY_RUN=1` - log the plan without changing anything
//!
//! See `HostIdentityConfig::apply_overrides` for the full list.

use anyhow::{bail, Context, Result};
use cim_host_identity::{HostIdentityConfig, HostIdentityService};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = HostIdentityConfig::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded:");
    info!("  - Hostname: {}", config.hostname);
    if let Some(domain) = &config.domain_name {
        info!("  - Domain: {}", domain);
    }
    info!("  - Permanent IP: {}", config.permanent_ip);
    info!("  - Static hosts: {}", config.static_hosts.len());
    info!("  - Command timeout: {}s", config.command_timeout_secs);
    info!("  - Dry run: {}", config.dry_run);

    let service = HostIdentityService::system(config);
    let report = service
        .converge()
        .await
        .context("Failed to plan host identity convergence")?;

    if report.dry_run {
        info!(
            "Dry run complete: {} actions would be applied",
            report.applied().count()
        );
        return Ok(());
    }

    for failure in report.failures() {
        warn!("{}: {:?}", failure.id, failure.outcome);
    }
    if !report.is_success() {
        bail!(
            "{} of {} actions failed or were blocked (run {})",
            report.failures().count(),
            report.results.len(),
            report.run_id
        );
    }

    if report.is_converged() {
        info!("{} already converged", report.fqdn);
    } else {
        info!("{} converged ({} actions applied)", report.fqdn, report.applied().count());
    }
    Ok(())
}
