//! Host identity convergence for the Composable Information Machine
//!
//! Computes one machine's identity (short name, domain, FQDN) from partial
//! input, plans the host table rows and OS-level hostname changes it implies,
//! and applies only what differs from the observed state.
//!
//! Planning ([`convergence`], [`hosts`], [`domain`]) is pure and synchronous.
//! Observation ([`host_info`]) and application ([`dispatch`]) sit behind
//! async traits so the same plan can be run for real, logged as a dry run or
//! driven by test doubles.

pub mod config;
pub mod convergence;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod host_info;
pub mod hosts;
pub mod service;
pub mod sysconfig;

// Re-export commonly used types
pub use config::{HostIdentityConfig, SystemPaths};
pub use convergence::{ConvergencePlan, ObservedState, PlanInput};
pub use dispatch::{ActionDispatcher, ConvergenceReport, LoggingDispatcher, SystemDispatcher};
pub use domain::{resolve, HostnameSpec, PlatformContext, ResolvedIdentity};
pub use errors::{InfrastructureError, InfrastructureResult, PlanError, PlanResult};
pub use service::HostIdentityService;
