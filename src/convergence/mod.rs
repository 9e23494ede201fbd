// Copyright (c) 2025 - Cowboy AI, Inc.
//! Convergence Decision Engine
//!
//! Pure planning over an [`ObservedState`] snapshot:
//!
//! - [`action`] - typed actions, dependency edges and activation modes
//! - [`observed`] - what the host info reader saw
//! - [`guard`] - per-operation "already converged?" decisions
//! - [`graph`] - edge validation and topological ordering
//! - [`plan`] - the [`ConvergencePlan`] builder
//!
//! No I/O happens here; the dispatcher interprets the plan.

pub mod action;
pub mod graph;
pub mod guard;
pub mod observed;
pub mod plan;

pub use action::{
    ActionId, ActionKind, Activation, ConfigdParameter, ConvergenceAction, Dependency, EdgeKind,
    Operation, SmbParameter,
};
pub use graph::topological_order;
pub use guard::{evaluate, should_apply, GuardDecision};
pub use observed::{Observed, ObservedState, ToolPresence};
pub use plan::{ConvergencePlan, PlanInput};
