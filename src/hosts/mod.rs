// Copyright (c) 2025 - Cowboy AI, Inc.
//! Static Host Table
//!
//! [`planner::plan`] decides which rows the table must hold for an identity;
//! [`HostTable`] applies those rows to what is on disk and renders the result.

pub mod entry;
pub mod planner;
pub mod table;

pub use entry::{HostAction, HostEntry};
pub use planner::{plan, HostTablePolicy};
pub use table::{EntryOutcome, HostTable, MANAGED_HEADER};
