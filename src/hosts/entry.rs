// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Table Entries

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::HostAddress;

/// What a planned entry does to its address key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostAction {
    Upsert,
    Remove,
}

/// One desired row of the static host table
///
/// A `Remove` with an empty `canonical_name` drops whatever line holds the
/// address. A `Remove` that names a host only drops the line when that name
/// appears on it (as canonical name or alias).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub ip: HostAddress,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub priority: i32,
    pub action: HostAction,
}

impl HostEntry {
    /// Priority given to entries that do not ask for one
    pub const DEFAULT_PRIORITY: i32 = 10;

    pub fn upsert(ip: HostAddress, canonical_name: impl Into<String>) -> Self {
        Self {
            ip,
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
            action: HostAction::Upsert,
        }
    }

    /// Remove the line for `ip` unconditionally
    pub fn remove(ip: HostAddress) -> Self {
        Self {
            ip,
            canonical_name: String::new(),
            aliases: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
            action: HostAction::Remove,
        }
    }

    /// Remove the line for `ip` only while it still names `canonical_name`
    pub fn remove_naming(ip: HostAddress, canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            ..Self::remove(ip)
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_upsert(&self) -> bool {
        self.action == HostAction::Upsert
    }

    /// Whether `name` appears on this line
    pub fn names(&self, name: &str) -> bool {
        self.canonical_name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Same canonical name and aliases, ignoring priority and action
    pub fn same_names_as(&self, other: &HostEntry) -> bool {
        self.canonical_name == other.canonical_name && self.aliases == other.aliases
    }

    /// Host table line: `<ip>\t<canonical_name>[ <alias> ...]`
    pub fn line(&self) -> String {
        let mut line = format!("{}\t{}", self.ip, self.canonical_name);
        for alias in &self.aliases {
            line.push(' ');
            line.push_str(alias);
        }
        line
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            HostAction::Upsert => write!(f, "upsert {} (priority {})", self.line(), self.priority),
            HostAction::Remove => write!(f, "remove {}", self.ip),
        }
    }
}
