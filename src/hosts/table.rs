// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Table Reconciliation
//!
//! Parses the observed host table, applies planned entries by address key and
//! renders the result. Rendering is deterministic: rows are ordered by
//! priority, then by the order they entered the table, so rendering the
//! parsed output of a previous run with the same plan gives the same bytes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entry::{HostAction, HostEntry};
use crate::domain::HostAddress;

/// Header written at the top of a managed host table
pub const MANAGED_HEADER: &str =
    "# This file is managed by cim-host-identity.\n# Local changes to managed entries will be overwritten.\n";

/// Result of applying one planned entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub ip: HostAddress,
    pub action: HostAction,
    /// False when the table already satisfied the entry
    pub changed: bool,
}

/// In-memory host table keyed by address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTable {
    rows: Vec<HostEntry>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse host table content
    ///
    /// Comments, blank lines and lines whose first field is not a literal
    /// address are ignored. When an address appears more than once, the
    /// first line wins. Parsed rows get the default priority.
    pub fn parse(content: &str) -> Self {
        let mut table = Self::new();

        for raw in content.lines() {
            let line = raw.split('#').next().unwrap_or("");
            let mut fields = line.split_whitespace();
            let (Some(ip), Some(name)) = (fields.next(), fields.next()) else {
                continue;
            };

            let ip = match HostAddress::new(ip) {
                Ok(ip) => ip,
                Err(err) => {
                    debug!("Skipping host table line '{}': {}", raw, err);
                    continue;
                }
            };

            if table.get(&ip).is_some() {
                debug!("Skipping duplicate host table line for {}", ip);
                continue;
            }

            table
                .rows
                .push(HostEntry::upsert(ip, name).with_aliases(fields));
        }

        table
    }

    pub fn get(&self, ip: &HostAddress) -> Option<&HostEntry> {
        self.rows.iter().find(|row| &row.ip == ip)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Existence guard for a planned entry
    ///
    /// An upsert is needed when the address is missing or its line carries
    /// different names. A remove is needed when the address is present (and,
    /// for a naming remove, the line still carries that name).
    pub fn needs(&self, entry: &HostEntry) -> bool {
        match (entry.action, self.get(&entry.ip)) {
            (HostAction::Upsert, None) => true,
            (HostAction::Upsert, Some(row)) => !row.same_names_as(entry),
            (HostAction::Remove, None) => false,
            (HostAction::Remove, Some(row)) => {
                entry.canonical_name.is_empty() || row.names(&entry.canonical_name)
            }
        }
    }

    /// Apply one planned entry, returning whether the table content changed
    ///
    /// Upserts replace an existing line in place and always adopt the
    /// planned priority.
    pub fn apply(&mut self, entry: &HostEntry) -> bool {
        let needed = self.needs(entry);
        let position = self.rows.iter().position(|row| row.ip == entry.ip);

        match (entry.action, position) {
            (HostAction::Upsert, Some(index)) => self.rows[index] = entry.clone(),
            (HostAction::Upsert, None) => self.rows.push(entry.clone()),
            (HostAction::Remove, Some(index)) if needed => {
                self.rows.remove(index);
            }
            (HostAction::Remove, _) => {}
        }

        needed
    }

    /// Apply planned entries in order
    pub fn reconcile(&mut self, entries: &[HostEntry]) -> Vec<EntryOutcome> {
        entries
            .iter()
            .map(|entry| EntryOutcome {
                ip: entry.ip.clone(),
                action: entry.action,
                changed: self.apply(entry),
            })
            .collect()
    }

    /// Rows in file order: priority, then insertion order
    pub fn sorted_rows(&self) -> Vec<&HostEntry> {
        let mut rows: Vec<&HostEntry> = self.rows.iter().collect();
        rows.sort_by_key(|row| row.priority);
        rows
    }

    /// Render the table, header first, one line per address
    pub fn render(&self) -> String {
        let mut content = String::from(MANAGED_HEADER);
        for row in self.sorted_rows() {
            content.push_str(&row.line());
            content.push('\n');
        }
        content
    }
}
