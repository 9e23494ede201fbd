// Copyright (c) 2025 - Cowboy AI, Inc.
//! Action Dependency Graph
//!
//! Validates the edges emitted with a plan and orders actions so every
//! prerequisite precedes its dependents. Among actions that are ready at the
//! same time, emission order is kept, so an already-consistent plan comes
//! back unchanged.

use std::collections::{BTreeMap, BTreeSet};

use super::action::{ActionId, ConvergenceAction};
use crate::errors::{PlanError, PlanResult};

/// Order `actions` topologically
///
/// # Errors
/// - `DuplicateAction` when two actions share an identifier
/// - `UnknownDependency` when an edge names an action not in the plan
/// - `DependencyCycle` when the edges form a cycle
pub fn topological_order(actions: Vec<ConvergenceAction>) -> PlanResult<Vec<ConvergenceAction>> {
    let index: BTreeMap<&ActionId, usize> = actions
        .iter()
        .enumerate()
        .map(|(position, action)| (&action.id, position))
        .collect();

    if index.len() != actions.len() {
        let mut seen = BTreeSet::new();
        let duplicate = actions
            .iter()
            .find(|action| !seen.insert(&action.id))
            .map(|action| action.id.to_string())
            .unwrap_or_default();
        return Err(PlanError::DuplicateAction(duplicate));
    }

    let mut in_degree = vec![0_usize; actions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); actions.len()];

    for (position, action) in actions.iter().enumerate() {
        for dependency in &action.depends_on {
            let Some(&prerequisite) = index.get(&dependency.on) else {
                return Err(PlanError::UnknownDependency {
                    action: action.id.to_string(),
                    dependency: dependency.on.to_string(),
                });
            };
            in_degree[position] += 1;
            dependents[prerequisite].push(position);
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(position, _)| position)
        .collect();

    let mut order = Vec::with_capacity(actions.len());
    while let Some(position) = ready.pop_first() {
        order.push(position);
        for &dependent in &dependents[position] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != actions.len() {
        let stuck: Vec<String> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(position, _)| actions[position].id.to_string())
            .collect();
        return Err(PlanError::DependencyCycle(stuck.join(" -> ")));
    }

    let mut slots: Vec<Option<ConvergenceAction>> = actions.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::action::{Activation, EdgeKind, Operation};
    use crate::convergence::guard::GuardDecision;

    fn action(operation: Operation) -> ConvergenceAction {
        ConvergenceAction::new(operation, Activation::Standalone, GuardDecision::Apply)
    }

    fn hostname_file() -> ConvergenceAction {
        action(Operation::WriteHostnameFile {
            content: "a.b\n".to_string(),
        })
    }

    fn domainname() -> ConvergenceAction {
        action(Operation::RunDomainname {
            domain: "b".to_string(),
        })
    }

    fn kernel() -> ConvergenceAction {
        action(Operation::SetKernelHostname {
            fqdn: "a.b".to_string(),
        })
    }

    #[test]
    fn test_consistent_order_is_kept() {
        let file = hostname_file();
        let mut dn = domainname();
        dn.depends(&file.id, EdgeKind::Triggers);
        let ordered = topological_order(vec![file, dn, kernel()]).unwrap();

        let ids: Vec<&str> = ordered.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["write_hostname_file", "run_domainname", "set_kernel_hostname"]);
    }

    #[test]
    fn test_prerequisite_moves_ahead() {
        let file = hostname_file();
        let mut dn = domainname();
        dn.depends(&file.id, EdgeKind::Triggers);
        let ordered = topological_order(vec![dn, file]).unwrap();
        assert_eq!(ordered[0].id.as_str(), "write_hostname_file");
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut file = hostname_file();
        let mut dn = domainname();
        dn.depends(&file.id, EdgeKind::Triggers);
        file.depends(&dn.id, EdgeKind::After);

        let result = topological_order(vec![file, dn, kernel()]);
        match result {
            Err(PlanError::DependencyCycle(members)) => {
                assert!(members.contains("write_hostname_file"));
                assert!(members.contains("run_domainname"));
                assert!(!members.contains("set_kernel_hostname"));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dependency() {
        let mut dn = domainname();
        dn.depends(&hostname_file().id, EdgeKind::Triggers);
        assert!(matches!(
            topological_order(vec![dn]),
            Err(PlanError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_duplicate_action_is_rejected() {
        assert!(matches!(
            topological_order(vec![kernel(), kernel()]),
            Err(PlanError::DuplicateAction(_))
        ));
    }
}
