// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Identity Planning
//!
//! Names are generated from DNS-safe labels in mixed case, so every input
//! resolves and the properties describe the planner rather than validation.

use cim_host_identity::convergence::{
    evaluate, ConvergencePlan, GuardDecision, Observed, ObservedState, Operation, PlanInput,
};
use cim_host_identity::domain::{
    resolve, HostAddress, HostnameSpec, PlatformContext, PlatformFamily, ServiceManager,
};
use cim_host_identity::hosts::{self, HostAction, HostEntry, HostTablePolicy};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn label() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,9}"
}

/// Raw hostname with at least two labels
fn qualified_name() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 2..5).prop_map(|labels| labels.join("."))
}

fn private_ip() -> impl Strategy<Value = HostAddress> {
    (0u8..=255, 0u8..=255, 1u8..=254).prop_map(|(b, c, d)| {
        HostAddress::new(format!("10.{}.{}.{}", b, c, d)).expect("generated address parses")
    })
}

fn platform() -> impl Strategy<Value = PlatformContext> {
    prop_oneof![
        Just(PlatformContext::new(PlatformFamily::Debian, "debian", "11", ServiceManager::Systemd)),
        Just(PlatformContext::new(PlatformFamily::Debian, "ubuntu", "14.04", ServiceManager::Upstart)),
        Just(PlatformContext::new(PlatformFamily::Rhel, "centos", "6.10", ServiceManager::Init)),
        Just(PlatformContext::new(PlatformFamily::Rhel, "centos", "8.4", ServiceManager::Systemd)),
        Just(PlatformContext::new(PlatformFamily::MacOsX, "mac_os_x", "12.6", ServiceManager::Launchd)),
    ]
}

fn upserts<'a>(entries: &'a [HostEntry], ip: &'a str) -> impl Iterator<Item = &'a HostEntry> {
    entries
        .iter()
        .filter(move |entry| entry.action == HostAction::Upsert && entry.ip.as_str() == ip)
}

// ============================================================================
// Resolution
// ============================================================================

proptest! {
    #[test]
    fn prop_fqdn_is_lowercased_raw_name(raw in qualified_name()) {
        let identity = resolve(&HostnameSpec::new(raw.clone(), "localdomain")).unwrap();
        prop_assert_eq!(identity.fqdn(), raw.to_lowercase());
    }

    #[test]
    fn prop_fqdn_joins_short_name_and_domain(raw in qualified_name(), fallback in label()) {
        let identity = resolve(&HostnameSpec::new(raw, fallback)).unwrap();
        prop_assert!(identity.fqdn().contains('.'));
        let expected_prefix = format!("{}.", identity.short_name());
        prop_assert!(identity.fqdn().starts_with(&expected_prefix));
        prop_assert_eq!(&identity.fqdn()[expected_prefix.len()..], identity.domain());
    }

    #[test]
    fn prop_single_label_uses_fallback(short in label(), fallback in qualified_name()) {
        let identity = resolve(&HostnameSpec::new(short.clone(), fallback.clone())).unwrap();
        prop_assert_eq!(identity.short_name(), short.to_lowercase());
        prop_assert_eq!(identity.domain(), fallback.to_lowercase());
    }

    #[test]
    fn prop_resolution_is_idempotent(raw in qualified_name()) {
        let first = resolve(&HostnameSpec::new(raw, "localdomain")).unwrap();
        let second = resolve(&first.to_spec("localdomain")).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ============================================================================
// Host table planning
// ============================================================================

proptest! {
    #[test]
    fn prop_permanent_ip_never_uses_debian_self_address(
        raw in qualified_name(),
        local_ip in private_ip(),
        platform in platform(),
    ) {
        let identity = resolve(&HostnameSpec::new(raw, "localdomain")).unwrap();
        let policy = HostTablePolicy { permanent_ip: true, ..HostTablePolicy::default() };
        let entries = hosts::plan(&identity, &platform, &policy, Some(&local_ip)).unwrap();

        prop_assert_eq!(upserts(&entries, "127.0.1.1").count(), 0);
        let own = upserts(&entries, local_ip.as_str()).next();
        prop_assert!(own.map(|entry| entry.canonical_name == identity.fqdn()).unwrap_or(false));
    }

    #[test]
    fn prop_debian_default_maps_fqdn_to_self_address(
        raw in qualified_name(),
        local_ip in private_ip(),
    ) {
        let debian = PlatformContext::new(PlatformFamily::Debian, "debian", "11", ServiceManager::Systemd);
        let identity = resolve(&HostnameSpec::new(raw, "localdomain")).unwrap();
        let entries = hosts::plan(&identity, &debian, &HostTablePolicy::default(), Some(&local_ip)).unwrap();

        let own: Vec<_> = upserts(&entries, "127.0.1.1").collect();
        prop_assert_eq!(own.len(), 1);
        prop_assert_eq!(&own[0].canonical_name, identity.fqdn());
        prop_assert!(!upserts(&entries, "127.0.0.1").any(|entry| entry.names(identity.fqdn())));
    }

    #[test]
    fn prop_mac_keeps_single_ipv6_row(raw in qualified_name()) {
        let mac = PlatformContext::new(PlatformFamily::MacOsX, "mac_os_x", "12.6", ServiceManager::Launchd);
        let identity = resolve(&HostnameSpec::new(raw, "localdomain")).unwrap();
        let entries = hosts::plan(&identity, &mac, &HostTablePolicy::default(), None).unwrap();

        let ipv6: Vec<_> = entries.iter().filter(|entry| entry.ip.is_ipv6()).collect();
        prop_assert_eq!(ipv6.len(), 1);
        prop_assert_eq!(ipv6[0].ip.as_str(), "::1");
    }
}

// ============================================================================
// Guards and plans
// ============================================================================

proptest! {
    #[test]
    fn prop_kernel_guard_follows_observed_name(raw in qualified_name(), current in qualified_name()) {
        let identity = resolve(&HostnameSpec::new(raw, "localdomain")).unwrap();
        let debian = PlatformContext::new(PlatformFamily::Debian, "debian", "11", ServiceManager::Systemd);
        let operation = Operation::SetKernelHostname { fqdn: identity.fqdn().to_string() };

        let converged = ObservedState {
            kernel_fqdn: Observed::Value(identity.fqdn().to_string()),
            ..ObservedState::default()
        };
        prop_assert!(!evaluate(&operation, &converged, &debian).applies());

        let current = current.to_lowercase();
        prop_assume!(current != identity.fqdn());
        let drifted = ObservedState {
            kernel_fqdn: Observed::Value(current),
            ..ObservedState::default()
        };
        prop_assert_eq!(evaluate(&operation, &drifted, &debian), GuardDecision::Apply);
    }

    #[test]
    fn prop_plan_orders_every_action(
        raw in qualified_name(),
        platform in platform(),
        permanent_ip in any::<bool>(),
        local_ip in private_ip(),
    ) {
        let policy = HostTablePolicy { permanent_ip, ..HostTablePolicy::default() };
        let input = PlanInput::new(HostnameSpec::new(raw, "localdomain"), platform)
            .with_policy(policy)
            .with_local_ip(local_ip);
        let plan = ConvergencePlan::build(&input, &ObservedState::default()).unwrap();

        for (position, action) in plan.actions.iter().enumerate() {
            for dependency in &action.depends_on {
                let before = plan.actions[..position].iter().any(|a| a.id == dependency.on);
                prop_assert!(before, "{} is ordered before its dependency {}", action.id, dependency.on);
            }
        }
        prop_assert!(plan.host_table_content.ends_with('\n'));
    }
}
