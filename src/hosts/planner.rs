// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host Table Planner
//!
//! Pure function from resolved identity + platform policy to the ordered
//! list of host table entries that must hold after this run.
//!
//! # Emission order
//!
//! 1. Loopback / primary address rules (one of two exclusive strategies)
//! 2. `255.255.255.255 broadcasthost` on macOS
//! 3. The fixed IPv6 set (collapsed to `::1 localhost` on macOS)
//! 4. Static hosts from configuration
//!
//! When two rules land on the same address the later one wins, except that
//! a static host may not rename an address a built-in rule upserts.

use std::collections::BTreeMap;
use tracing::warn;

use super::entry::{HostAction, HostEntry};
use crate::domain::{HostAddress, PlatformContext, ResolvedIdentity};
use crate::errors::{PlanError, PlanResult};

/// Priority of the fixed IPv6 entries
pub const IPV6_PRIORITY: i32 = 5;

/// Priority of configured static hosts
pub const STATIC_HOST_PRIORITY: i32 = 6;

/// Canonical name of the IPv4 loopback in permanent-IP mode
pub const LOOPBACK_NAME: &str = "localhost.localdomain";

/// Debian's loopback alias for the machine's own name
pub const DEBIAN_SELF_ADDRESS: &str = "127.0.1.1";

pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";

pub const BROADCAST_ADDRESS: &str = "255.255.255.255";

/// Fixed IPv6 rows: (address, canonical name, aliases)
pub const IPV6_HOSTS: [(&str, &str, &[&str]); 5] = [
    (
        "::1",
        "localhost6.localdomain6",
        &["localhost6", "ip6-localhost", "ip6-loopback"],
    ),
    ("fe00::0", "ip6-localnet", &[]),
    ("ff00::0", "ip6-mcastprefix", &[]),
    ("ff02::1", "ip6-allnodes", &[]),
    ("ff02::2", "ip6-allrouters", &[]),
];

/// Host table policy for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTablePolicy {
    /// Map the machine's real address to its FQDN instead of a loopback
    pub permanent_ip: bool,
    /// Extra `ip → hostname` rows
    pub static_hosts: BTreeMap<String, String>,
}

/// Plan the desired host table entries
///
/// # Errors
/// - `InvalidInput` for a static host with an unparsable address or a blank
///   or whitespace-containing name
/// - `ConflictingHostEntry` when a static host renames an address that a
///   built-in rule upserts
pub fn plan(
    identity: &ResolvedIdentity,
    platform: &PlatformContext,
    policy: &HostTablePolicy,
    local_ip: Option<&HostAddress>,
) -> PlanResult<Vec<HostEntry>> {
    let mut builtin = loopback_entries(identity, platform, policy.permanent_ip, local_ip)?;

    if platform.is_mac() {
        builtin.push(HostEntry::upsert(
            HostAddress::new(BROADCAST_ADDRESS)?,
            "broadcasthost",
        ));
    }

    builtin.extend(ipv6_entries(platform)?);

    let builtin = last_writer_wins(builtin);
    let statics = static_entries(&policy.static_hosts)?;
    check_conflicts(&builtin, &statics)?;

    let mut entries = builtin;
    entries.extend(statics);
    Ok(last_writer_wins(entries))
}

/// Exactly one of the two loopback strategies
fn loopback_entries(
    identity: &ResolvedIdentity,
    platform: &PlatformContext,
    permanent_ip: bool,
    local_ip: Option<&HostAddress>,
) -> PlanResult<Vec<HostEntry>> {
    let fqdn = identity.fqdn();
    let short = identity.short_name();
    let mut entries = Vec::new();

    if permanent_ip {
        entries.push(HostEntry::remove(HostAddress::new(DEBIAN_SELF_ADDRESS)?));
        entries.push(
            HostEntry::upsert(HostAddress::new(LOOPBACK_ADDRESS)?, LOOPBACK_NAME)
                .with_aliases(["localhost"]),
        );
        match local_ip {
            Some(ip) => entries.push(HostEntry::upsert(ip.clone(), fqdn).with_aliases([short])),
            None => warn!("Permanent IP requested but no local address is known; skipping its entry"),
        }
        return Ok(entries);
    }

    if let Some(ip) = local_ip {
        entries.push(HostEntry::remove_naming(ip.clone(), fqdn));
    }

    if platform.is_debian_family() {
        entries.push(
            HostEntry::upsert(HostAddress::new(DEBIAN_SELF_ADDRESS)?, fqdn).with_aliases([short]),
        );
    } else {
        entries.push(
            HostEntry::upsert(HostAddress::new(LOOPBACK_ADDRESS)?, fqdn).with_aliases([
                short,
                LOOPBACK_NAME,
                "localhost",
            ]),
        );
    }

    Ok(entries)
}

/// The fixed IPv6 set, collapsed to `::1 localhost` on macOS
fn ipv6_entries(platform: &PlatformContext) -> PlanResult<Vec<HostEntry>> {
    if platform.is_mac() {
        return Ok(vec![
            HostEntry::upsert(HostAddress::new("::1")?, "localhost").with_priority(IPV6_PRIORITY),
        ]);
    }

    IPV6_HOSTS
        .iter()
        .map(|(ip, name, aliases)| -> PlanResult<HostEntry> {
            Ok(HostEntry::upsert(HostAddress::new(ip)?, *name)
                .with_aliases(aliases.iter().copied())
                .with_priority(IPV6_PRIORITY))
        })
        .collect()
}

fn static_entries(static_hosts: &BTreeMap<String, String>) -> PlanResult<Vec<HostEntry>> {
    let mut entries: Vec<HostEntry> = Vec::with_capacity(static_hosts.len());

    for (ip, host) in static_hosts {
        let host = host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(PlanError::InvalidInput(format!(
                "static host name for {} must be a single non-empty name",
                ip
            )));
        }

        let entry = HostEntry::upsert(HostAddress::new(ip)?, host).with_priority(STATIC_HOST_PRIORITY);

        // Two spellings of one address ("fe00::" / "fe00::0") in the map
        if let Some(previous) = entries.iter().find(|e| e.ip == entry.ip) {
            if previous.canonical_name != entry.canonical_name {
                return Err(PlanError::ConflictingHostEntry {
                    ip: entry.ip.to_string(),
                    existing: previous.canonical_name.clone(),
                    incoming: entry.canonical_name.clone(),
                });
            }
        }

        entries.push(entry);
    }

    Ok(entries)
}

fn check_conflicts(builtin: &[HostEntry], statics: &[HostEntry]) -> PlanResult<()> {
    for entry in statics {
        let clash = builtin.iter().find(|b| {
            b.ip == entry.ip && b.action == HostAction::Upsert && b.canonical_name != entry.canonical_name
        });

        if let Some(existing) = clash {
            return Err(PlanError::ConflictingHostEntry {
                ip: entry.ip.to_string(),
                existing: existing.canonical_name.clone(),
                incoming: entry.canonical_name.clone(),
            });
        }
    }
    Ok(())
}

/// Keep only the last entry per address, at the position it was emitted
fn last_writer_wins(entries: Vec<HostEntry>) -> Vec<HostEntry> {
    let mut kept: Vec<HostEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        kept.retain(|k| k.ip != entry.ip);
        kept.push(entry);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{resolve, HostnameSpec, PlatformFamily, ServiceManager};
    use test_case::test_case;

    fn identity() -> ResolvedIdentity {
        resolve(&HostnameSpec::new("web01.example.com", "localdomain")).unwrap()
    }

    fn platform(family: PlatformFamily) -> PlatformContext {
        let distro = match family {
            PlatformFamily::Debian => "debian",
            PlatformFamily::Rhel => "centos",
            PlatformFamily::MacOsX => "mac_os_x",
            PlatformFamily::Other => "arch",
        };
        PlatformContext::new(family, distro, "9", ServiceManager::Systemd)
    }

    fn local() -> HostAddress {
        HostAddress::new("10.1.2.3").unwrap()
    }

    fn find<'a>(entries: &'a [HostEntry], ip: &str) -> Option<&'a HostEntry> {
        let ip = HostAddress::new(ip).unwrap();
        entries.iter().find(|e| e.ip == ip)
    }

    #[test]
    fn test_default_mode_debian() {
        let entries = plan(
            &identity(),
            &platform(PlatformFamily::Debian),
            &HostTablePolicy::default(),
            Some(&local()),
        )
        .unwrap();

        let self_entry = find(&entries, "127.0.1.1").unwrap();
        assert_eq!(self_entry.action, HostAction::Upsert);
        assert_eq!(self_entry.canonical_name, "web01.example.com");
        assert_eq!(self_entry.aliases, vec!["web01"]);

        assert!(find(&entries, "127.0.0.1").is_none());

        let local_entry = find(&entries, "10.1.2.3").unwrap();
        assert_eq!(local_entry.action, HostAction::Remove);
        assert_eq!(local_entry.canonical_name, "web01.example.com");
    }

    #[test_case(PlatformFamily::Rhel ; "rhel")]
    #[test_case(PlatformFamily::Other ; "other")]
    #[test_case(PlatformFamily::MacOsX ; "mac")]
    fn test_default_mode_non_debian(family: PlatformFamily) {
        let entries = plan(&identity(), &platform(family), &HostTablePolicy::default(), None).unwrap();

        let loopback = find(&entries, "127.0.0.1").unwrap();
        assert_eq!(loopback.canonical_name, "web01.example.com");
        assert_eq!(
            loopback.aliases,
            vec!["web01", "localhost.localdomain", "localhost"]
        );
        assert!(find(&entries, "127.0.1.1").is_none());
    }

    #[test_case(PlatformFamily::Debian ; "debian")]
    #[test_case(PlatformFamily::Rhel ; "rhel")]
    fn test_permanent_ip_mode(family: PlatformFamily) {
        let policy = HostTablePolicy {
            permanent_ip: true,
            ..HostTablePolicy::default()
        };
        let entries = plan(&identity(), &platform(family), &policy, Some(&local())).unwrap();

        assert_eq!(entries[0], HostEntry::remove(HostAddress::new("127.0.1.1").unwrap()));

        let loopback = find(&entries, "127.0.0.1").unwrap();
        assert_eq!(loopback.canonical_name, "localhost.localdomain");
        assert_eq!(loopback.aliases, vec!["localhost"]);

        let real = find(&entries, "10.1.2.3").unwrap();
        assert_eq!(real.action, HostAction::Upsert);
        assert_eq!(real.canonical_name, "web01.example.com");
        assert_eq!(real.aliases, vec!["web01"]);
    }

    #[test]
    fn test_permanent_ip_without_local_address() {
        let policy = HostTablePolicy {
            permanent_ip: true,
            ..HostTablePolicy::default()
        };
        let entries = plan(&identity(), &platform(PlatformFamily::Rhel), &policy, None).unwrap();
        assert!(entries.iter().all(|e| e.canonical_name != "web01.example.com"));
    }

    #[test]
    fn test_ipv6_table() {
        let entries = plan(
            &identity(),
            &platform(PlatformFamily::Debian),
            &HostTablePolicy::default(),
            None,
        )
        .unwrap();

        let ipv6: Vec<String> = entries
            .iter()
            .filter(|e| e.ip.is_ipv6())
            .map(HostEntry::line)
            .collect();
        assert_eq!(
            ipv6,
            vec![
                "::1\tlocalhost6.localdomain6 localhost6 ip6-localhost ip6-loopback",
                "fe00::0\tip6-localnet",
                "ff00::0\tip6-mcastprefix",
                "ff02::1\tip6-allnodes",
                "ff02::2\tip6-allrouters",
            ]
        );
        assert!(entries
            .iter()
            .filter(|e| e.ip.is_ipv6())
            .all(|e| e.priority == IPV6_PRIORITY));
    }

    #[test]
    fn test_mac_collapses_ipv6_and_adds_broadcast() {
        let entries = plan(
            &identity(),
            &platform(PlatformFamily::MacOsX),
            &HostTablePolicy::default(),
            None,
        )
        .unwrap();

        let ipv6: Vec<&HostEntry> = entries.iter().filter(|e| e.ip.is_ipv6()).collect();
        assert_eq!(ipv6.len(), 1);
        assert_eq!(ipv6[0].ip.as_str(), "::1");
        assert_eq!(ipv6[0].canonical_name, "localhost");
        assert!(ipv6[0].aliases.is_empty());

        assert_eq!(
            find(&entries, "255.255.255.255").unwrap().canonical_name,
            "broadcasthost"
        );
    }

    #[test]
    fn test_broadcast_only_on_mac() {
        let entries = plan(
            &identity(),
            &platform(PlatformFamily::Rhel),
            &HostTablePolicy::default(),
            None,
        )
        .unwrap();
        assert!(find(&entries, "255.255.255.255").is_none());
    }

    #[test_case(PlatformFamily::Debian ; "debian")]
    #[test_case(PlatformFamily::MacOsX ; "mac")]
    fn test_static_hosts(family: PlatformFamily) {
        let policy = HostTablePolicy {
            static_hosts: BTreeMap::from([("10.0.0.5".to_string(), "db1".to_string())]),
            ..HostTablePolicy::default()
        };
        let entries = plan(&identity(), &platform(family), &policy, None).unwrap();

        let last = entries.last().unwrap();
        assert_eq!(last.ip.as_str(), "10.0.0.5");
        assert_eq!(last.canonical_name, "db1");
        assert_eq!(last.priority, STATIC_HOST_PRIORITY);
        assert!(last.aliases.is_empty());
    }

    #[test]
    fn test_static_host_conflicting_with_ipv6_table() {
        let policy = HostTablePolicy {
            static_hosts: BTreeMap::from([("fe00::".to_string(), "my-localnet".to_string())]),
            ..HostTablePolicy::default()
        };
        let result = plan(&identity(), &platform(PlatformFamily::Debian), &policy, None);
        assert!(matches!(result, Err(PlanError::ConflictingHostEntry { .. })));
    }

    #[test]
    fn test_static_host_overrides_local_remove() {
        let policy = HostTablePolicy {
            static_hosts: BTreeMap::from([("10.1.2.3".to_string(), "app".to_string())]),
            ..HostTablePolicy::default()
        };
        let entries = plan(&identity(), &platform(PlatformFamily::Debian), &policy, Some(&local())).unwrap();

        let matching: Vec<&HostEntry> = entries.iter().filter(|e| e.ip == local()).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].action, HostAction::Upsert);
        assert_eq!(matching[0].canonical_name, "app");
    }

    #[test]
    fn test_invalid_static_hosts() {
        let bad_ip = HostTablePolicy {
            static_hosts: BTreeMap::from([("db.example.com".to_string(), "db1".to_string())]),
            ..HostTablePolicy::default()
        };
        assert!(matches!(
            plan(&identity(), &platform(PlatformFamily::Debian), &bad_ip, None),
            Err(PlanError::InvalidInput(_))
        ));

        let bad_name = HostTablePolicy {
            static_hosts: BTreeMap::from([("10.0.0.7".to_string(), "two names".to_string())]),
            ..HostTablePolicy::default()
        };
        assert!(matches!(
            plan(&identity(), &platform(PlatformFamily::Debian), &bad_name, None),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_same_address_last_writer_wins() {
        let entries = last_writer_wins(vec![
            HostEntry::remove(HostAddress::new("127.0.1.1").unwrap()),
            HostEntry::upsert(HostAddress::new("10.0.0.1").unwrap(), "a"),
            HostEntry::upsert(HostAddress::new("127.0.1.1").unwrap(), "b"),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].canonical_name, "b");
        assert_eq!(entries[1].action, HostAction::Upsert);
    }
}
