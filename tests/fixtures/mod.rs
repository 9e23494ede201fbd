// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-host-identity
//!
//! Deterministic platforms, specs and machine snapshots, plus a scripted
//! command runner that answers from a table instead of spawning processes.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cim_host_identity::convergence::{Observed, ObservedState};
use cim_host_identity::dispatch::command::{CommandOutput, CommandRunner, Invocation};
use cim_host_identity::domain::{
    HostAddress, HostnameSpec, PlatformContext, PlatformFamily, ServiceManager,
};
use cim_host_identity::InfrastructureResult;

pub const FQDN: &str = "web01.example.com";
pub const LOCAL_IP: &str = "10.0.0.4";

pub fn debian() -> PlatformContext {
    PlatformContext::new(PlatformFamily::Debian, "debian", "11", ServiceManager::Systemd)
}

pub fn ubuntu() -> PlatformContext {
    PlatformContext::new(PlatformFamily::Debian, "ubuntu", "14.04", ServiceManager::Upstart)
}

pub fn centos(version: &str) -> PlatformContext {
    PlatformContext::new(PlatformFamily::Rhel, "centos", version, ServiceManager::Init)
}

pub fn mac() -> PlatformContext {
    PlatformContext::new(PlatformFamily::MacOsX, "mac_os_x", "12.6", ServiceManager::Launchd)
}

pub fn web01_spec() -> HostnameSpec {
    HostnameSpec::new(FQDN, HostnameSpec::DEFAULT_FALLBACK_DOMAIN)
}

pub fn local_ip() -> HostAddress {
    HostAddress::new(LOCAL_IP).expect("Invalid address in test fixture")
}

/// A freshly installed machine: names unset, every tool present
pub fn fresh_machine() -> ObservedState {
    let mut observed = ObservedState {
        kernel_fqdn: Observed::Value("localhost".to_string()),
        hostname_file: Observed::Value(Some("localhost\n".to_string())),
        host_table: Observed::Value("127.0.0.1\tlocalhost\n".to_string()),
        network_config_hostname: Observed::Value(None),
        local_ip: Some(local_ip()),
        ..ObservedState::default()
    };
    observed.tools.hostnamectl = Observed::Value(true);
    observed.tools.domainname = Observed::Value(true);
    observed.tools.rs_tag = Observed::Value(false);
    observed
}

/// Command runner answering from a script and recording every call
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<HashMap<String, CommandOutput>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command_line` with `output`; unscripted commands succeed silently
    pub fn respond(self, command_line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .expect("responses lock poisoned")
            .insert(command_line.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn was_called(&self, command_line: &str) -> bool {
        self.calls().iter().any(|call| call == command_line)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> InfrastructureResult<CommandOutput> {
        let line = invocation.command_line();
        self.calls.lock().expect("calls lock poisoned").push(line.clone());
        let response = self
            .responses
            .lock()
            .expect("responses lock poisoned")
            .get(&line)
            .cloned();
        Ok(response.unwrap_or_else(|| CommandOutput::success("")))
    }
}
