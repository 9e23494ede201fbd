// Copyright (c) 2025 - Cowboy AI, Inc.
//! External Command Execution
//!
//! Every OS-level command the dispatcher and the host info reader issue goes
//! through [`CommandRunner`], so both can be driven by a scripted runner in
//! tests.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::domain::{ServiceCommand, ServiceManager, ServiceSpec};
use crate::errors::{InfrastructureError, InfrastructureResult};

/// Maximum time a single command may run before it is abandoned
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Trimmed stdout
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Turn a non-zero exit into `CommandFailed`
    pub fn check(self, command: &str) -> InfrastructureResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = match (self.status, self.stderr.trim()) {
            (Some(code), "") => format!("exit status {}", code),
            (Some(code), stderr) => format!("exit status {}: {}", code, stderr),
            (None, _) => "terminated by signal".to_string(),
        };
        Err(InfrastructureError::CommandFailed {
            command: command.to_string(),
            message,
        })
    }
}

/// A program with its arguments, passed without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion
    ///
    /// A non-zero exit is not an error here; only failing to start or to
    /// finish the process is.
    async fn run(&self, invocation: &Invocation) -> InfrastructureResult<CommandOutput>;

    /// Run and require a zero exit status
    async fn run_checked(&self, invocation: &Invocation) -> InfrastructureResult<CommandOutput> {
        self.run(invocation).await?.check(&invocation.command_line())
    }

    /// Whether `tool` is on the PATH (`bash -c 'type -P <tool>'`)
    async fn tool_exists(&self, tool: &str) -> InfrastructureResult<bool> {
        let probe = Invocation::new("bash", ["-c".to_string(), format!("type -P {}", tool)]);
        Ok(self.run(&probe).await?.is_success())
    }
}

/// Runs commands on the local machine through `tokio::process`
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, invocation: &Invocation) -> InfrastructureResult<CommandOutput> {
        let command_line = invocation.command_line();
        debug!("Running `{}`", command_line);

        let mut command = tokio::process::Command::new(&invocation.program);
        command.args(&invocation.args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(InfrastructureError::CommandFailed {
                    command: command_line,
                    message: err.to_string(),
                })
            }
            Err(_) => {
                return Err(InfrastructureError::CommandFailed {
                    command: command_line,
                    message: format!("timed out after {:?}", self.timeout),
                })
            }
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Commands that perform `service.command`, tried in order until one succeeds
///
/// Upstart jobs that are not running cannot be restarted, so a restart
/// falls back to a start. Init scripts fall back to the `service` wrapper.
pub fn service_invocations(service: &ServiceSpec) -> Vec<Invocation> {
    let verb = match service.command {
        ServiceCommand::Start => "start",
        ServiceCommand::Restart => "restart",
    };
    let name = service.name.as_str();

    match service.provider {
        ServiceManager::Init => vec![
            Invocation::new(format!("/etc/init.d/{}", name), [verb]),
            Invocation::new("service", [name, verb]),
        ],
        ServiceManager::Upstart => match service.command {
            ServiceCommand::Restart => vec![
                Invocation::new("restart", [name]),
                Invocation::new("start", [name]),
            ],
            ServiceCommand::Start => vec![Invocation::new("start", [name])],
        },
        ServiceManager::Systemd => vec![Invocation::new("systemctl", [verb, name])],
        ServiceManager::Launchd => match service.command {
            ServiceCommand::Restart => vec![Invocation::new(
                "launchctl",
                ["kickstart".to_string(), "-k".to_string(), format!("system/{}", name)],
            )],
            ServiceCommand::Start => vec![Invocation::new("launchctl", ["start", name])],
        },
        ServiceManager::None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServiceSupports;
    use test_case::test_case;

    fn service(provider: ServiceManager, command: ServiceCommand) -> ServiceSpec {
        ServiceSpec {
            name: "hostname".to_string(),
            supports: ServiceSupports::default(),
            provider,
            command,
        }
    }

    #[test_case(ServiceManager::Init, ServiceCommand::Start, &["/etc/init.d/hostname start", "service hostname start"] ; "init start")]
    #[test_case(ServiceManager::Upstart, ServiceCommand::Restart, &["restart hostname", "start hostname"] ; "upstart restart falls back")]
    #[test_case(ServiceManager::Systemd, ServiceCommand::Restart, &["systemctl restart hostname"] ; "systemd")]
    #[test_case(ServiceManager::None, ServiceCommand::Restart, &[] ; "no manager")]
    fn test_service_invocations(provider: ServiceManager, command: ServiceCommand, expected: &[&str]) {
        let lines: Vec<String> = service_invocations(&service(provider, command))
            .iter()
            .map(Invocation::command_line)
            .collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_check_reports_stderr() {
        let err = CommandOutput::failure(1, "hostname: you must be root\n")
            .check("hostname web01.example.com")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Command `hostname web01.example.com` failed: exit status 1: hostname: you must be root"
        );
        assert!(CommandOutput::success("ok").check("true").is_ok());
    }

    #[tokio::test]
    async fn test_system_runner_reports_missing_program() {
        let runner = SystemCommandRunner::new();
        let result = runner
            .run(&Invocation::new("definitely-not-a-real-program-7f3a", Vec::<String>::new()))
            .await;
        assert!(matches!(result, Err(InfrastructureError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn test_system_runner_enforces_timeout() {
        let runner = SystemCommandRunner::new().with_timeout(Duration::from_millis(100));
        let result = runner.run(&Invocation::new("sleep", ["5"])).await;
        match result {
            Err(InfrastructureError::CommandFailed { command, message }) => {
                assert_eq!(command, "sleep 5");
                assert_eq!(message, "timed out after 100ms");
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
