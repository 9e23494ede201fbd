//! Error types for host identity planning and execution

use thiserror::Error;

/// Errors raised by the pure planning stage
///
/// These are local-computation errors: they are returned synchronously and
/// never retried. A planning pass either yields a complete plan or one of
/// these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Empty or malformed hostname input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two rules target the same address with different canonical names
    #[error("Conflicting host entry for {ip}: '{existing}' vs '{incoming}'")]
    ConflictingHostEntry {
        ip: String,
        existing: String,
        incoming: String,
    },

    /// The emitted action graph is not acyclic
    #[error("Dependency cycle between actions: {0}")]
    DependencyCycle(String),

    /// An edge names an action that is not part of the plan
    #[error("Action {action} depends on unknown action {dependency}")]
    UnknownDependency { action: String, dependency: String },

    /// Two actions share one identifier
    #[error("Action {0} emitted twice")]
    DuplicateAction(String),
}

/// Result type for planning operations
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that can occur while observing or changing the local machine
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Planning failed before anything was executed
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External command could not be spawned or exited non-zero
    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for infrastructure operations
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

impl From<serde_json::Error> for InfrastructureError {
    fn from(err: serde_json::Error) -> Self {
        InfrastructureError::Serialization(err.to_string())
    }
}
