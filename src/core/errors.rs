/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use crate::process::types::ProcessState;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process registry errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("Process {0} is already registered")]
    #[diagnostic(
        code(process::duplicate),
        help("Each spawned process must be registered exactly once. This is a caller bug.")
    )]
    DuplicateProcess(Pid),

    #[error("Invalid process id {0}")]
    #[diagnostic(
        code(process::invalid_pid),
        help("PID 0 addresses the whole process group. Register a child only while its PID is known.")
    )]
    InvalidPid(Pid),

    #[error("Process {0} not found")]
    #[diagnostic(
        code(process::not_found),
        help("The process may have exited and been unregistered already.")
    )]
    NotFound(Pid),

    #[error("Process {pid} did not exit after SIGKILL; handle dropped from tracking")]
    #[diagnostic(
        code(process::reap_failed),
        help("The OS process may be orphaned (uninterruptible I/O?). Investigate the PID manually.")
    )]
    ReapFailed { pid: Pid },

    #[error("Process {pid} still running after {waited_ms}ms")]
    #[diagnostic(
        code(process::timeout),
        help("The process is still tracked. Terminate it or wait again.")
    )]
    Timeout { pid: Pid, waited_ms: u64 },

    #[error("Failed to signal process {pid}: {reason}")]
    #[diagnostic(code(process::signal_failed))]
    Signal { pid: Pid, reason: String },

    #[error("Invalid state transition for process {pid}: {from:?} -> {to:?}")]
    #[diagnostic(code(process::invalid_state))]
    InvalidStateTransition {
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
    },
}

/// Configuration errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(config::invalid))]
    Invalid { field: String, reason: String },

    #[error("Failed to parse {source_name}: {reason}")]
    #[diagnostic(
        code(config::parse),
        help("Check the environment variable or configuration file for typos.")
    )]
    Parse { source_name: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Facade lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum GovernanceError {
    #[error("Resource governance already installed")]
    #[diagnostic(
        code(governance::already_installed),
        help("install() runs once at service start; tests should build independent instances.")
    )]
    AlreadyInstalled,

    #[error("Resource governance not installed")]
    #[diagnostic(
        code(governance::not_installed),
        help("Call install() during service initialization, before spawning handlers.")
    )]
    NotInstalled,

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Process registry result type
pub type ProcessResult<T> = Result<T, ProcessError>;
