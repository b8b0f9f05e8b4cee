/*!
 * Process Types
 * Handle states, outcomes, configuration, and statistics
 */

use crate::core::errors::ConfigError;
use crate::core::limits::{
    DEFAULT_GRACE_PERIOD, DEFAULT_MAX_PARALLEL_TERMINATIONS, DEFAULT_POLL_INTERVAL,
    DEFAULT_PROCESS_WAIT_TIMEOUT, MAX_POLL_INTERVAL, MAX_TERMINATION_WAIT,
};
use crate::core::serde::{duration_millis, duration_secs, is_empty_vec};
use crate::core::types::Pid;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Termination state machine of one supervised process
///
/// ```text
/// Running ──► SignalSent ──► Terminated
///    │             └───────► ReapFailed
///    └───────────────────────► Terminated   (normal exit observed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProcessState {
    /// Registered and presumed alive
    Running = 0,
    /// Termination claimed; graceful and possibly forceful signals in flight
    SignalSent = 1,
    /// Exit confirmed and reaped
    Terminated = 2,
    /// Still alive after SIGKILL and the full wait timeout
    ReapFailed = 3,
}

impl ProcessState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Terminated | ProcessState::ReapFailed)
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Running, SignalSent)
                | (Running, Terminated)
                | (SignalSent, Terminated)
                | (SignalSent, ReapFailed)
        )
    }

    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ProcessState::Running,
            1 => ProcessState::SignalSent,
            2 => ProcessState::Terminated,
            3 => ProcessState::ReapFailed,
            other => {
                // Only `as_u8` values are ever stored
                tracing::error!(value = other, "Corrupt process state byte, treating as reap failure");
                debug_assert!(other <= 3, "corrupt process state byte {other}");
                ProcessState::ReapFailed
            }
        }
    }
}

/// How a supervised process exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitStatus {
    /// Normal exit with a code
    Code(i32),
    /// Killed by a signal
    Signaled(i32),
    /// Gone, but the status was collected elsewhere
    Unknown,
}

impl ExitStatus {
    pub fn success(self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signaled(signal);
            }
        }
        ExitStatus::Unknown
    }
}

/// Successful results of a terminate call
///
/// Reap failure is reported as [`crate::ProcessError::ReapFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// This call drove the process to `Terminated`
    Terminated,
    /// Another caller owns the in-flight termination
    AlreadyTerminating,
    /// Identifier not tracked (never registered or already cleaned up)
    NotTracked,
}

/// Aggregate result of a shutdown sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownSummary {
    pub terminated: usize,
    pub failed: usize,
    /// Handles that exited or were unregistered before the sweep reached them
    pub skipped: usize,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub failed_pids: Vec<Pid>,
}

impl ShutdownSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Registry configuration, fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RegistryConfig {
    /// Wait after SIGTERM before escalating
    #[serde(with = "duration_secs")]
    pub grace_period: Duration,
    /// Wait after SIGKILL before giving up (`DEFAULT_PROCESS_WAIT_TIMEOUT`)
    #[serde(with = "duration_secs")]
    pub wait_timeout: Duration,
    /// Initial interval between reap attempts
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
    /// Concurrent terminations during a shutdown sweep
    pub max_parallel_terminations: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            wait_timeout: DEFAULT_PROCESS_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_parallel_terminations: DEFAULT_MAX_PARALLEL_TERMINATIONS,
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn with_max_parallel_terminations(mut self, max: usize) -> Self {
        self.max_parallel_terminations = max;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::invalid("poll_interval", "must be non-zero"));
        }
        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(ConfigError::invalid(
                "poll_interval",
                format!("must not exceed {}ms", MAX_POLL_INTERVAL.as_millis()),
            ));
        }
        if self.grace_period > MAX_TERMINATION_WAIT {
            return Err(ConfigError::invalid(
                "grace_period",
                format!("must not exceed {}s", MAX_TERMINATION_WAIT.as_secs()),
            ));
        }
        if self.wait_timeout > MAX_TERMINATION_WAIT {
            return Err(ConfigError::invalid(
                "wait_timeout",
                format!("must not exceed {}s", MAX_TERMINATION_WAIT.as_secs()),
            ));
        }
        if self.max_parallel_terminations == 0 {
            return Err(ConfigError::invalid(
                "max_parallel_terminations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of one tracked process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub state: ProcessState,
    #[serde(with = "duration_millis")]
    pub uptime: Duration,
}

/// Snapshot of registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub registered: u64,
    pub unregistered: u64,
    pub exited: u64,
    pub terminated: u64,
    pub reap_failed: u64,
    pub signals_sent: u64,
    pub active: usize,
}
