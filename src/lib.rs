/*!
 * Resource Governor Library
 * Rate limiting and child-process supervision for long-running services
 */

pub mod core;
pub mod governance;
pub mod limiter;
pub mod monitoring;
pub mod process;

// Re-exports
pub use crate::core::errors::{ConfigError, GovernanceError, ProcessError, ProcessResult};
pub use crate::core::time::{Clock, ManualClock, MonotonicClock};
pub use crate::core::types::Pid;
pub use governance::{governance, install, GovernanceConfig, ResourceGovernance};
pub use limiter::{AdmissionControl, LimiterStats, RateLimitConfig, RateLimited, RateLimiter};
pub use monitoring::{init_tracing, OperationSpan};
pub use process::{
    ExitStatus, ManagedProcess, OsProcess, ProcessHandle, ProcessInfo, ProcessRegistry,
    ProcessState, RegistryConfig, RegistryStats, ShutdownSummary, SupervisedProcess,
    TerminationOutcome,
};
