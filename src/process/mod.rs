/*!
 * Process Module
 * Supervision of externally spawned worker processes
 */

pub mod atomic_stats;
pub mod guard;
pub mod handle;
pub mod os;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use guard::SupervisedProcess;
pub use handle::ProcessHandle;
pub use os::OsProcess;
pub use registry::ProcessRegistry;
pub use traits::ManagedProcess;
pub use types::{
    ExitStatus, ProcessInfo, ProcessState, RegistryConfig, RegistryStats, ShutdownSummary,
    TerminationOutcome,
};
