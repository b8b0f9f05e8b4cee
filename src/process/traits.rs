/*!
 * Process Traits
 * OS seam between the registry and a spawned child
 */

use super::types::ExitStatus;
use crate::core::types::Pid;
use std::io;

/// An externally spawned process the registry can signal and reap
///
/// Every method must return promptly: the registry calls them while
/// holding the handle's lock and does its own waiting between calls.
pub trait ManagedProcess: Send + 'static {
    /// Native process identifier
    fn id(&self) -> Pid;

    /// Ask the process to exit (SIGTERM on Unix)
    fn signal_graceful(&mut self) -> io::Result<()>;

    /// Force the process to exit (SIGKILL on Unix)
    fn signal_forceful(&mut self) -> io::Result<()>;

    /// Non-blocking exit check; `Some` once the process has been reaped
    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>>;
}
