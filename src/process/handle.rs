/*!
 * Process Handle
 * One supervised process: identity, start time, and termination state
 */

use super::traits::ManagedProcess;
use super::types::{ExitStatus, ProcessInfo, ProcessState};
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::types::Pid;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Handle to a registered process
///
/// Shared between the registry and the spawning handler. Handlers can
/// observe it but cannot signal through it; all termination goes through
/// [`crate::ProcessRegistry`].
pub struct ProcessHandle {
    pid: Pid,
    started_at: Instant,
    state: AtomicU8,
    /// Flips to `true` once the state is terminal
    settled: watch::Sender<bool>,
    // Held only for one non-blocking syscall at a time
    process: Mutex<Box<dyn ManagedProcess>>,
}

impl ProcessHandle {
    pub(crate) fn new(pid: Pid, process: Box<dyn ManagedProcess>, started_at: Instant) -> Self {
        Self {
            pid,
            started_at,
            state: AtomicU8::new(ProcessState::Running.as_u8()),
            settled: watch::channel(false).0,
            process: Mutex::new(process),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        ProcessState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Resolve once the handle reaches `Terminated` or `ReapFailed`
    pub async fn settled(&self) {
        let mut settled = self.settled.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = settled.wait_for(|done| *done).await;
    }

    pub fn uptime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn info(&self, now: Instant) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            state: self.state(),
            uptime: self.uptime(now),
        }
    }

    /// Atomically move `from -> to`
    ///
    /// Fails if the edge is not part of the state machine or another caller
    /// moved the handle first. Exactly one caller wins each edge.
    pub(crate) fn transition(&self, from: ProcessState, to: ProcessState) -> ProcessResult<()> {
        if !from.can_transition_to(to) {
            return Err(ProcessError::InvalidStateTransition {
                pid: self.pid,
                from,
                to,
            });
        }
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map_err(|actual| ProcessError::InvalidStateTransition {
                pid: self.pid,
                from: ProcessState::from_u8(actual),
                to,
            })?;

        if to.is_terminal() {
            self.settled.send_replace(true);
        }
        Ok(())
    }

    pub(crate) fn signal_graceful(&self) -> io::Result<()> {
        self.process.lock().signal_graceful()
    }

    pub(crate) fn signal_forceful(&self) -> io::Result<()> {
        self.process.lock().signal_forceful()
    }

    pub(crate) fn try_reap(&self) -> io::Result<Option<ExitStatus>> {
        self.process.lock().try_reap()
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("state", &self.state())
            .field("started_at", &self.started_at)
            .finish()
    }
}
