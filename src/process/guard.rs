/*!
 * Supervised Process Guard
 *
 * RAII guard for a registered child. A handler that is cancelled or
 * times out drops the guard, and the registry terminates the child in
 * the background instead of leaking it.
 *
 * # Example
 *
 * ```ignore
 * let child = tokio::process::Command::new("ffmpeg").args(args).spawn()?;
 * let guard = registry.supervise(child)?;
 *
 * // Future cancelled here -> guard dropped -> SIGTERM/SIGKILL in background
 * let status = guard.wait(timeout).await?;
 * ```
 */

use super::handle::ProcessHandle;
use super::registry::ProcessRegistry;
use super::types::{ExitStatus, ProcessState, TerminationOutcome};
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::types::Pid;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Guard returned by [`ProcessRegistry::supervise`]
pub struct SupervisedProcess {
    registry: ProcessRegistry,
    handle: Arc<ProcessHandle>,
    released: bool,
}

impl SupervisedProcess {
    pub(crate) fn new(registry: ProcessRegistry, handle: Arc<ProcessHandle>) -> Self {
        Self {
            registry,
            handle,
            released: false,
        }
    }

    pub fn pid(&self) -> Pid {
        self.handle.pid()
    }

    pub fn handle(&self) -> &Arc<ProcessHandle> {
        &self.handle
    }

    pub fn state(&self) -> ProcessState {
        self.handle.state()
    }

    /// Wait for normal completion
    ///
    /// On timeout the guard stays armed: dropping it afterwards terminates
    /// the process. Fails with `NotFound` once this registration was
    /// unregistered, even if its PID has been reused since.
    pub async fn wait(&mut self, timeout: Duration) -> ProcessResult<ExitStatus> {
        if !self.registry.tracks(&self.handle) {
            return Err(ProcessError::NotFound(self.pid()));
        }
        let status = self.registry.wait_handle(&self.handle, timeout).await?;
        self.released = true;
        Ok(status)
    }

    /// Terminate now with the given grace period
    pub async fn terminate(mut self, grace: Duration) -> ProcessResult<TerminationOutcome> {
        self.released = true;
        self.registry
            .terminate_handle(Arc::clone(&self.handle), grace)
            .await
    }

    /// Disarm the guard; the process stays tracked by the registry
    pub fn release(mut self) -> Arc<ProcessHandle> {
        self.released = true;
        Arc::clone(&self.handle)
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        if self.released
            || self.handle.state() != ProcessState::Running
            || !self.registry.tracks(&self.handle)
        {
            return;
        }

        let pid = self.handle.pid();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(pid = pid, "Supervised process dropped while running, terminating");
                let registry = self.registry.clone();
                let handle = Arc::clone(&self.handle);
                runtime.spawn(async move {
                    let grace = registry.config().grace_period;
                    // Failures are already logged by the registry
                    let _ = registry.terminate_handle(handle, grace).await;
                });
            }
            Err(_) => warn!(
                pid = pid,
                "Supervised process dropped outside a runtime; left for the shutdown sweep"
            ),
        }
    }
}
