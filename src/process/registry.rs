/*!
 * Process Registry
 *
 * Tracks live child processes and owns their termination.
 *
 * # Guarantees
 *
 * - A PID is tracked at most once; duplicates are rejected atomically
 * - Termination is claimed with a CAS on the handle state, so concurrent
 *   callers never double-signal or double-reap
 * - Handles leave the map only after exit is confirmed, or after the full
 *   SIGTERM/SIGKILL escalation has failed (so memory stays bounded)
 * - Signalling and waiting happen outside every map lock
 */

use super::atomic_stats::AtomicRegistryStats;
use super::guard::SupervisedProcess;
use super::handle::ProcessHandle;
use super::os::OsProcess;
use super::traits::ManagedProcess;
use super::types::{
    ExitStatus, ProcessInfo, ProcessState, RegistryConfig, RegistryStats, ShutdownSummary,
    TerminationOutcome,
};
use crate::core::errors::{ConfigError, ProcessError, ProcessResult};
use crate::core::limits::MAX_POLL_INTERVAL;
use crate::core::time::{system_clock, Clock};
use crate::core::types::Pid;
use crate::monitoring::OperationSpan;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Concurrency-safe registry of supervised processes
///
/// Cheap to clone; clones share the same tracked set.
#[derive(Clone)]
pub struct ProcessRegistry {
    processes: Arc<DashMap<Pid, Arc<ProcessHandle>>>,
    config: Arc<RegistryConfig>,
    clock: Arc<dyn Clock>,
    stats: Arc<AtomicRegistryStats>,
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("config", &self.config)
            .field("tracked", &self.processes.len())
            .finish()
    }
}

impl ProcessRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: RegistryConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            grace_ms = config.grace_period.as_millis() as u64,
            wait_timeout_ms = config.wait_timeout.as_millis() as u64,
            max_parallel = config.max_parallel_terminations,
            "Process registry initialized"
        );
        Ok(Self {
            processes: Arc::new(DashMap::new()),
            config: Arc::new(config),
            clock,
            stats: Arc::new(AtomicRegistryStats::new()),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start tracking a freshly spawned process
    ///
    /// PID 0 is rejected: it names the caller's process group, and a
    /// `tokio` child reports it once already reaped.
    pub fn register<P: ManagedProcess>(&self, process: P) -> ProcessResult<Arc<ProcessHandle>> {
        let pid = process.id();
        if pid == 0 {
            warn!("Rejected registration without a usable PID");
            return Err(ProcessError::InvalidPid(pid));
        }
        let started_at = self.clock.now();

        let registered = match self.processes.entry(pid) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let handle = Arc::new(ProcessHandle::new(pid, Box::new(process), started_at));
                slot.insert(Arc::clone(&handle));
                Some(handle)
            }
        };

        match registered {
            Some(handle) => {
                self.stats.inc_registered();
                debug!(pid = pid, "Registered process");
                Ok(handle)
            }
            None => {
                warn!(pid = pid, "Rejected duplicate process registration");
                Err(ProcessError::DuplicateProcess(pid))
            }
        }
    }

    /// Track a process known only by its PID
    pub fn register_pid(&self, pid: Pid) -> ProcessResult<Arc<ProcessHandle>> {
        self.register(OsProcess::new(pid))
    }

    /// Register and wrap in a guard that terminates the process if dropped early
    pub fn supervise<P: ManagedProcess>(&self, process: P) -> ProcessResult<SupervisedProcess> {
        let handle = self.register(process)?;
        Ok(SupervisedProcess::new(self.clone(), handle))
    }

    /// Stop tracking a process the caller already saw exit
    ///
    /// Idempotent: returns whether a handle was removed.
    pub fn unregister(&self, pid: Pid) -> bool {
        let removed = self.processes.remove(&pid).is_some();
        if removed {
            self.stats.inc_unregistered();
            debug!(pid = pid, "Unregistered process");
        }
        removed
    }

    /// Terminate `pid`: SIGTERM, wait `grace`, SIGKILL, wait `wait_timeout`
    ///
    /// The sequence runs on its own task. Dropping this future stops the
    /// caller from waiting but never interrupts the escalation.
    pub async fn terminate(&self, pid: Pid, grace: Duration) -> ProcessResult<TerminationOutcome> {
        match self.get(pid) {
            Some(handle) => self.terminate_handle(handle, grace).await,
            None => Ok(TerminationOutcome::NotTracked),
        }
    }

    /// Terminate this exact registration, never a newer one under a reused PID
    pub(crate) async fn terminate_handle(
        &self,
        handle: Arc<ProcessHandle>,
        grace: Duration,
    ) -> ProcessResult<TerminationOutcome> {
        let pid = handle.pid();
        if !self.tracks(&handle) {
            return Ok(TerminationOutcome::NotTracked);
        }

        match handle.state() {
            ProcessState::Running => {}
            ProcessState::SignalSent => return Ok(TerminationOutcome::AlreadyTerminating),
            ProcessState::Terminated | ProcessState::ReapFailed => {
                return Ok(TerminationOutcome::NotTracked)
            }
        }
        if handle
            .transition(ProcessState::Running, ProcessState::SignalSent)
            .is_err()
        {
            return Ok(TerminationOutcome::AlreadyTerminating);
        }

        let registry = self.clone();
        let sequence = tokio::spawn(async move {
            let _settle = EscalationGuard {
                registry: &registry,
                handle: &handle,
            };
            registry.run_termination(Arc::clone(&handle), grace).await
        });
        match sequence.await {
            Ok(result) => result,
            Err(e) => Err(ProcessError::Signal {
                pid,
                reason: format!("termination task failed: {}", e),
            }),
        }
    }

    /// [`ProcessRegistry::terminate`] with the configured grace period
    pub async fn terminate_default(&self, pid: Pid) -> ProcessResult<TerminationOutcome> {
        self.terminate(pid, self.config.grace_period).await
    }

    async fn run_termination(
        &self,
        handle: Arc<ProcessHandle>,
        grace: Duration,
    ) -> ProcessResult<TerminationOutcome> {
        let pid = handle.pid();

        if let Ok(Some(status)) = handle.try_reap() {
            debug!(pid = pid, status = ?status, "Process already exited before termination");
            return Ok(self.finish_terminated(&handle, ProcessState::SignalSent, status));
        }

        match handle.signal_graceful() {
            Ok(()) => {
                self.stats.inc_signals_sent();
                debug!(pid = pid, grace_ms = grace.as_millis() as u64, "Sent graceful termination signal");
            }
            Err(e) => warn!(pid = pid, error = %e, "Graceful signal failed"),
        }

        if let Some(status) = self.wait_for_exit(&handle, grace).await {
            return Ok(self.finish_terminated(&handle, ProcessState::SignalSent, status));
        }

        warn!(
            pid = pid,
            grace_ms = grace.as_millis() as u64,
            "Process ignored graceful signal, escalating to kill"
        );
        match handle.signal_forceful() {
            Ok(()) => self.stats.inc_signals_sent(),
            Err(e) => warn!(pid = pid, error = %e, "Forceful signal failed"),
        }

        if let Some(status) = self.wait_for_exit(&handle, self.config.wait_timeout).await {
            return Ok(self.finish_terminated(&handle, ProcessState::SignalSent, status));
        }

        if let Err(e) = handle.transition(ProcessState::SignalSent, ProcessState::ReapFailed) {
            warn!(pid = pid, error = %e, "Unexpected state while recording reap failure");
        }
        self.remove_handle(&handle);
        self.stats.inc_reap_failed();
        error!(
            pid = pid,
            wait_timeout_ms = self.config.wait_timeout.as_millis() as u64,
            "Process did not exit after kill; dropped from tracking, OS process may be orphaned"
        );
        Err(ProcessError::ReapFailed { pid })
    }

    /// Wait for an in-flight termination owned by another caller
    async fn await_settled(&self, handle: &ProcessHandle) -> ProcessResult<TerminationOutcome> {
        handle.settled().await;
        match handle.state() {
            ProcessState::ReapFailed => Err(ProcessError::ReapFailed { pid: handle.pid() }),
            _ => Ok(TerminationOutcome::Terminated),
        }
    }

    /// Poll `try_reap` with backoff until exit or `timeout`
    ///
    /// A timeout too large to represent waits indefinitely.
    async fn wait_for_exit(&self, handle: &ProcessHandle, timeout: Duration) -> Option<ExitStatus> {
        let deadline = deadline_after(timeout);
        let mut interval = self.config.poll_interval;
        let mut reported_error = false;

        loop {
            match handle.try_reap() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {}
                Err(e) if !reported_error => {
                    reported_error = true;
                    warn!(pid = handle.pid(), error = %e, "Failed to query process status");
                }
                Err(_) => {}
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = interval
                .saturating_mul(2)
                .min(MAX_POLL_INTERVAL.max(self.config.poll_interval));
        }
    }

    fn finish_terminated(
        &self,
        handle: &Arc<ProcessHandle>,
        from: ProcessState,
        status: ExitStatus,
    ) -> TerminationOutcome {
        if let Err(e) = handle.transition(from, ProcessState::Terminated) {
            warn!(pid = handle.pid(), error = %e, "Unexpected state while recording exit");
        }
        self.remove_handle(handle);
        self.stats.inc_terminated();
        info!(pid = handle.pid(), status = ?status, "Process terminated");
        TerminationOutcome::Terminated
    }

    /// Remove `handle` only if it is still the one tracked under its PID
    fn remove_handle(&self, handle: &Arc<ProcessHandle>) -> bool {
        self.processes
            .remove_if(&handle.pid(), |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// Wait for a tracked process to exit on its own
    ///
    /// On exit the handle moves to `Terminated` and is removed. On timeout
    /// the process stays tracked; the caller decides whether to terminate.
    pub async fn wait(&self, pid: Pid, timeout: Duration) -> ProcessResult<ExitStatus> {
        let handle = self.get(pid).ok_or(ProcessError::NotFound(pid))?;
        self.wait_handle(&handle, timeout).await
    }

    pub(crate) async fn wait_handle(
        &self,
        handle: &Arc<ProcessHandle>,
        timeout: Duration,
    ) -> ProcessResult<ExitStatus> {
        let pid = handle.pid();
        match self.wait_for_exit(handle, timeout).await {
            Some(status) => {
                // A concurrent terminate owns the handle if this fails
                if handle
                    .transition(ProcessState::Running, ProcessState::Terminated)
                    .is_ok()
                {
                    self.remove_handle(handle);
                    self.stats.inc_exited();
                    debug!(pid = pid, status = ?status, "Process exited");
                }
                Ok(status)
            }
            None => Err(ProcessError::Timeout {
                pid,
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Terminate every tracked process concurrently
    ///
    /// Never fails as a whole: reap failures are aggregated into the summary
    /// so one stuck process cannot block cleanup of the rest. Terminations
    /// already in flight are awaited and counted by their outcome.
    pub async fn terminate_all(&self, grace: Duration) -> ShutdownSummary {
        let handles: Vec<Arc<ProcessHandle>> = self
            .processes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut summary = ShutdownSummary::default();
        if handles.is_empty() {
            return summary;
        }

        let span = OperationSpan::new("terminate_all");
        info!(
            trace_id = %span.trace_id(),
            count = handles.len(),
            grace_ms = grace.as_millis() as u64,
            "Terminating all tracked processes"
        );

        let results: Vec<(Pid, ProcessResult<TerminationOutcome>)> = stream::iter(handles)
            .map(|handle| {
                let registry = self.clone();
                async move {
                    let pid = handle.pid();
                    // In-flight terminations are awaited so the sweep reports their real outcome
                    let result = match registry.terminate_handle(Arc::clone(&handle), grace).await {
                        Ok(TerminationOutcome::AlreadyTerminating) => {
                            registry.await_settled(&handle).await
                        }
                        other => other,
                    };
                    (pid, result)
                }
            })
            .buffer_unordered(self.config.max_parallel_terminations)
            .collect()
            .await;

        for (pid, result) in results {
            match result {
                Ok(TerminationOutcome::Terminated) => summary.terminated += 1,
                Ok(TerminationOutcome::AlreadyTerminating | TerminationOutcome::NotTracked) => {
                    summary.skipped += 1
                }
                Err(e) => {
                    if !matches!(e, ProcessError::ReapFailed { .. }) {
                        error!(pid = pid, error = %e, "Termination failed");
                    }
                    summary.failed += 1;
                    summary.failed_pids.push(pid);
                }
            }
        }
        summary.failed_pids.sort_unstable();

        span.record_items_processed(summary.terminated + summary.failed + summary.skipped);
        span.record_result(summary.is_clean());
        if summary.is_clean() {
            info!(
                terminated = summary.terminated,
                skipped = summary.skipped,
                "Shutdown sweep complete"
            );
        } else {
            error!(
                terminated = summary.terminated,
                failed = summary.failed,
                failed_pids = ?summary.failed_pids,
                "Shutdown sweep left unreaped processes"
            );
        }
        summary
    }

    /// [`ProcessRegistry::terminate_all`] with the configured grace period
    pub async fn shutdown(&self) -> ShutdownSummary {
        self.terminate_all(self.config.grace_period).await
    }

    pub fn get(&self, pid: Pid) -> Option<Arc<ProcessHandle>> {
        self.processes.get(&pid).map(|entry| Arc::clone(entry.value()))
    }

    pub fn state(&self, pid: Pid) -> Option<ProcessState> {
        self.processes.get(&pid).map(|entry| entry.value().state())
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Whether `handle` is the one currently tracked under its PID
    pub(crate) fn tracks(&self, handle: &Arc<ProcessHandle>) -> bool {
        self.processes
            .get(&handle.pid())
            .map(|entry| Arc::ptr_eq(entry.value(), handle))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.processes.iter().map(|entry| *entry.key()).collect()
    }

    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        let now = self.clock.now();
        let mut infos: Vec<ProcessInfo> = self
            .processes
            .iter()
            .map(|entry| entry.value().info(now))
            .collect();
        infos.sort_by_key(|info| info.pid);
        infos
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.snapshot(self.processes.len())
    }
}

/// Settles a handle whose escalation task ended without reaching a terminal
/// state (panic, or runtime shutdown cancelling the task)
struct EscalationGuard<'a> {
    registry: &'a ProcessRegistry,
    handle: &'a Arc<ProcessHandle>,
}

impl Drop for EscalationGuard<'_> {
    fn drop(&mut self) {
        if self.handle.state() != ProcessState::SignalSent {
            return;
        }

        let pid = self.handle.pid();
        if let Err(e) = self.handle.signal_forceful() {
            warn!(pid = pid, error = %e, "Forceful signal failed during abandoned escalation");
        }
        if self
            .handle
            .transition(ProcessState::SignalSent, ProcessState::ReapFailed)
            .is_ok()
        {
            self.registry.remove_handle(self.handle);
            self.registry.stats.inc_reap_failed();
            error!(pid = pid, "Termination sequence aborted; process killed without confirming exit");
        }
    }
}

/// `now + timeout`, saturating to a far-future instant
fn deadline_after(timeout: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Roughly 30 years, the same horizon tokio uses for unbounded sleeps
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
