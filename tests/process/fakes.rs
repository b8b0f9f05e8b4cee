/*!
 * Scripted processes for registry tests
 */

use resource_governor::{ExitStatus, ManagedProcess, Pid, ProcessRegistry, RegistryConfig};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a scripted process reacts to signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Exits on SIGTERM
    Cooperative,
    /// Ignores SIGTERM, dies on SIGKILL
    IgnoresTerm,
    /// Survives everything
    Unkillable,
}

/// Shared view of what a scripted process has seen
#[derive(Debug, Default)]
pub struct Probe {
    pub graceful: AtomicUsize,
    pub forceful: AtomicUsize,
    pub exited: AtomicBool,
}

impl Probe {
    pub fn graceful(&self) -> usize {
        self.graceful.load(Ordering::SeqCst)
    }

    pub fn forceful(&self) -> usize {
        self.forceful.load(Ordering::SeqCst)
    }

    /// Let the process exit on its own
    pub fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

pub struct Scripted {
    pid: Pid,
    behavior: Behavior,
    probe: Arc<Probe>,
}

impl Scripted {
    pub fn new(pid: Pid, behavior: Behavior) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                pid,
                behavior,
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }
}

impl ManagedProcess for Scripted {
    fn id(&self) -> Pid {
        self.pid
    }

    fn signal_graceful(&mut self) -> io::Result<()> {
        self.probe.graceful.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::Cooperative {
            self.probe.exit();
        }
        Ok(())
    }

    fn signal_forceful(&mut self) -> io::Result<()> {
        self.probe.forceful.fetch_add(1, Ordering::SeqCst);
        if self.behavior != Behavior::Unkillable {
            self.probe.exit();
        }
        Ok(())
    }

    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        Ok(self
            .probe
            .exited
            .load(Ordering::SeqCst)
            .then_some(ExitStatus::Signaled(15)))
    }
}

/// Registry with short timings so escalation paths finish quickly
pub fn fast_registry() -> ProcessRegistry {
    ProcessRegistry::new(
        RegistryConfig::default()
            .with_grace_period(Duration::from_millis(30))
            .with_wait_timeout(Duration::from_millis(60))
            .with_poll_interval(Duration::from_millis(2))
            .with_max_parallel_terminations(4),
    )
    .unwrap()
}

pub const GRACE: Duration = Duration::from_millis(30);
