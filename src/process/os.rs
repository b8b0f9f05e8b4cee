/*!
 * OS Process Bindings
 *
 * `ManagedProcess` implementations for std and tokio children, plus a
 * bare-PID wrapper for processes spawned elsewhere in the service.
 */

use super::traits::ManagedProcess;
use super::types::ExitStatus;
use crate::core::types::Pid;
use std::io;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{kill, Signal as UnixSignal};
#[cfg(unix)]
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Convert to a nix PID that names exactly one process
///
/// 0 and negative values address process groups in `kill` and `waitpid`.
#[cfg(unix)]
fn nix_pid(pid: Pid) -> io::Result<NixPid> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(NixPid::from_raw(raw)),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("PID {} does not name a single process", pid),
        )),
    }
}

/// Send `signal` to `pid`
#[cfg(unix)]
pub(crate) fn send_signal(pid: Pid, signal: UnixSignal) -> io::Result<()> {
    kill(nix_pid(pid)?, signal).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn unsupported(pid: Pid) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("Graceful signals not supported on this platform (PID {})", pid),
    )
}

impl ManagedProcess for std::process::Child {
    fn id(&self) -> Pid {
        std::process::Child::id(self)
    }

    #[cfg(unix)]
    fn signal_graceful(&mut self) -> io::Result<()> {
        send_signal(std::process::Child::id(self), UnixSignal::SIGTERM)
    }

    #[cfg(not(unix))]
    fn signal_graceful(&mut self) -> io::Result<()> {
        Err(unsupported(std::process::Child::id(self)))
    }

    fn signal_forceful(&mut self) -> io::Result<()> {
        self.kill()
    }

    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        Ok(self.try_wait()?.map(ExitStatus::from))
    }
}

impl ManagedProcess for tokio::process::Child {
    /// 0 once the child has been reaped; the registry refuses to track it
    fn id(&self) -> Pid {
        tokio::process::Child::id(self).unwrap_or(0)
    }

    #[cfg(unix)]
    fn signal_graceful(&mut self) -> io::Result<()> {
        match tokio::process::Child::id(self) {
            Some(pid) => send_signal(pid, UnixSignal::SIGTERM),
            // Already reaped
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    fn signal_graceful(&mut self) -> io::Result<()> {
        Err(unsupported(ManagedProcess::id(self)))
    }

    fn signal_forceful(&mut self) -> io::Result<()> {
        self.start_kill()
    }

    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        Ok(self.try_wait()?.map(ExitStatus::from))
    }
}

/// A process known only by its PID
///
/// Reaps with `waitpid(WNOHANG)` when the process is our child. For a
/// non-child, exit is detected by probing with signal 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsProcess {
    pid: Pid,
}

impl OsProcess {
    pub fn new(pid: Pid) -> Self {
        Self { pid }
    }
}

#[cfg(unix)]
impl ManagedProcess for OsProcess {
    fn id(&self) -> Pid {
        self.pid
    }

    fn signal_graceful(&mut self) -> io::Result<()> {
        send_signal(self.pid, UnixSignal::SIGTERM)
    }

    fn signal_forceful(&mut self) -> io::Result<()> {
        send_signal(self.pid, UnixSignal::SIGKILL)
    }

    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        let pid = nix_pid(self.pid)?;
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Ok(Some(ExitStatus::Code(code))),
            Ok(WaitStatus::Signaled(_, signal, _)) => Ok(Some(ExitStatus::Signaled(signal as i32))),
            // StillAlive, Stopped, Continued
            Ok(_) => Ok(None),
            Err(Errno::ECHILD) => match kill(pid, None::<UnixSignal>) {
                Ok(()) | Err(Errno::EPERM) => Ok(None),
                Err(Errno::ESRCH) => Ok(Some(ExitStatus::Unknown)),
                Err(e) => Err(io::Error::from(e)),
            },
            Err(e) => Err(io::Error::from(e)),
        }
    }
}

#[cfg(not(unix))]
impl ManagedProcess for OsProcess {
    fn id(&self) -> Pid {
        self.pid
    }

    fn signal_graceful(&mut self) -> io::Result<()> {
        Err(unsupported(self.pid))
    }

    fn signal_forceful(&mut self) -> io::Result<()> {
        Err(unsupported(self.pid))
    }

    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        Err(unsupported(self.pid))
    }
}
