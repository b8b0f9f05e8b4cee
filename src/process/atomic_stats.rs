/*!
 * Lock-Free Registry Statistics
 */

use super::types::RegistryStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic registry counters
#[repr(C, align(64))]
pub struct AtomicRegistryStats {
    registered: AtomicU64,
    unregistered: AtomicU64,
    exited: AtomicU64,
    terminated: AtomicU64,
    reap_failed: AtomicU64,
    signals_sent: AtomicU64,
}

impl AtomicRegistryStats {
    #[inline]
    pub const fn new() -> Self {
        Self {
            registered: AtomicU64::new(0),
            unregistered: AtomicU64::new(0),
            exited: AtomicU64::new(0),
            terminated: AtomicU64::new(0),
            reap_failed: AtomicU64::new(0),
            signals_sent: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn inc_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_unregistered(&self) {
        self.unregistered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_exited(&self) {
        self.exited.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_terminated(&self) {
        self.terminated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_reap_failed(&self) {
        self.reap_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_signals_sent(&self) {
        self.signals_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot; `active` is filled in by the registry
    pub fn snapshot(&self, active: usize) -> RegistryStats {
        RegistryStats {
            registered: self.registered.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
            exited: self.exited.load(Ordering::Relaxed),
            terminated: self.terminated.load(Ordering::Relaxed),
            reap_failed: self.reap_failed.load(Ordering::Relaxed),
            signals_sent: self.signals_sent.load(Ordering::Relaxed),
            active,
        }
    }
}

impl Default for AtomicRegistryStats {
    fn default() -> Self {
        Self::new()
    }
}
