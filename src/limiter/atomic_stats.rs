/*!
 * Lock-Free Limiter Statistics
 * Atomic counters updated outside the limiter's critical section
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic limiter statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with the limiter mutex
/// - Relaxed ordering; snapshots are for monitoring only
#[repr(C, align(64))]
pub struct AtomicLimiterStats {
    allowed: AtomicU64,
    denied: AtomicU64,
    evicted_lru: AtomicU64,
    evicted_expired: AtomicU64,
}

impl AtomicLimiterStats {
    #[inline]
    pub const fn new() -> Self {
        Self {
            allowed: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            evicted_lru: AtomicU64::new(0),
            evicted_expired: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    pub fn record_decision(&self, allowed: bool) {
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub fn add_evicted_lru(&self, count: u64) {
        if count > 0 {
            self.evicted_lru.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub fn add_evicted_expired(&self, count: u64) {
        if count > 0 {
            self.evicted_expired.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn allowed(&self) -> u64 {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn denied(&self) -> u64 {
        self.denied.load(Ordering::Relaxed)
    }

    pub fn evicted_lru(&self) -> u64 {
        self.evicted_lru.load(Ordering::Relaxed)
    }

    pub fn evicted_expired(&self) -> u64 {
        self.evicted_expired.load(Ordering::Relaxed)
    }
}

impl Default for AtomicLimiterStats {
    fn default() -> Self {
        Self::new()
    }
}
