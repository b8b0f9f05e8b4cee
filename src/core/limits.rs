/*!
 * Governance Limits and Constants
 *
 * Centralized location for every default used by the limiter and the
 * process registry. Organized by domain.
 */

use std::time::Duration;

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Requests admitted per key within one window
pub const DEFAULT_MAX_REQUESTS: usize = 30;

/// Length of the trailing window (60s)
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Idle time after which a key's history is purged (1 hour)
pub const DEFAULT_MAX_KEY_AGE: Duration = Duration::from_secs(60 * 60);

/// Upper bound on distinct tracked keys
/// Oldest-accessed key is evicted when a new key would exceed it
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// PROCESS REGISTRY
// =============================================================================

/// Grace period between SIGTERM and SIGKILL (5s)
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Wait for the OS to reap a process after SIGKILL (10s)
/// Generous: covers children stuck in uninterruptible I/O
pub const DEFAULT_PROCESS_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a configured grace period or post-kill wait (1 hour)
pub const MAX_TERMINATION_WAIT: Duration = Duration::from_secs(60 * 60);

/// Interval between non-blocking reap attempts while waiting for exit
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on the poll interval after backoff
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Terminations run concurrently during a shutdown sweep
pub const DEFAULT_MAX_PARALLEL_TERMINATIONS: usize = 8;
