/*!
 * Sliding Window Rate Limiter
 *
 * Per-key sliding-window admission control with bounded memory.
 *
 * # Design
 *
 * - **Single coarse lock**: every decision runs in one short critical
 *   section, so decisions for a key are linearizable and no concurrent
 *   attempt is lost or double counted
 * - **Bounded history**: a key keeps at most `max_requests` timestamps,
 *   the newest ones, which is all a window decision needs
 * - **Amortized eviction**: idle keys are purged from the cold end of the
 *   LRU order on each call; a new key at capacity evicts the coldest key.
 *   No background timer
 * - **No I/O under the lock**: logging happens after the guard is dropped
 */

use super::atomic_stats::AtomicLimiterStats;
use super::traits::AdmissionControl;
use super::types::{LimiterStats, RateLimitConfig};
use crate::core::errors::ConfigError;
use crate::core::time::{system_clock, Clock};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Recent attempts for one key
struct KeyHistory {
    /// Oldest first, never longer than `max_requests`
    records: VecDeque<Instant>,
    last_access: Instant,
    lru_tick: u64,
}

impl KeyHistory {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.records.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    fn count_within(&self, now: Instant, window: Duration) -> usize {
        self.records
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < window)
            .count()
    }
}

/// Everything guarded by the limiter mutex
#[derive(Default)]
struct LimiterState {
    keys: AHashMap<Arc<str>, KeyHistory>,
    /// Access order: lowest tick is least recently used
    lru: BTreeMap<u64, Arc<str>>,
    next_tick: u64,
}

impl LimiterState {
    fn next_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Drop keys idle for longer than `max_age`, never `current`
    fn purge_expired(&mut self, now: Instant, max_age: Duration, current: &str) -> u64 {
        let mut stale = Vec::new();
        for (&tick, key) in &self.lru {
            if &**key == current {
                continue;
            }
            match self.keys.get(key) {
                Some(history) if now.saturating_duration_since(history.last_access) <= max_age => {
                    break
                }
                _ => stale.push(tick),
            }
        }

        for tick in &stale {
            if let Some(key) = self.lru.remove(tick) {
                self.keys.remove(&key);
            }
        }
        stale.len() as u64
    }

    /// Drop the least recently used key other than `current`
    fn evict_lru(&mut self, current: &str) -> Option<Arc<str>> {
        let tick = self
            .lru
            .iter()
            .find(|(_, key)| &***key != current)
            .map(|(&tick, _)| tick)?;
        let key = self.lru.remove(&tick)?;
        self.keys.remove(&key);
        Some(key)
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.keys.remove(key) {
            Some(history) => {
                self.lru.remove(&history.lru_tick);
                true
            }
            None => false,
        }
    }
}

/// Outcome of one critical section, logged after unlocking
struct Decision {
    allowed: bool,
    expired: u64,
    evicted: Option<Arc<str>>,
}

/// Concurrency-safe sliding-window rate limiter
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
    stats: AtomicLimiterStats,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_keys", &self.len())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter on the system monotonic clock
    pub fn new(config: RateLimitConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, system_clock())
    }

    /// Create a limiter on an injected clock
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            max_requests = config.max_requests,
            window_ms = config.window.as_millis() as u64,
            max_entries = config.max_entries,
            "Rate limiter initialized"
        );
        Ok(Self {
            config,
            clock,
            state: Mutex::new(LimiterState::default()),
            stats: AtomicLimiterStats::new(),
        })
    }

    /// Record an attempt for `key` and decide whether it is admitted
    ///
    /// Never fails. The empty string is an ordinary key.
    pub fn is_allowed(&self, key: &str) -> bool {
        let decision = {
            let mut state = self.state.lock();
            // Read time under the lock so each key's records stay ordered
            let now = self.clock.now();
            self.decide(&mut state, key, now)
        };

        self.stats.record_decision(decision.allowed);
        self.stats.add_evicted_expired(decision.expired);
        if decision.expired > 0 {
            trace!(count = decision.expired, "Purged idle rate limit keys");
        }
        if let Some(evicted) = decision.evicted {
            self.stats.add_evicted_lru(1);
            trace!(evicted = %evicted, "Evicted least recently used rate limit key");
        }
        if !decision.allowed {
            debug!(key = %key, "Rate limit exceeded");
        }

        decision.allowed
    }

    fn decide(&self, state: &mut LimiterState, key: &str, now: Instant) -> Decision {
        let expired = state.purge_expired(now, self.config.max_age, key);

        let mut evicted = None;
        if !state.keys.contains_key(key) && state.keys.len() >= self.config.max_entries {
            evicted = state.evict_lru(key);
        }

        let tick = state.next_tick();
        let LimiterState { keys, lru, .. } = state;

        let shared_key = match keys.get_key_value(key) {
            Some((existing, history)) => {
                lru.remove(&history.lru_tick);
                Arc::clone(existing)
            }
            None => Arc::from(key),
        };
        let history = keys
            .entry(Arc::clone(&shared_key))
            .or_insert_with(|| KeyHistory {
                records: VecDeque::with_capacity(self.config.max_requests.min(64)),
                last_access: now,
                lru_tick: tick,
            });

        history.prune(now, self.config.window);
        let allowed = history.records.len() < self.config.max_requests;
        if allowed || self.config.count_denied {
            history.records.push_back(now);
            while history.records.len() > self.config.max_requests {
                history.records.pop_front();
            }
        }

        history.last_access = now;
        history.lru_tick = tick;
        lru.insert(tick, shared_key);

        Decision {
            allowed,
            expired,
            evicted,
        }
    }

    /// Attempts `key` could still make in the current window
    ///
    /// Read-only: records nothing and does not refresh the key's recency.
    pub fn remaining(&self, key: &str) -> usize {
        let state = self.state.lock();
        let now = self.clock.now();
        let used = state
            .keys
            .get(key)
            .map(|history| history.count_within(now, self.config.window))
            .unwrap_or(0);
        self.config.max_requests.saturating_sub(used)
    }

    /// Forget the history of `key`. Returns whether it was tracked.
    pub fn reset(&self, key: &str) -> bool {
        self.state.lock().remove(key)
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().keys.contains_key(key)
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            allowed: self.stats.allowed(),
            denied: self.stats.denied(),
            evicted_lru: self.stats.evicted_lru(),
            evicted_expired: self.stats.evicted_expired(),
            tracked_keys: self.len(),
        }
    }
}

impl AdmissionControl for RateLimiter {
    fn is_allowed(&self, key: &str) -> bool {
        RateLimiter::is_allowed(self, key)
    }
}
