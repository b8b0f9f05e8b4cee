/*!
 * Rate Limiter Types
 * Configuration, statistics, and the handler-facing denial value
 */

use crate::core::errors::ConfigError;
use crate::core::limits::{
    DEFAULT_MAX_ENTRIES, DEFAULT_MAX_KEY_AGE, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW,
};
use crate::core::serde::duration_secs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Limiter configuration, fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Attempts admitted per key within one window
    pub max_requests: usize,
    /// Trailing window length
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// Idle time after which a key is purged
    #[serde(with = "duration_secs")]
    pub max_age: Duration,
    /// Upper bound on distinct keys
    pub max_entries: usize,
    /// Whether denied attempts occupy window slots
    pub count_denied: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            max_age: DEFAULT_MAX_KEY_AGE,
            max_entries: DEFAULT_MAX_ENTRIES,
            count_denied: true,
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    #[must_use]
    pub fn with_count_denied(mut self, count_denied: bool) -> Self {
        self.count_denied = count_denied;
        self
    }

    /// Reject configurations that cannot admit anything or cannot bound memory
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::invalid("max_requests", "must be at least 1"));
        }
        if self.window.is_zero() {
            return Err(ConfigError::invalid("window", "must be non-zero"));
        }
        if self.max_age.is_zero() {
            return Err(ConfigError::invalid("max_age", "must be non-zero"));
        }
        if self.max_age < self.window {
            return Err(ConfigError::invalid(
                "max_age",
                "must not be shorter than window, or idle purges would reset live windows",
            ));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::invalid("max_entries", "must be at least 1"));
        }
        Ok(())
    }
}

/// Snapshot of limiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterStats {
    pub allowed: u64,
    pub denied: u64,
    pub evicted_lru: u64,
    pub evicted_expired: u64,
    pub tracked_keys: usize,
}

/// Denial surfaced to request handlers as "try again later"
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded for '{key}'. Try again later.")]
pub struct RateLimited {
    pub key: String,
}
