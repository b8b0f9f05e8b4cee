/*!
 * Governance Configuration
 * Defaults, JSON documents, and environment overrides for both governors
 */

use crate::core::errors::ConfigError;
use crate::limiter::RateLimitConfig;
use crate::process::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_RATE_MAX_REQUESTS: &str = "GOVERNOR_RATE_MAX_REQUESTS";
pub const ENV_RATE_WINDOW_SECS: &str = "GOVERNOR_RATE_WINDOW_SECS";
pub const ENV_RATE_MAX_AGE_SECS: &str = "GOVERNOR_RATE_MAX_AGE_SECS";
pub const ENV_RATE_MAX_ENTRIES: &str = "GOVERNOR_RATE_MAX_ENTRIES";
pub const ENV_PROCESS_GRACE_SECS: &str = "GOVERNOR_PROCESS_GRACE_SECS";
pub const ENV_PROCESS_WAIT_TIMEOUT_SECS: &str = "GOVERNOR_PROCESS_WAIT_TIMEOUT_SECS";
pub const ENV_PROCESS_MAX_PARALLEL: &str = "GOVERNOR_PROCESS_MAX_PARALLEL";

/// Configuration for the whole governance facade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GovernanceConfig {
    pub limiter: RateLimitConfig,
    pub registry: RegistryConfig,
}

impl GovernanceConfig {
    /// Defaults overlaid with `GOVERNOR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            source_name: "governance config".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, then validate the result
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var::<usize, _>(&lookup, ENV_RATE_MAX_REQUESTS)? {
            self.limiter.max_requests = v;
        }
        if let Some(v) = parse_secs(&lookup, ENV_RATE_WINDOW_SECS)? {
            self.limiter.window = v;
        }
        if let Some(v) = parse_secs(&lookup, ENV_RATE_MAX_AGE_SECS)? {
            self.limiter.max_age = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, ENV_RATE_MAX_ENTRIES)? {
            self.limiter.max_entries = v;
        }
        if let Some(v) = parse_secs(&lookup, ENV_PROCESS_GRACE_SECS)? {
            self.registry.grace_period = v;
        }
        if let Some(v) = parse_secs(&lookup, ENV_PROCESS_WAIT_TIMEOUT_SECS)? {
            self.registry.wait_timeout = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, ENV_PROCESS_MAX_PARALLEL)? {
            self.registry.max_parallel_terminations = v;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limiter.validate()?;
        self.registry.validate()
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                source_name: name.to_string(),
                reason: format!("{raw:?}: {e}"),
            }),
    }
}

fn parse_secs<F>(lookup: &F, name: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<f64, _>(lookup, name)? {
        None => Ok(None),
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                source_name: name.to_string(),
                reason: e.to_string(),
            }),
    }
}
