/*!
 * Resource Governance
 * Process-wide owner of the rate limiter and the process registry
 *
 * Both governors are built eagerly by [`install`] during service start, so
 * handlers never race to construct them. Tests build their own
 * [`ResourceGovernance`] instances instead of touching the global.
 */

use super::config::GovernanceConfig;
use crate::core::errors::{ConfigError, GovernanceError};
use crate::limiter::{AdmissionControl, RateLimited, RateLimiter};
use crate::process::{ProcessRegistry, ShutdownSummary};
use std::sync::OnceLock;
use tracing::info;

static GOVERNANCE: OnceLock<ResourceGovernance> = OnceLock::new();

/// One rate limiter and one process registry sharing a lifetime
#[derive(Debug)]
pub struct ResourceGovernance {
    limiter: RateLimiter,
    registry: ProcessRegistry,
}

impl ResourceGovernance {
    pub fn new(config: GovernanceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            limiter: RateLimiter::new(config.limiter)?,
            registry: ProcessRegistry::new(config.registry)?,
        })
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn process_registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Admission check for request handlers
    pub fn admit(&self, key: &str) -> Result<(), RateLimited> {
        self.limiter.check(key)
    }

    /// Terminate every tracked process with the configured grace period
    pub async fn shutdown(&self) -> ShutdownSummary {
        self.registry.shutdown().await
    }
}

/// Build both governors and publish them process-wide
///
/// Fails with [`GovernanceError::AlreadyInstalled`] on every call after the
/// first successful one.
pub fn install(config: GovernanceConfig) -> Result<&'static ResourceGovernance, GovernanceError> {
    if GOVERNANCE.get().is_some() {
        return Err(GovernanceError::AlreadyInstalled);
    }

    let governance = ResourceGovernance::new(config)?;
    GOVERNANCE
        .set(governance)
        .map_err(|_| GovernanceError::AlreadyInstalled)?;

    let installed = GOVERNANCE.get().ok_or(GovernanceError::NotInstalled)?;
    info!(
        max_requests = installed.limiter.config().max_requests,
        window_ms = installed.limiter.config().window.as_millis() as u64,
        max_entries = installed.limiter.config().max_entries,
        grace_ms = installed.registry.config().grace_period.as_millis() as u64,
        "Resource governance installed"
    );
    Ok(installed)
}

/// The installed facade
pub fn governance() -> Result<&'static ResourceGovernance, GovernanceError> {
    GOVERNANCE.get().ok_or(GovernanceError::NotInstalled)
}
