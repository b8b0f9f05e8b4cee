/*!
 * Governance
 * Facade wiring the rate limiter and process registry into one service-wide owner
 */

pub mod config;
pub mod facade;

// Re-export for convenience
pub use config::GovernanceConfig;
pub use facade::{governance, install, ResourceGovernance};
