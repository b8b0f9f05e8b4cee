/*!
 * Limiter Module
 * Per-key sliding-window admission control
 */

pub mod atomic_stats;
pub mod sliding_window;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use sliding_window::RateLimiter;
pub use traits::AdmissionControl;
pub use types::{LimiterStats, RateLimitConfig, RateLimited};
