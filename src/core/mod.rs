/*!
 * Core Module
 * Fundamental types, limits, clocks, and error handling
 */

pub mod blocking;
pub mod errors;
pub mod limits;
pub mod serde;
pub mod time;
pub mod types;

// Re-export for convenience
pub use blocking::persist_bytes;
pub use errors::*;
pub use time::{system_clock, Clock, ManualClock, MonotonicClock};
pub use types::*;
