/*!
 * Admission Traits
 * Seam between request handlers and the limiter implementation
 */

use super::types::RateLimited;
use crate::core::types::AdmissionKey;

/// Admission control interface consumed by request handlers
pub trait AdmissionControl: Send + Sync {
    /// Record an attempt for `key` and decide whether it is admitted
    fn is_allowed(&self, key: &AdmissionKey) -> bool;

    /// Like [`AdmissionControl::is_allowed`], but shaped for handler error paths
    fn check(&self, key: &AdmissionKey) -> Result<(), RateLimited> {
        if self.is_allowed(key) {
            Ok(())
        } else {
            Err(RateLimited {
                key: key.to_string(),
            })
        }
    }
}
