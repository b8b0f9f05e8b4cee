/*!
 * Core Types
 * Common types shared by the limiter and the process registry
 */

/// Native OS process identifier
pub type Pid = u32;

/// Opaque identifier grouping requests that share one rate quota
/// (e.g. `"telegram:12345"`). Any string is valid, including the empty one.
pub type AdmissionKey = str;
