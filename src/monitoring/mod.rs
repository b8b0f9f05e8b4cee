/*!
 * Monitoring
 * Structured logging setup and operation tracing
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, OperationSpan};
