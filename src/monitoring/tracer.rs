/*!
 * Structured Tracing
 * Subscriber setup and operation spans for governance work
 *
 * Features:
 * - Trace ID generation for correlating a shutdown sweep's log lines
 * - JSON-formatted logs for structured parsing
 * - Slow-operation warnings embedded in spans
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Operations slower than this are reported at `warn`
const SLOW_OPERATION_MS: u128 = 1_000;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - GOVERNOR_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("GOVERNOR_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span for multi-step operations with structured fields
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
}

impl OperationSpan {
    pub fn new(operation: &str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "operation",
            trace_id = %trace_id,
            operation = operation,
            duration_ms = tracing::field::Empty,
            result = tracing::field::Empty,
            items_processed = tracing::field::Empty,
        );

        let entered = span.enter();
        debug!(operation = operation, trace_id = %trace_id, "operation started");
        drop(entered);

        Self {
            span,
            start: Instant::now(),
            trace_id,
        }
    }

    /// Get the trace ID for this operation
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Record the operation result
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    /// Record items processed count
    pub fn record_items_processed(&self, count: usize) {
        self.span.record("items_processed", count as u64);
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_ms", duration.as_millis() as u64);

        if duration.as_millis() > SLOW_OPERATION_MS {
            warn!(
                trace_id = %self.trace_id,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow operation detected"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                duration_ms = duration.as_millis() as u64,
                "operation completed"
            );
        }
    }
}
