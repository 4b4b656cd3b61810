/*!
 * Monitoring
 * Structured tracing for inspection operations
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan, TRACE_JSON_ENV};
