pub mod logging;
pub mod trace_context;

pub use logging::{TelemetrySettings, init_tracing};
pub use trace_context::{
    REQUEST_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER, TracedClientExt, TracedRequest,
    extract_request_id, inject_trace_context,
};
