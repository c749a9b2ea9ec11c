//! Logging infrastructure: structured observability events.
//!
//! Provides [`JsonlEventSink`], a non-blocking JSONL writer, and
//! [`TracingEventSink`], both implementing the
//! [`ObservabilitySink`](alchemy_application::ObservabilitySink) port.

mod jsonl_sink;

pub use jsonl_sink::{DEFAULT_CAPACITY, JsonlEventSink, TracingEventSink};
