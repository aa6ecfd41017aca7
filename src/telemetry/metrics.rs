//! Metric instrument factories for outreach-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"outreach-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for outreach-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("outreach-rs")
}

/// Counter: send attempts executed by the worker.
/// Labels: `channel`, `result` ("sent" | "retry" | "failed").
pub fn send_attempts() -> Counter<u64> {
    meter()
        .u64_counter("outreach.send.attempts")
        .with_description("Number of send attempts executed")
        .build()
}

/// Counter: queue-level operations (send, read, set_vt, archive, delete).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("outreach.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: ingestion row outcomes.
/// Labels: `outcome` ("accepted" | "missing_email" | "duplicate_email").
pub fn ingest_rows() -> Counter<u64> {
    meter()
        .u64_counter("outreach.ingest.rows")
        .with_description("Number of ingestion rows processed")
        .build()
}

/// Counter: inbound replies processed.
/// Labels: `outcome` ("opted_out" | "engaged" | "replied" | "unknown_sender").
pub fn replies_processed() -> Counter<u64> {
    meter()
        .u64_counter("outreach.replies.processed")
        .with_description("Number of inbound replies processed")
        .build()
}

/// Histogram: provider send duration in milliseconds.
/// Labels: `channel`.
pub fn send_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("outreach.send.duration_ms")
        .with_description("Provider send duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Histogram: time a job spent enqueued before this claim, in
/// milliseconds. Redeliveries measure from the original enqueue.
/// Labels: `channel`.
pub fn queue_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("outreach.queue.wait_ms")
        .with_description("Time from enqueue to claim in milliseconds")
        .with_unit("ms")
        .build()
}
