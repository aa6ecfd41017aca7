//! Send execution span helpers.
//!
//! Provides span creation and outcome recording for jobs flowing through
//! the worker.

use tracing::Span;

use crate::model::{JobId, JobType};

/// Start a span for one job dispatch attempt.
///
/// The `job.outcome` field is declared empty and filled in via
/// [`record_outcome`].
pub fn start_send_span(job_type: JobType, job_id: JobId, attempt: u32) -> Span {
    tracing::info_span!(
        "job.dispatch",
        "job.type" = %job_type,
        "job.id" = %job_id,
        "job.attempt" = attempt,
        "job.outcome" = tracing::field::Empty,
    )
}

/// Record the dispatch outcome on the span.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("job.outcome", outcome);
    span.in_scope(|| {
        tracing::info!(outcome, "dispatch_outcome");
    });
}
