//! Durable job queue contract.
//!
//! At-least-once delivery with claim exclusivity: a claimed job is
//! invisible to other claimants until it is acked, nacked, or its
//! visibility timeout expires. The visibility timeout is the crash
//! recovery mechanism — a worker that dies between claim and ack loses
//! nothing, the job reappears.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Job, JobId};

/// A job handed to a worker, with exclusive processing rights for the
/// duration of one attempt.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: JobId,
    /// Delivery count: 1 on the first claim, incremented on each redelivery.
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
    pub job: Job,
}

/// Durable queue of send jobs. No global ordering guarantee.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job, returning its queue-assigned ID.
    async fn enqueue(&self, job: &Job) -> Result<JobId>;

    /// Claim the next visible job, making it invisible to other claimants
    /// for `visibility`. Returns None when the queue is empty — callers
    /// poll; the claim itself never blocks.
    async fn claim(&self, visibility: Duration) -> Result<Option<ClaimedJob>>;

    /// Remove a job permanently. Terminal for both success and exhausted
    /// retries.
    async fn ack(&self, id: JobId) -> Result<()>;

    /// Return a claimed job to visibility after `retry_after`. The next
    /// claim sees an incremented attempt counter.
    async fn nack(&self, id: JobId, retry_after: Duration) -> Result<()>;
}
