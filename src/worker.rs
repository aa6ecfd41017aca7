//! Worker: claims send jobs, dispatches to channel providers, records
//! outcomes, manages retry and terminal failure.
//!
//! Multiple worker instances may run against the same queue; claim
//! exclusivity is the only coordination between them. The ledger write
//! always happens before ack/nack — a crash between the two means the
//! job is redelivered and a second ledger entry appears, which is the
//! accepted at-least-once behavior.

use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tracing::{Instrument, error, info, warn};

use crate::channel::Providers;
use crate::error::Result;
use crate::model::{Job, JobType, NewRecord, RecordStatus};
use crate::queue::{ClaimedJob, JobQueue};
use crate::store::OutreachLedger;
use crate::telemetry::dispatch::{record_outcome, start_send_span};
use crate::telemetry::metrics;

/// Worker tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Claim visibility timeout; a crashed worker's job reappears after this.
    pub visibility_timeout: Duration,
    /// How long to idle between claim passes when the queue is empty.
    pub poll_interval: Duration,
    /// Delivery attempts before a job's failure is terminal.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub base_backoff: Duration,
    /// Cap on one provider send call. A stuck provider must not starve
    /// the worker slot.
    pub send_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
            max_attempts: 3,
            base_backoff: Duration::from_secs(5),
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of one dispatch attempt. The worker decides retry policy from
/// this explicitly; providers never drive it by error propagation.
#[derive(Debug)]
enum Dispatch {
    Delivered,
    Retryable(String),
    Terminal(String),
}

/// The send worker. Takes its collaborators as constructor parameters —
/// no ambient queue or provider globals.
#[derive(Clone)]
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    ledger: Arc<dyn OutreachLedger>,
    providers: Providers,
    config: WorkerConfig,
    shutdown: Arc<Notify>,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        ledger: Arc<dyn OutreachLedger>,
        providers: Providers,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            ledger,
            providers,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the worker loop to stop after the current job.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run the claim/dispatch loop until shutdown.
    pub async fn run(&self) -> Result<()> {
        info!("worker started");
        loop {
            // Drain whatever is visible, then idle for a poll interval.
            loop {
                match self.process_one().await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        error!("job processing error: {e}");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("worker shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Claim and execute at most one job. Returns whether a job was
    /// processed; false means the queue had nothing visible.
    pub async fn process_one(&self) -> Result<bool> {
        let claimed = match self.queue.claim(self.config.visibility_timeout).await? {
            Some(c) => c,
            None => return Ok(false),
        };

        let waited = (chrono::Utc::now() - claimed.enqueued_at)
            .num_milliseconds()
            .max(0) as f64;
        metrics::queue_wait_ms().record(
            waited,
            &[KeyValue::new("channel", claimed.job.job_type.to_string())],
        );

        let span = start_send_span(claimed.job.job_type, claimed.id, claimed.attempt);
        self.execute(&claimed).instrument(span).await?;
        Ok(true)
    }

    async fn execute(&self, claimed: &ClaimedJob) -> Result<()> {
        let job = &claimed.job;
        let span = tracing::Span::current();

        match self.dispatch(job).await {
            Dispatch::Delivered => {
                record_outcome(&span, "sent");
                record_attempt(job.job_type, "sent");
                info!(
                    job_id = %claimed.id,
                    contact = %job.contact.id,
                    channel = %job.job_type,
                    "message sent"
                );

                // Ledger before ack: a crash here redelivers and may log
                // a duplicate entry, never a missing one.
                self.ledger
                    .append(job_record(job, RecordStatus::Sent))
                    .await?;
                self.ack_or_leave_claimed(claimed).await;
            }
            Dispatch::Retryable(reason) if claimed.attempt < self.config.max_attempts => {
                record_outcome(&span, "retry");
                record_attempt(job.job_type, "retry");
                let delay = self.backoff(claimed.attempt);
                warn!(
                    job_id = %claimed.id,
                    contact = %job.contact.id,
                    attempt = claimed.attempt,
                    retry_in = ?delay,
                    "send failed, will retry: {reason}"
                );

                self.ledger
                    .append(job_record(job, RecordStatus::Failed))
                    .await?;
                if let Err(e) = self.queue.nack(claimed.id, delay).await {
                    // Leave the claim to expire and redeliver rather than
                    // lose the job.
                    warn!(job_id = %claimed.id, "nack failed, leaving claim to expire: {e}");
                }
            }
            Dispatch::Retryable(reason) | Dispatch::Terminal(reason) => {
                record_outcome(&span, "failed");
                record_attempt(job.job_type, "failed");
                error!(
                    job_id = %claimed.id,
                    contact = %job.contact.id,
                    attempt = claimed.attempt,
                    "send failed terminally: {reason}"
                );

                self.ledger
                    .append(job_record(job, RecordStatus::Failed))
                    .await?;
                // Terminal failures are removed, not re-queued indefinitely.
                self.ack_or_leave_claimed(claimed).await;
            }
        }

        Ok(())
    }

    /// One provider send with a timeout, classified into an explicit
    /// outcome.
    async fn dispatch(&self, job: &Job) -> Dispatch {
        let to = match destination(job) {
            Some(address) => address,
            None => {
                return Dispatch::Terminal(format!(
                    "contact {} has no {} address",
                    job.contact.id, job.job_type
                ));
            }
        };

        let provider = self.providers.get(job.job_type);
        let start = Instant::now();
        let result = tokio::time::timeout(self.config.send_timeout, provider.send(to, &job.message)).await;

        metrics::send_duration_ms().record(
            start.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("channel", job.job_type.to_string())],
        );

        match result {
            Err(_) => Dispatch::Retryable("send timed out".to_string()),
            Ok(Ok(())) => Dispatch::Delivered,
            Ok(Err(e)) if e.is_retryable() => Dispatch::Retryable(e.to_string()),
            Ok(Err(e)) => Dispatch::Terminal(e.to_string()),
        }
    }

    /// Ack, or on queue failure keep the claim so the visibility timeout
    /// redelivers. A possible duplicate send beats a silently dropped job.
    async fn ack_or_leave_claimed(&self, claimed: &ClaimedJob) {
        if let Err(e) = self.queue.ack(claimed.id).await {
            warn!(job_id = %claimed.id, "ack failed, leaving claim to expire: {e}");
        }
    }

    /// Exponential backoff: base * 2^(attempt-1).
    fn backoff(&self, attempt: u32) -> Duration {
        self.config.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

fn destination(job: &Job) -> Option<&str> {
    match job.job_type {
        JobType::Sms => job.contact.phone.as_deref(),
        JobType::Email => job.contact.email.as_deref(),
    }
}

fn job_record(job: &Job, status: RecordStatus) -> NewRecord {
    NewRecord {
        contact_id: job.contact.id,
        record_type: job.job_type.into(),
        content: job.message.clone(),
        status,
    }
}

fn record_attempt(job_type: JobType, result: &'static str) {
    metrics::send_attempts().add(
        1,
        &[
            KeyValue::new("channel", job_type.to_string()),
            KeyValue::new("result", result),
        ],
    );
}
