//! Durable job queue via pgmq, over direct SQLx.
//!
//! Calls pgmq's SQL functions: pgmq.create, pgmq.send, pgmq.read,
//! pgmq.set_vt, pgmq.archive. A pgmq read is a claim — the message is
//! invisible until its visibility timeout lapses, so a worker crash
//! between claim and ack always ends in redelivery.

use std::time::Duration;

use async_trait::async_trait;
use opentelemetry::KeyValue;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{Job, JobId};
use crate::queue::{ClaimedJob, JobQueue};
use crate::telemetry::metrics;

/// The single send-job queue. One queue, one consumer group.
pub const QUEUE_NAME: &str = "messaging";

impl super::Db {
    /// Create the pgmq queue (idempotent).
    pub async fn create_queue(&self, queue_name: &str) -> Result<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue_name)
            .execute(&self.pool)
            .await?;
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", queue_name.to_string()),
                KeyValue::new("operation", "create"),
            ],
        );
        Ok(())
    }
}

#[async_trait]
impl JobQueue for super::Db {
    async fn enqueue(&self, job: &Job) -> Result<JobId> {
        let payload = serde_json::to_value(job)?;
        let row: (i64,) = sqlx::query_as("SELECT pgmq.send($1, $2, $3)")
            .bind(QUEUE_NAME)
            .bind(&payload)
            .bind(0i32)
            .fetch_one(&self.pool)
            .await?;
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", QUEUE_NAME),
                KeyValue::new("operation", "send"),
            ],
        );
        Ok(JobId(row.0))
    }

    async fn claim(&self, visibility: Duration) -> Result<Option<ClaimedJob>> {
        let row = sqlx::query_as::<
            _,
            (
                i64,
                i32,
                chrono::DateTime<chrono::Utc>,
                serde_json::Value,
            ),
        >(
            "SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, 1)"
        )
        .bind(QUEUE_NAME)
        .bind(visibility.as_secs() as i32)
        .fetch_optional(&self.pool)
        .await?;

        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", QUEUE_NAME),
                KeyValue::new(
                    "operation",
                    if row.is_some() { "read" } else { "read_empty" },
                ),
            ],
        );

        let Some((msg_id, read_ct, enqueued_at, message)) = row else {
            return Ok(None);
        };

        let job: Job = match serde_json::from_value(message) {
            Ok(job) => job,
            Err(e) => {
                // Poison payload: archiving keeps it for inspection without
                // an endless reclaim loop.
                warn!(msg_id, "unparseable job payload, archiving: {e}");
                self.ack(JobId(msg_id)).await?;
                return Ok(None);
            }
        };

        Ok(Some(ClaimedJob {
            id: JobId(msg_id),
            attempt: read_ct as u32,
            enqueued_at,
            job,
        }))
    }

    async fn ack(&self, id: JobId) -> Result<()> {
        sqlx::query("SELECT pgmq.archive($1, $2)")
            .bind(QUEUE_NAME)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Queue(format!("ack {id}: {e}")))?;
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", QUEUE_NAME),
                KeyValue::new("operation", "archive"),
            ],
        );
        Ok(())
    }

    async fn nack(&self, id: JobId, retry_after: Duration) -> Result<()> {
        sqlx::query("SELECT pgmq.set_vt($1, $2, $3)")
            .bind(QUEUE_NAME)
            .bind(id.0)
            .bind(retry_after.as_secs() as i32)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Queue(format!("nack {id}: {e}")))?;
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", QUEUE_NAME),
                KeyValue::new("operation", "set_vt"),
            ],
        );
        Ok(())
    }
}
