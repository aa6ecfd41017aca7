//! Worker retry-policy tests against the in-memory queue and ledger.

use std::sync::Arc;
use std::time::Duration;

use outreach_rs::channel::{ChannelError, Providers};
use outreach_rs::model::{ContactId, ContactSnapshot, Job, JobType, RecordStatus};
use outreach_rs::queue::JobQueue;
use outreach_rs::testing::{HangingProvider, MemoryLedger, MemoryQueue, ScriptedProvider};
use outreach_rs::worker::{Worker, WorkerConfig};

fn sms_job(contact_id: i64, phone: Option<&str>, message: &str) -> Job {
    Job {
        job_type: JobType::Sms,
        contact: ContactSnapshot {
            id: ContactId(contact_id),
            name: "Test Contact".to_string(),
            email: None,
            phone: phone.map(str::to_string),
        },
        message: message.to_string(),
    }
}

fn test_config() -> WorkerConfig {
    WorkerConfig {
        visibility_timeout: Duration::from_secs(30),
        poll_interval: Duration::from_millis(10),
        max_attempts: 3,
        base_backoff: Duration::from_millis(1),
        send_timeout: Duration::from_secs(1),
    }
}

struct Harness {
    queue: Arc<MemoryQueue>,
    ledger: Arc<MemoryLedger>,
    sms: Arc<ScriptedProvider>,
    worker: Worker,
}

fn harness() -> Harness {
    harness_with(test_config())
}

fn harness_with(config: WorkerConfig) -> Harness {
    let queue = Arc::new(MemoryQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    let sms = Arc::new(ScriptedProvider::new());
    let email = Arc::new(ScriptedProvider::new());
    let worker = Worker::new(
        queue.clone(),
        ledger.clone(),
        Providers::new(sms.clone(), email),
        config,
    );
    Harness {
        queue,
        ledger,
        sms,
        worker,
    }
}

/// Drive the worker until the queue drains, waiting out backoff delays.
async fn drain(h: &Harness) {
    for _ in 0..20 {
        if h.queue.is_empty() {
            return;
        }
        h.worker.process_one().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("queue did not drain");
}

#[tokio::test]
async fn successful_send_logs_sent_and_removes_job() {
    let h = harness();
    h.queue
        .enqueue(&sms_job(1, Some("+1555"), "Hello"))
        .await
        .unwrap();

    let processed = h.worker.process_one().await.unwrap();
    assert!(processed);
    assert!(h.queue.is_empty());

    let records = h.ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Sent);
    assert_eq!(records[0].contact_id, ContactId(1));
    assert_eq!(h.sms.deliveries(), vec![("+1555".to_string(), "Hello".to_string())]);
}

#[tokio::test]
async fn fails_twice_then_succeeds() {
    let h = harness();
    h.sms
        .push_outcome(Err(ChannelError::Network("connection reset".to_string())));
    h.sms
        .push_outcome(Err(ChannelError::Network("connection reset".to_string())));
    h.queue
        .enqueue(&sms_job(1, Some("+1555"), "Hello"))
        .await
        .unwrap();

    drain(&h).await;

    let records = h.ledger.records();
    let failed = records
        .iter()
        .filter(|r| r.status == RecordStatus::Failed)
        .count();
    let sent = records
        .iter()
        .filter(|r| r.status == RecordStatus::Sent)
        .count();
    assert_eq!(failed, 2);
    assert_eq!(sent, 1);
    assert!(records.iter().all(|r| r.contact_id == ContactId(1)));
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn exhausted_retries_are_terminal() {
    let h = harness();
    for _ in 0..3 {
        h.sms
            .push_outcome(Err(ChannelError::Network("down".to_string())));
    }
    h.queue
        .enqueue(&sms_job(2, Some("+1555"), "Hi"))
        .await
        .unwrap();

    drain(&h).await;

    // One failed entry per attempt, job removed — no infinite reclaim.
    let records = h.ledger.records();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == RecordStatus::Failed));
    assert!(h.queue.is_empty());
    assert!(h.sms.deliveries().is_empty());
}

#[tokio::test]
async fn non_retryable_failure_is_terminal_on_first_attempt() {
    let h = harness();
    h.sms
        .push_outcome(Err(ChannelError::InvalidAddress("bad number".to_string())));
    h.queue
        .enqueue(&sms_job(3, Some("not-a-number"), "Hi"))
        .await
        .unwrap();

    let processed = h.worker.process_one().await.unwrap();
    assert!(processed);

    let records = h.ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn missing_destination_address_is_terminal() {
    let h = harness();
    h.queue.enqueue(&sms_job(4, None, "Hi")).await.unwrap();

    h.worker.process_one().await.unwrap();

    let records = h.ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Failed);
    assert!(h.queue.is_empty());
    assert!(h.sms.deliveries().is_empty());
}

#[tokio::test]
async fn provider_reported_timeout_is_retryable() {
    let h = harness();
    h.sms.push_outcome(Err(ChannelError::Timeout));
    h.queue
        .enqueue(&sms_job(9, Some("+1555"), "Hi"))
        .await
        .unwrap();

    drain(&h).await;

    let records = h.ledger.records();
    let failed = records
        .iter()
        .filter(|r| r.status == RecordStatus::Failed)
        .count();
    let sent = records
        .iter()
        .filter(|r| r.status == RecordStatus::Sent)
        .count();
    assert_eq!(failed, 1);
    assert_eq!(sent, 1);
}

#[tokio::test]
async fn stuck_provider_send_times_out_and_is_retried() {
    let queue = Arc::new(MemoryQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    let worker = Worker::new(
        queue.clone(),
        ledger.clone(),
        Providers::new(Arc::new(HangingProvider::new()), Arc::new(ScriptedProvider::new())),
        WorkerConfig {
            send_timeout: Duration::from_millis(20),
            ..test_config()
        },
    );
    queue
        .enqueue(&sms_job(6, Some("+1555"), "Hi"))
        .await
        .unwrap();

    // Returns promptly despite the provider never completing.
    let processed = worker.process_one().await.unwrap();
    assert!(processed);

    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Failed);

    // Nacked, not removed: after the backoff it comes around again.
    assert_eq!(queue.len(), 1);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let redelivered = queue
        .claim(Duration::from_secs(30))
        .await
        .unwrap()
        .expect("expected the job back for retry");
    assert_eq!(redelivered.attempt, 2);
}

#[tokio::test]
async fn ack_failure_after_send_leaves_claim_to_expire() {
    let h = harness_with(WorkerConfig {
        visibility_timeout: Duration::from_millis(20),
        ..test_config()
    });
    h.queue
        .enqueue(&sms_job(7, Some("+1555"), "Hello"))
        .await
        .unwrap();

    h.queue.fail_next_ack();
    let processed = h.worker.process_one().await.unwrap();
    assert!(processed);

    // The delivery was ledgered and the job was not lost; it stays
    // claimed until the visibility timeout.
    assert_eq!(h.ledger.records().len(), 1);
    assert_eq!(h.ledger.records()[0].status, RecordStatus::Sent);
    assert_eq!(h.queue.len(), 1);
    assert!(!h.worker.process_one().await.unwrap());

    // After expiry it is redelivered, sent again, and acked cleanly.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.worker.process_one().await.unwrap());
    assert!(h.queue.is_empty());
    assert_eq!(h.sms.deliveries().len(), 2);
    let sent = h
        .ledger
        .records()
        .iter()
        .filter(|r| r.status == RecordStatus::Sent)
        .count();
    assert_eq!(sent, 2);
}

#[tokio::test]
async fn nack_failure_leaves_claim_to_expire() {
    let h = harness_with(WorkerConfig {
        visibility_timeout: Duration::from_millis(20),
        ..test_config()
    });
    h.sms
        .push_outcome(Err(ChannelError::Network("down".to_string())));
    h.queue
        .enqueue(&sms_job(8, Some("+1555"), "Hello"))
        .await
        .unwrap();

    h.queue.fail_next_nack();
    let processed = h.worker.process_one().await.unwrap();
    assert!(processed);

    assert_eq!(h.ledger.records().len(), 1);
    assert_eq!(h.ledger.records()[0].status, RecordStatus::Failed);
    assert_eq!(h.queue.len(), 1);
    assert!(h.queue.claim(Duration::from_secs(30)).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(30)).await;
    let redelivered = h
        .queue
        .claim(Duration::from_secs(30))
        .await
        .unwrap()
        .expect("expected the job back after expiry");
    assert_eq!(redelivered.attempt, 2);
}

#[tokio::test]
async fn empty_queue_processes_nothing() {
    let h = harness();
    let processed = h.worker.process_one().await.unwrap();
    assert!(!processed);
    assert!(h.ledger.records().is_empty());
}

#[tokio::test]
async fn email_jobs_dispatch_to_the_email_provider() {
    let queue = Arc::new(MemoryQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    let sms = Arc::new(ScriptedProvider::new());
    let email = Arc::new(ScriptedProvider::new());
    let worker = Worker::new(
        queue.clone(),
        ledger.clone(),
        Providers::new(sms.clone(), email.clone()),
        test_config(),
    );

    let job = Job {
        job_type: JobType::Email,
        contact: ContactSnapshot {
            id: ContactId(5),
            name: "Mail Person".to_string(),
            email: Some("m@x.com".to_string()),
            phone: None,
        },
        message: "An update".to_string(),
    };
    queue.enqueue(&job).await.unwrap();

    worker.process_one().await.unwrap();

    assert!(sms.deliveries().is_empty());
    assert_eq!(
        email.deliveries(),
        vec![("m@x.com".to_string(), "An update".to_string())]
    );
}
