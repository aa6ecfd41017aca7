//! In-memory implementations of the queue, store, and channel contracts.
//!
//! These honor the same semantics as the Postgres-backed ones —
//! visibility timeouts, delivery counts, all-or-nothing batch inserts —
//! without an external service, so the pipeline can be exercised in
//! fast tests and wired together for local experiments.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::channel::{ChannelError, ChannelProvider};
use crate::error::{Error, Result};
use crate::model::{
    Contact, ContactId, ContactStatus, Job, JobId, NewContact, NewRecord, OutreachRecord,
};
use crate::queue::{ClaimedJob, JobQueue};
use crate::store::{ContactStore, OutreachLedger};

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

struct QueueEntry {
    id: i64,
    job: Job,
    read_ct: u32,
    enqueued_at: chrono::DateTime<chrono::Utc>,
    visible_at: Instant,
}

/// In-memory job queue with claim exclusivity via visibility deadlines.
#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<QueueEntry>>,
    next_id: AtomicI64,
    fail_acks: AtomicBool,
    fail_nacks: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs still in the queue, visible or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `ack` fail without removing the job.
    pub fn fail_next_ack(&self) {
        self.fail_acks.store(true, Ordering::SeqCst);
    }

    /// Make the next `nack` fail without changing visibility.
    pub fn fail_next_nack(&self) {
        self.fail_nacks.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: &Job) -> Result<JobId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.lock().unwrap().push(QueueEntry {
            id,
            job: job.clone(),
            read_ct: 0,
            enqueued_at: chrono::Utc::now(),
            visible_at: Instant::now(),
        });
        Ok(JobId(id))
    }

    async fn claim(&self, visibility: Duration) -> Result<Option<ClaimedJob>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let entry = match entries.iter_mut().find(|e| e.visible_at <= now) {
            Some(e) => e,
            None => return Ok(None),
        };

        entry.read_ct += 1;
        entry.visible_at = now + visibility;
        Ok(Some(ClaimedJob {
            id: JobId(entry.id),
            attempt: entry.read_ct,
            enqueued_at: entry.enqueued_at,
            job: entry.job.clone(),
        }))
    }

    async fn ack(&self, id: JobId) -> Result<()> {
        if self.fail_acks.swap(false, Ordering::SeqCst) {
            return Err(Error::Queue("simulated ack failure".to_string()));
        }
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id != id.0);
        if entries.len() == before {
            return Err(Error::Queue(format!("ack {id}: no such job")));
        }
        Ok(())
    }

    async fn nack(&self, id: JobId, retry_after: Duration) -> Result<()> {
        if self.fail_nacks.swap(false, Ordering::SeqCst) {
            return Err(Error::Queue("simulated nack failure".to_string()));
        }
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| e.id == id.0) {
            Some(entry) => {
                entry.visible_at = Instant::now() + retry_after;
                Ok(())
            }
            None => Err(Error::Queue(format!("nack {id}: no such job"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Contact store
// ---------------------------------------------------------------------------

/// In-memory contact store.
#[derive(Default)]
pub struct MemoryStore {
    contacts: Mutex<Vec<Contact>>,
    next_id: AtomicI64,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_batch` fail without inserting anything.
    pub fn fail_next_insert(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    /// Insert a contact directly, bypassing ingestion. Test seeding.
    pub fn seed(&self, name: &str, email: Option<&str>, phone: Option<&str>) -> ContactId {
        let id = ContactId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = chrono::Utc::now();
        self.contacts.lock().unwrap().push(Contact {
            id,
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            organization: None,
            custom_fields: serde_json::json!({}),
            status: ContactStatus::Active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn status_of(&self, id: ContactId) -> Option<ContactStatus> {
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.status)
    }

    pub fn count(&self) -> usize {
        self.contacts.lock().unwrap().len()
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.email.as_deref() == Some(email)))
    }

    async fn insert_batch(&self, contacts: &[NewContact]) -> Result<Vec<ContactId>> {
        if self.fail_inserts.swap(false, Ordering::SeqCst) {
            return Err(Error::Other("simulated store failure".to_string()));
        }

        let mut stored = self.contacts.lock().unwrap();
        let now = chrono::Utc::now();
        let mut ids = Vec::with_capacity(contacts.len());
        for new in contacts {
            let id = ContactId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            stored.push(Contact {
                id,
                name: new.name.clone(),
                email: Some(new.email.clone()),
                phone: new.phone.clone(),
                organization: new.organization.clone(),
                custom_fields: new.custom_fields.clone(),
                status: ContactStatus::Active,
                created_at: now,
                updated_at: now,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get(&self, id: ContactId) -> Result<Contact> {
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("contact {id}")))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<Contact>> {
        let contacts = self.contacts.lock().unwrap();
        Ok(contacts.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn update_status(&self, id: ContactId, status: ContactStatus) -> Result<()> {
        let mut contacts = self.contacts.lock().unwrap();
        match contacts.iter_mut().find(|c| c.id == id) {
            Some(contact) => {
                contact.status = status;
                contact.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(Error::NotFound(format!("contact {id}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// In-memory append-only ledger.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<OutreachRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<OutreachRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutreachLedger for MemoryLedger {
    async fn append(&self, record: NewRecord) -> Result<()> {
        self.records.lock().unwrap().push(OutreachRecord {
            contact_id: record.contact_id,
            record_type: record.record_type,
            content: record.content,
            status: record.status,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn history(&self, contact_id: ContactId) -> Result<Vec<OutreachRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.contact_id == contact_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Channel provider
// ---------------------------------------------------------------------------

/// Provider whose outcomes are scripted up front. Once the script runs
/// out, every send succeeds. Records each delivery it accepts.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<std::result::Result<(), ChannelError>>>,
    deliveries: Mutex<Vec<(String, String)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue up the outcome for the next send.
    pub fn push_outcome(&self, outcome: std::result::Result<(), ChannelError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// (destination, body) pairs of successful sends, in order.
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelProvider for ScriptedProvider {
    async fn send(&self, to: &str, body: &str) -> std::result::Result<(), ChannelError> {
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if outcome.is_ok() {
            self.deliveries
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
        }
        outcome
    }
}

/// Provider whose sends never complete. Stands in for a stuck upstream
/// so send-timeout handling can be exercised.
#[derive(Default)]
pub struct HangingProvider;

impl HangingProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelProvider for HangingProvider {
    async fn send(&self, _to: &str, _body: &str) -> std::result::Result<(), ChannelError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}
