//! Storage contracts: the contact store and the outreach ledger.
//!
//! The ingestion pipeline, worker, and reply handler take these as
//! trait objects so tests can substitute the in-memory implementations
//! in [`crate::testing`] for the Postgres ones in [`crate::db`].

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Contact, ContactId, ContactStatus, NewContact, NewRecord, OutreachRecord};

/// Persistent record of contacts and their lifecycle status.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Dedup check: is there already a contact with this email?
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert a batch of contacts in one all-or-nothing operation.
    /// Returns the assigned IDs in input order. An empty batch is a no-op.
    async fn insert_batch(&self, contacts: &[NewContact]) -> Result<Vec<ContactId>>;

    async fn get(&self, id: ContactId) -> Result<Contact>;

    /// Inbound SMS lookup. None when no contact has this phone number.
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Contact>>;

    /// Contacts eligible for a campaign pass, newest first.
    async fn list(&self, limit: i64) -> Result<Vec<Contact>>;

    /// Set a contact's lifecycle status. Idempotent single-row update.
    async fn update_status(&self, id: ContactId, status: ContactStatus) -> Result<()>;
}

/// Append-only history of every send attempt and inbound reply.
#[async_trait]
pub trait OutreachLedger: Send + Sync {
    async fn append(&self, record: NewRecord) -> Result<()>;

    /// All entries for one contact, oldest first.
    async fn history(&self, contact_id: ContactId) -> Result<Vec<OutreachRecord>>;
}
