//! Core data model.
//!
//! A contact is someone a campaign can reach. A job is one outbound send
//! captured at enqueue time. An outreach record is one immutable ledger
//! entry for a send attempt or inbound reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A contact in the store, with lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,

    pub name: String,

    /// Dedup key. Unique across the store when present; contacts created
    /// through ingestion always have one.
    pub email: Option<String>,

    /// Inbound SMS lookup key. Independent of email uniqueness.
    pub phone: Option<String>,

    pub organization: Option<String>,

    /// Unrecognized ingestion columns, kept as an open JSON object.
    pub custom_fields: serde_json::Value,

    pub status: ContactStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Newtype for contact IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub i64);

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contact staged for insertion by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub custom_fields: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Contact status
// ---------------------------------------------------------------------------

/// Lifecycle status of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactStatus {
    /// Initial status; eligible for outreach.
    Active,
    /// Replied YES to a campaign message.
    Engaged,
    /// Replied STOP. The campaign trigger must not enqueue further
    /// jobs for this contact.
    OptedOut,
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContactStatus::Active => "active",
            ContactStatus::Engaged => "engaged",
            ContactStatus::OptedOut => "opted-out",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ContactStatus::Active),
            "engaged" => Ok(ContactStatus::Engaged),
            "opted-out" => Ok(ContactStatus::OptedOut),
            other => Err(Error::Other(format!("unknown contact status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Delivery channel for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Sms,
    Email,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobType::Sms => "sms",
            JobType::Email => "email",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(JobType::Sms),
            "email" => Ok(JobType::Email),
            other => Err(Error::Other(format!("unknown job type: {other}"))),
        }
    }
}

/// Contact fields a send needs, captured at enqueue time. Later contact
/// edits never change an in-flight job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub id: ContactId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&Contact> for ContactSnapshot {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
        }
    }
}

/// One outbound send: a message to one contact over one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub contact: ContactSnapshot,
    pub message: String,
}

/// Newtype for queue-assigned job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Outreach record
// ---------------------------------------------------------------------------

/// What kind of traffic a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Sms,
    Email,
    SmsInbound,
}

impl From<JobType> for RecordType {
    fn from(job_type: JobType) -> Self {
        match job_type {
            JobType::Sms => RecordType::Sms,
            JobType::Email => RecordType::Email,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordType::Sms => "sms",
            RecordType::Email => "email",
            RecordType::SmsInbound => "sms_inbound",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(RecordType::Sms),
            "email" => Ok(RecordType::Email),
            "sms_inbound" => Ok(RecordType::SmsInbound),
            other => Err(Error::Other(format!("unknown record type: {other}"))),
        }
    }
}

/// Outcome a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    Sent,
    Failed,
    OptedOut,
    Engaged,
    Replied,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordStatus::Sent => "sent",
            RecordStatus::Failed => "failed",
            RecordStatus::OptedOut => "opted-out",
            RecordStatus::Engaged => "engaged",
            RecordStatus::Replied => "replied",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(RecordStatus::Sent),
            "failed" => Ok(RecordStatus::Failed),
            "opted-out" => Ok(RecordStatus::OptedOut),
            "engaged" => Ok(RecordStatus::Engaged),
            "replied" => Ok(RecordStatus::Replied),
            other => Err(Error::Other(format!("unknown record status: {other}"))),
        }
    }
}

/// One immutable ledger entry. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub contact_id: ContactId,
    pub record_type: RecordType,
    pub content: String,
    pub status: RecordStatus,
    pub timestamp: DateTime<Utc>,
}

/// A ledger entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub contact_id: ContactId,
    pub record_type: RecordType,
    pub content: String,
    pub status: RecordStatus,
}

// ---------------------------------------------------------------------------
// Reply keywords
// ---------------------------------------------------------------------------

/// Normalize an inbound message body for keyword matching.
pub fn normalize_body(body: &str) -> String {
    body.trim().to_uppercase()
}

/// Recognized inbound keywords, matched against the normalized body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKeyword {
    /// Opt-out request.
    Stop,
    /// Engagement confirmation.
    Yes,
    /// Anything else; logged but no status change.
    Other,
}

impl ReplyKeyword {
    pub fn from_normalized(body: &str) -> Self {
        match body {
            "STOP" => ReplyKeyword::Stop,
            "YES" => ReplyKeyword::Yes,
            _ => ReplyKeyword::Other,
        }
    }
}
