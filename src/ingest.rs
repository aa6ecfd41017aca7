//! Contact ingestion: CSV parsing, per-row dedup, batch insert.
//!
//! Rows are processed strictly sequentially against a per-batch seen-set
//! plus the persisted store, so two rows in one file sharing an email can
//! never both be accepted. Accepted rows land in one all-or-nothing batch
//! insert.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::model::NewContact;
use crate::store::ContactStore;
use crate::telemetry::metrics;

/// One raw input row: column name → value, as parsed from the feed.
pub type Row = HashMap<String, String>;

/// Columns mapped onto structured contact fields. Everything else goes
/// into `custom_fields`.
const RESERVED_COLUMNS: [&str; 4] = ["name", "email", "phone", "organization"];

/// Why a row was rejected. Rejections are data, not errors — the batch
/// continues past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    MissingEmail,
    DuplicateEmail,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::MissingEmail => "missing-email",
            RejectReason::DuplicateEmail => "duplicate-email",
        };
        write!(f, "{s}")
    }
}

/// A rejected input row with its reason, returned for caller reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub row: Row,
    pub reason: RejectReason,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub new_contacts_added: usize,
    pub duplicates_found: usize,
    pub rejected: Vec<RejectedRow>,
}

/// Parse a delimited feed into rows. The first record is the header.
pub fn parse_rows<R: io::Read>(reader: R) -> Result<Vec<Row>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// The ingestion pipeline. Takes the contact store as an explicit
/// dependency so tests can run against an in-memory one.
pub struct Ingestor {
    store: Arc<dyn ContactStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Partition rows into accepted and rejected, then insert all accepted
    /// rows in one batch. A store failure during the insert fails the
    /// whole batch; no partial commit is visible.
    pub async fn ingest(&self, rows: Vec<Row>) -> Result<IngestSummary> {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for row in rows {
            let email = row
                .get("email")
                .map(|value| value.trim().to_string())
                .unwrap_or_default();

            if email.is_empty() {
                record_row_outcome("missing_email");
                rejected.push(RejectedRow {
                    row,
                    reason: RejectReason::MissingEmail,
                });
                continue;
            }

            // Intra-batch duplicates first, then the persisted store.
            if seen.contains(&email) || self.store.email_exists(&email).await? {
                record_row_outcome("duplicate_email");
                rejected.push(RejectedRow {
                    row,
                    reason: RejectReason::DuplicateEmail,
                });
                continue;
            }

            seen.insert(email.clone());
            record_row_outcome("accepted");
            accepted.push(normalize_row(row, email));
        }

        self.store.insert_batch(&accepted).await?;

        let duplicates_found = rejected
            .iter()
            .filter(|r| r.reason == RejectReason::DuplicateEmail)
            .count();

        info!(
            added = accepted.len(),
            duplicates = duplicates_found,
            rejected = rejected.len(),
            "ingestion batch complete"
        );

        Ok(IngestSummary {
            new_contacts_added: accepted.len(),
            duplicates_found,
            rejected,
        })
    }
}

fn record_row_outcome(outcome: &'static str) {
    metrics::ingest_rows().add(1, &[KeyValue::new("outcome", outcome)]);
}

/// Map a raw row onto a contact: reserved columns become structured
/// fields, everything else is collected into custom_fields.
fn normalize_row(mut row: Row, email: String) -> NewContact {
    let name = row
        .remove("name")
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "N/A".to_string());
    let phone = row.remove("phone").filter(|v| !v.is_empty());
    let organization = row.remove("organization").filter(|v| !v.is_empty());

    for reserved in RESERVED_COLUMNS {
        row.remove(reserved);
    }

    let custom_fields = serde_json::Value::Object(
        row.into_iter()
            .map(|(key, value)| (key, serde_json::Value::String(value)))
            .collect(),
    );

    NewContact {
        name,
        email,
        phone,
        organization,
        custom_fields,
    }
}
