//! Inbound reply handling: the contact lifecycle state machine.
//!
//! STOP opts a contact out, YES marks them engaged, anything else is
//! logged as a plain reply. The transport-facing layer must acknowledge
//! delivery regardless of what happens here — a transport error response
//! only triggers provider-side redelivery of the same message.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::info;

use crate::error::Result;
use crate::model::{
    ContactId, ContactStatus, NewRecord, RecordStatus, RecordType, ReplyKeyword, normalize_body,
};
use crate::store::{ContactStore, OutreachLedger};
use crate::telemetry::metrics;

/// One inbound message from the transport webhook: sender address and
/// raw body.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
}

/// What an inbound message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// STOP: contact is now opted out.
    OptedOut(ContactId),
    /// YES: contact is now engaged.
    Engaged(ContactId),
    /// Any other text: logged, status unchanged.
    Replied(ContactId),
    /// No contact matches the sender address. Dropped, not an error.
    UnknownSender,
}

/// Applies inbound replies to contact state and the ledger.
pub struct ReplyHandler {
    store: Arc<dyn ContactStore>,
    ledger: Arc<dyn OutreachLedger>,
}

impl ReplyHandler {
    pub fn new(store: Arc<dyn ContactStore>, ledger: Arc<dyn OutreachLedger>) -> Self {
        Self { store, ledger }
    }

    /// Process one inbound message. Contacts are looked up by phone
    /// number; unknown senders are dropped without a ledger entry.
    ///
    /// Redelivery of the same physical message is not deduplicated —
    /// each delivery appends its own ledger entry.
    pub async fn handle(&self, inbound: InboundMessage) -> Result<ReplyOutcome> {
        let normalized = normalize_body(&inbound.body);
        info!(from = %inbound.from, body = %normalized, "inbound message");

        let contact = match self.store.find_by_phone(&inbound.from).await? {
            Some(contact) => contact,
            None => {
                info!(from = %inbound.from, "unknown sender, dropping");
                record_reply("unknown_sender");
                return Ok(ReplyOutcome::UnknownSender);
            }
        };

        match ReplyKeyword::from_normalized(&normalized) {
            ReplyKeyword::Stop => {
                self.store
                    .update_status(contact.id, ContactStatus::OptedOut)
                    .await?;
                info!(contact = %contact.id, name = %contact.name, "contact opted out");
                self.ledger
                    .append(inbound_record(contact.id, normalized, RecordStatus::OptedOut))
                    .await?;
                record_reply("opted_out");
                Ok(ReplyOutcome::OptedOut(contact.id))
            }
            ReplyKeyword::Yes => {
                self.store
                    .update_status(contact.id, ContactStatus::Engaged)
                    .await?;
                info!(contact = %contact.id, name = %contact.name, "contact engaged");
                self.ledger
                    .append(inbound_record(contact.id, normalized, RecordStatus::Engaged))
                    .await?;
                record_reply("engaged");
                Ok(ReplyOutcome::Engaged(contact.id))
            }
            ReplyKeyword::Other => {
                // Free-form replies keep the raw body; no status change.
                self.ledger
                    .append(inbound_record(
                        contact.id,
                        inbound.body.clone(),
                        RecordStatus::Replied,
                    ))
                    .await?;
                record_reply("replied");
                Ok(ReplyOutcome::Replied(contact.id))
            }
        }
    }
}

fn inbound_record(contact_id: ContactId, content: String, status: RecordStatus) -> NewRecord {
    NewRecord {
        contact_id,
        record_type: RecordType::SmsInbound,
        content,
        status,
    }
}

fn record_reply(outcome: &'static str) {
    metrics::replies_processed().add(1, &[KeyValue::new("outcome", outcome)]);
}
