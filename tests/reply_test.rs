//! Contact state machine tests: inbound replies against the in-memory
//! store and ledger.

use std::sync::Arc;

use outreach_rs::model::{ContactStatus, RecordStatus, RecordType};
use outreach_rs::reply::{InboundMessage, ReplyHandler, ReplyOutcome};
use outreach_rs::testing::{MemoryLedger, MemoryStore};

fn handler() -> (Arc<MemoryStore>, Arc<MemoryLedger>, ReplyHandler) {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let handler = ReplyHandler::new(store.clone(), ledger.clone());
    (store, ledger, handler)
}

fn inbound(from: &str, body: &str) -> InboundMessage {
    InboundMessage {
        from: from.to_string(),
        body: body.to_string(),
    }
}

#[tokio::test]
async fn stop_opts_out_regardless_of_case_and_whitespace() {
    let (store, ledger, handler) = handler();
    let id = store.seed("Ada", Some("a@x.com"), Some("+1555"));

    let outcome = handler.handle(inbound("+1555", "  stop \n")).await.unwrap();

    assert_eq!(outcome, ReplyOutcome::OptedOut(id));
    assert_eq!(store.status_of(id), Some(ContactStatus::OptedOut));

    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, RecordType::SmsInbound);
    assert_eq!(records[0].status, RecordStatus::OptedOut);
    assert_eq!(records[0].content, "STOP");
}

#[tokio::test]
async fn yes_engages_from_any_state() {
    let (store, _ledger, handler) = handler();
    let id = store.seed("Ada", None, Some("+1555"));

    // Even an opted-out contact re-engages on YES.
    handler.handle(inbound("+1555", "STOP")).await.unwrap();
    let outcome = handler.handle(inbound("+1555", "yes")).await.unwrap();

    assert_eq!(outcome, ReplyOutcome::Engaged(id));
    assert_eq!(store.status_of(id), Some(ContactStatus::Engaged));
}

#[tokio::test]
async fn other_text_is_logged_without_state_change() {
    let (store, ledger, handler) = handler();
    let id = store.seed("Ada", None, Some("+1555"));

    let outcome = handler
        .handle(inbound("+1555", "Sounds interesting, tell me more"))
        .await
        .unwrap();

    assert_eq!(outcome, ReplyOutcome::Replied(id));
    assert_eq!(store.status_of(id), Some(ContactStatus::Active));

    let records = ledger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RecordStatus::Replied);
    // Free-form replies keep the raw body, not the normalized form.
    assert_eq!(records[0].content, "Sounds interesting, tell me more");
}

#[tokio::test]
async fn unknown_sender_is_dropped_without_a_ledger_entry() {
    let (store, ledger, handler) = handler();
    store.seed("Ada", None, Some("+1555"));

    let outcome = handler.handle(inbound("+1999", "STOP")).await.unwrap();

    assert_eq!(outcome, ReplyOutcome::UnknownSender);
    assert!(ledger.records().is_empty());
}

#[tokio::test]
async fn repeated_stop_is_idempotent_on_state_but_logs_each_delivery() {
    let (store, ledger, handler) = handler();
    let id = store.seed("Ada", None, Some("+1555"));

    handler.handle(inbound("+1555", "STOP")).await.unwrap();
    handler.handle(inbound("+1555", "STOP")).await.unwrap();

    // At-least-once webhook delivery: state settles, entries accumulate.
    assert_eq!(store.status_of(id), Some(ContactStatus::OptedOut));
    assert_eq!(ledger.records().len(), 2);
}
