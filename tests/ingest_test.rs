//! Ingestion pipeline tests against the in-memory contact store.

use std::sync::Arc;

use outreach_rs::ingest::{Ingestor, RejectReason, Row, parse_rows};
use outreach_rs::store::ContactStore;
use outreach_rs::testing::MemoryStore;

fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn accepted_plus_rejected_equals_input() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone());

    let rows = vec![
        row(&[("email", "a@x.com"), ("name", "Ada")]),
        row(&[("email", ""), ("name", "Nameless")]),
        row(&[("email", "b@x.com")]),
        row(&[("email", "a@x.com")]), // intra-batch duplicate
    ];
    let input_count = rows.len();

    let summary = ingestor.ingest(rows).await.unwrap();
    assert_eq!(
        summary.new_contacts_added + summary.rejected.len(),
        input_count
    );
    assert_eq!(summary.new_contacts_added, 2);
    assert_eq!(store.count(), 2);
}

#[tokio::test]
async fn missing_email_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone());

    let summary = ingestor
        .ingest(vec![row(&[("name", "No Email")]), row(&[("email", "  ")])])
        .await
        .unwrap();

    assert_eq!(summary.new_contacts_added, 0);
    assert_eq!(summary.rejected.len(), 2);
    assert!(
        summary
            .rejected
            .iter()
            .all(|r| r.reason == RejectReason::MissingEmail)
    );
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn email_already_in_store_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    store.seed("Existing", Some("a@x.com"), None);
    let ingestor = Ingestor::new(store.clone());

    let summary = ingestor
        .ingest(vec![row(&[("email", "a@x.com"), ("name", "Again")])])
        .await
        .unwrap();

    assert_eq!(summary.new_contacts_added, 0);
    assert_eq!(summary.duplicates_found, 1);
    assert_eq!(summary.rejected[0].reason, RejectReason::DuplicateEmail);
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn intra_batch_duplicate_accepts_at_most_one() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone());

    let summary = ingestor
        .ingest(vec![
            row(&[("email", "dup@x.com"), ("name", "First")]),
            row(&[("email", "dup@x.com"), ("name", "Second")]),
        ])
        .await
        .unwrap();

    assert_eq!(summary.new_contacts_added, 1);
    assert_eq!(summary.duplicates_found, 1);
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn rows_are_normalized() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone());

    ingestor
        .ingest(vec![row(&[
            ("email", "c@x.com"),
            ("phone", "+1555"),
            ("favorite_color", "green"),
            ("region", "west"),
        ])])
        .await
        .unwrap();

    let contact = store.find_by_phone("+1555").await.unwrap().unwrap();
    assert_eq!(contact.name, "N/A");
    assert_eq!(contact.email.as_deref(), Some("c@x.com"));
    assert_eq!(contact.organization, None);
    assert_eq!(contact.custom_fields["favorite_color"], "green");
    assert_eq!(contact.custom_fields["region"], "west");
}

#[tokio::test]
async fn empty_input_is_a_successful_noop() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone());

    let summary = ingestor.ingest(Vec::new()).await.unwrap();
    assert_eq!(summary.new_contacts_added, 0);
    assert!(summary.rejected.is_empty());
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn batch_insert_failure_commits_nothing() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next_insert();
    let ingestor = Ingestor::new(store.clone());

    let result = ingestor
        .ingest(vec![
            row(&[("email", "a@x.com")]),
            row(&[("email", "b@x.com")]),
        ])
        .await;

    assert!(result.is_err());
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn parse_rows_maps_headers_to_values() {
    let csv = "email,name,favorite_color\na@x.com,Ada,green\nb@x.com,Bob,blue\n";
    let rows = parse_rows(csv.as_bytes()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["email"], "a@x.com");
    assert_eq!(rows[0]["favorite_color"], "green");
    assert_eq!(rows[1]["name"], "Bob");
}
