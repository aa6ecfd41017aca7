//! # outreach-rs
//!
//! Outreach campaign engine: bulk contact ingestion with dedup, a durable
//! Postgres-backed send queue (pgmq) worked by a retrying dispatcher over
//! pluggable channel providers, and a reply-driven contact lifecycle.

pub mod channel;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod model;
pub mod queue;
pub mod reply;
pub mod store;
pub mod telemetry;
pub mod testing;
pub mod worker;
