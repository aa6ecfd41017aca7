//! Channel provider contract.
//!
//! A provider delivers one message body to one destination address over
//! SMS or email. Providers only report what went wrong; the worker owns
//! the retry policy. New channels plug in without touching worker logic.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::model::JobType;

/// Why a provider send failed.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("send timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid destination address: {0}")]
    InvalidAddress(String),

    #[error("provider rejected message: {0}")]
    Rejected(String),
}

impl ChannelError {
    /// Transient failures are worth retrying; address and policy failures
    /// will fail the same way every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::Timeout | ChannelError::Network(_))
    }
}

/// Capability to deliver a message over one channel.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Deliver `body` to `to`. `to` is a phone number for SMS, a mailbox
    /// for email; the contract shape is identical.
    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError>;
}

/// The provider set the worker dispatches against, one per channel.
#[derive(Clone)]
pub struct Providers {
    sms: Arc<dyn ChannelProvider>,
    email: Arc<dyn ChannelProvider>,
}

impl Providers {
    pub fn new(sms: Arc<dyn ChannelProvider>, email: Arc<dyn ChannelProvider>) -> Self {
        Self { sms, email }
    }

    pub fn get(&self, job_type: JobType) -> &Arc<dyn ChannelProvider> {
        match job_type {
            JobType::Sms => &self.sms,
            JobType::Email => &self.email,
        }
    }
}

/// Dev provider: logs the message and reports success. Stands in for the
/// real SMS/email integrations, whose wire formats live outside this crate.
pub struct ConsoleProvider {
    channel: &'static str,
}

impl ConsoleProvider {
    pub fn new(channel: &'static str) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelProvider for ConsoleProvider {
    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        info!(channel = self.channel, to, body, "console send");
        Ok(())
    }
}
