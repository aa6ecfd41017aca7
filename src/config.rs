//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

use secrecy::SecretString;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,

    /// Worker tuning. All optional with defaults matching `WorkerConfig`.
    pub max_attempts: u32,
    pub visibility_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub base_backoff_secs: u64,
    pub send_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// In production, systemd EnvironmentFile provides the vars.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            max_attempts: var_or("WORKER_MAX_ATTEMPTS", 3)?,
            visibility_timeout_secs: var_or("WORKER_VISIBILITY_TIMEOUT_SECS", 60)?,
            poll_interval_secs: var_or("WORKER_POLL_INTERVAL_SECS", 5)?,
            base_backoff_secs: var_or("WORKER_BASE_BACKOFF_SECS", 5)?,
            send_timeout_secs: var_or("WORKER_SEND_TIMEOUT_SECS", 30)?,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("cannot parse {name}: {raw}"))),
        Err(_) => Ok(default),
    }
}
