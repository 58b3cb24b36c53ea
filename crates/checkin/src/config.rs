use std::{env, str::FromStr, time::Duration};

use checkin_core::event::TableNames;
use checkin_core::storage::{RetryPolicy, TableOptions};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Deployment environment, used as the table-name prefix (default: "dev")
    pub env: String,
    /// Custom DynamoDB endpoint, e.g. a local instance (default: unset)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Base URL QR code images are served from
    pub qr_base_url: String,
    /// Attempts per store call, including the first (default: 4)
    pub store_max_attempts: usize,
    /// First retry delay in milliseconds (default: 100)
    pub store_initial_delay_ms: u64,
    /// Retry delay cap in milliseconds (default: 2,000)
    pub store_max_delay_ms: u64,
    /// Concurrent chunk writes during bulk inserts (default: 4)
    pub bulk_parallelism: usize,
    /// Rounds spent resubmitting unprocessed bulk items (default: 5)
    pub bulk_max_rounds: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ENV` - Table-name prefix (default: "dev")
    /// - `AWS_ENDPOINT_URL` - Custom DynamoDB endpoint (default: unset)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `QR_BASE_URL` - QR image base URL (default: "https://dev-qr.s3.amazonaws.com")
    /// - `STORE_MAX_ATTEMPTS` - Attempts per store call (default: 4)
    /// - `STORE_INITIAL_DELAY_MS` - First backoff delay (default: 100)
    /// - `STORE_MAX_DELAY_MS` - Backoff cap (default: 2,000)
    /// - `BULK_PARALLELISM` - Concurrent bulk chunk writes (default: 4)
    /// - `BULK_MAX_ROUNDS` - Bulk retry rounds (default: 5)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            env: lookup("ENV").unwrap_or_else(|| "dev".to_string()),
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|url| !url.is_empty()),
            region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            qr_base_url: lookup("QR_BASE_URL")
                .unwrap_or_else(|| "https://dev-qr.s3.amazonaws.com".to_string()),
            store_max_attempts: parse(lookup("STORE_MAX_ATTEMPTS")).unwrap_or(4),
            store_initial_delay_ms: parse(lookup("STORE_INITIAL_DELAY_MS")).unwrap_or(100),
            store_max_delay_ms: parse(lookup("STORE_MAX_DELAY_MS")).unwrap_or(2_000),
            bulk_parallelism: parse(lookup("BULK_PARALLELISM")).unwrap_or(4),
            bulk_max_rounds: parse(lookup("BULK_MAX_ROUNDS")).unwrap_or(5),
        }
    }

    pub fn table_names(&self) -> TableNames {
        TableNames::for_env(&self.env)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.store_max_attempts,
            initial_delay: Duration::from_millis(self.store_initial_delay_ms),
            max_delay: Duration::from_millis(self.store_max_delay_ms),
        }
    }

    /// Options passed to every table client.
    pub fn table_options(&self) -> TableOptions {
        TableOptions::default()
            .with_retry(self.retry_policy())
            .with_parallelism(self.bulk_parallelism)
            .with_max_bulk_rounds(self.bulk_max_rounds)
    }

    /// Public URL of an event's QR code image.
    pub fn qr_url(&self, event_code: &str) -> String {
        format!("{}/{event_code}.png", self.qr_base_url.trim_end_matches('/'))
    }
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
