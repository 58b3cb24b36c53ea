//! Error types for DynamoDB operations.

use checkin_core::storage::TableError;
use thiserror::Error;

/// Result type alias for dynamodb module.
pub type Result<T> = std::result::Result<T, DynamodbError>;

/// Errors that can occur during DynamoDB operations.
#[derive(Error, Debug)]
pub enum DynamodbError {
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Invalid record schema: {0}")]
    Schema(#[from] TableError),

    #[error("Table '{table_name}' exists with key schema {actual}; expected {expected}")]
    KeySchemaConflict {
        table_name: String,
        expected: String,
        actual: String,
    },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Timeout waiting for table '{table_name}' to become active")]
    TableActivationTimeout { table_name: String },
}
