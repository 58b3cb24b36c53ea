use thiserror::Error;

/// Errors surfaced by a [`TableClient`](super::TableClient) to its callers.
///
/// `get` returning `None` is the normal "not found" outcome and never shows up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Caller misuse: wrong key shape, unknown field, kind mismatch.
    #[error("Schema error: {0}")]
    Schema(String),
    /// Merge-update against a key with no stored item.
    #[error("No item in {table} at {key}")]
    NotFound { table: String, key: String },
    /// Stored data does not fit the declared record shape.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Transient store failures persisted past the retry budget.
    #[error("Storage unavailable after {attempts} attempt(s) of {operation}: {message}")]
    StorageUnavailable {
        operation: &'static str,
        attempts: usize,
        message: String,
    },
    /// The store refused the request for a reason retrying will not fix.
    #[error("Request rejected by store: {0}")]
    Rejected(String),
}

impl TableError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Whether a caller could reasonably retry the whole call later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

/// Errors reported by a [`StorageBackend`](super::StorageBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Throttling, internal errors, timeouts. Safe to retry.
    #[error("Transient store failure: {0}")]
    Transient(String),
    /// Anything retrying will not fix (missing table, validation failure).
    #[error("Store failure: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Permanent(message) => message,
        }
    }
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let error = TableError::schema("unknown field: color");
        assert_eq!(error.to_string(), "Schema error: unknown field: color");
    }

    #[test]
    fn test_not_found_display() {
        let error = TableError::NotFound {
            table: "dev-event".to_string(),
            key: "(E1)".to_string(),
        };
        assert_eq!(error.to_string(), "No item in dev-event at (E1)");
    }

    #[test]
    fn test_storage_unavailable_display() {
        let error = TableError::StorageUnavailable {
            operation: "GetItem",
            attempts: 3,
            message: "throttled".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Storage unavailable after 3 attempt(s) of GetItem: throttled"
        );
    }

    #[test]
    fn test_only_storage_unavailable_is_retryable() {
        assert!(TableError::StorageUnavailable {
            operation: "PutItem",
            attempts: 1,
            message: String::new(),
        }
        .is_retryable());
        assert!(!TableError::schema("x").is_retryable());
        assert!(!TableError::decode("x").is_retryable());
        assert!(!TableError::Rejected("x".to_string()).is_retryable());
    }

    #[test]
    fn test_store_error_classification() {
        assert!(StoreError::Transient("slow down".to_string()).is_transient());
        assert!(!StoreError::Permanent("no table".to_string()).is_transient());
        assert_eq!(StoreError::Permanent("no table".to_string()).message(), "no table");
    }
}
