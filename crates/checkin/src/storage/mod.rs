//! Storage backend selection.
//!
//! The backend is selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `dynamodb` (default): AWS DynamoDB storage backend using `aws-sdk-dynamodb`
//! - `inmemory`: process-local storage from `checkin_core`, for local runs
//!
//! These features are mutually exclusive - only one storage backend can be
//! enabled at a time.
//!
//! Build with the in-memory backend:
//! ```bash
//! cargo build -p checkin --no-default-features --features inmemory
//! ```

#[cfg(all(feature = "dynamodb", feature = "inmemory"))]
compile_error!(
    "Features 'dynamodb' and 'inmemory' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "dynamodb", feature = "inmemory")))]
compile_error!(
    "No storage backend selected. Enable 'dynamodb' or 'inmemory' feature. \
    Example: cargo build -p checkin --features dynamodb"
);

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbBackend;

#[cfg(feature = "inmemory")]
pub use checkin_core::storage::MemoryStore;
