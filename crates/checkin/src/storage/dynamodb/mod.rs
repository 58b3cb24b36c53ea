//! DynamoDB storage backend.
//!
//! Provides a DynamoDB-based implementation of `StorageBackend` using
//! `aws-sdk-dynamodb`.

mod backend;
mod conversions;
mod error;

pub use backend::DynamoDbBackend;
