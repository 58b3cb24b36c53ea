//! Typed access to a two-part-key store.
//!
//! A [`TableClient`] binds one [`Record`] type to one table on a
//! [`StorageBackend`] and owns key derivation, serialization, filtering, and
//! retries.

mod attribute;
mod bulk;
mod client;
mod error;
mod filter;
pub mod keys;
mod memory;
mod record;
mod retry;
mod schema;
mod traits;
mod update;

pub use attribute::{AttributeValue, Item};
pub use bulk::BulkResult;
pub use client::{TableClient, TableOptions};
pub use error::{Result, StoreError, TableError};
pub use filter::{Condition, FilterBuilder, FilterExpression, Operator, RenderedFilter};
pub use keys::Key;
pub use memory::MemoryStore;
pub use record::{
    from_storage, to_storage, FieldReader, FieldWriter, FromAttribute, Record, ToAttribute,
};
pub use retry::RetryPolicy;
pub use schema::{
    FieldDef, FieldKind, KeyRole, SchemaDescriptor, PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE,
};
pub use traits::{StorageBackend, StoreResult, MAX_BATCH_WRITE_ITEMS};
pub use update::{Patch, PatchBuilder};
