use async_trait::async_trait;

use super::attribute::Item;
use super::error::StoreError;
use super::filter::FilterExpression;
use super::update::Patch;

/// Largest batch the store accepts in one write call.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Result type for raw store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Raw item access against a key-value store.
///
/// Implementations speak in physical items and never retry on their own;
/// classifying failures as transient or permanent is their whole job.
/// [`TableClient`](super::TableClient) layers typing, validation, and retries on top.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetches the item at `key`, or `None`.
    async fn get_item(&self, table: &str, key: Item) -> StoreResult<Option<Item>>;

    /// Writes `item`, replacing any item with the same key.
    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()>;

    /// Applies `patch` to the item at `key` if one exists.
    ///
    /// Returns the full item after the update, or `None` when nothing was
    /// stored at `key`. Nothing is created in that case.
    async fn update_item(&self, table: &str, key: Item, patch: &Patch)
        -> StoreResult<Option<Item>>;

    /// Removes the item at `key`. Removing a missing item succeeds.
    async fn delete_item(&self, table: &str, key: Item) -> StoreResult<()>;

    /// Every item in `partition`, in sort-key order.
    ///
    /// Backends that report [`filters_server_side`](Self::filters_server_side)
    /// must apply `filter`; others may ignore it.
    async fn query(
        &self,
        table: &str,
        partition: &str,
        filter: Option<&FilterExpression>,
    ) -> StoreResult<Vec<Item>>;

    /// Writes up to [`max_batch_size`](Self::max_batch_size) items.
    ///
    /// Returns the items the store did not process; they may be resubmitted.
    async fn batch_write(&self, table: &str, items: Vec<Item>) -> StoreResult<Vec<Item>>;

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_WRITE_ITEMS
    }

    /// Whether [`query`](Self::query) evaluates filters itself.
    fn filters_server_side(&self) -> bool {
        false
    }
}
