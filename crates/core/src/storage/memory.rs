//! In-memory storage backend.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::attribute::{AttributeValue, Item};
use super::error::StoreError;
use super::filter::FilterExpression;
use super::schema::{PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE};
use super::traits::{StorageBackend, StoreResult};
use super::update::Patch;

type Table = BTreeMap<(String, String), Item>;

/// Batch calls remembered by [`MemoryStore::batch_sizes`]; older ones are dropped.
const BATCH_HISTORY: usize = 256;

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    failures_pending: usize,
    deferred_pending: usize,
    rejected_partitions: HashSet<String>,
    batch_sizes: VecDeque<usize>,
}

impl State {
    fn record_batch(&mut self, size: usize) {
        if self.batch_sizes.len() == BATCH_HISTORY {
            self.batch_sizes.pop_front();
        }
        self.batch_sizes.push_back(size);
    }

    fn injected_failure(&mut self) -> StoreResult<()> {
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(StoreError::Transient("injected failure".to_string()));
        }
        Ok(())
    }
}

/// Storage backend keeping every table in process memory.
///
/// Uses a `BTreeMap` per table wrapped in `Arc<RwLock<_>>`, so queries come
/// back in key order and clones share the same data. Data is lost when the
/// last clone is dropped.
///
/// A few knobs inject store misbehaviour for tests: transient failures,
/// batch items left unprocessed once, and partitions a batch write never
/// accepts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` calls fail with a transient error.
    pub async fn fail_next(&self, count: usize) {
        self.state.write().await.failures_pending = count;
    }

    /// The next `count` items submitted through `batch_write` are returned
    /// as unprocessed instead of being stored.
    pub async fn defer_next(&self, count: usize) {
        self.state.write().await.deferred_pending = count;
    }

    /// Batch writes never accept items in `partition`.
    pub async fn reject_partition(&self, partition: impl Into<String>) {
        self.state
            .write()
            .await
            .rejected_partitions
            .insert(partition.into());
    }

    /// Sizes of the most recent `batch_write` calls, oldest first.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.state.read().await.batch_sizes.iter().copied().collect()
    }

    /// Number of items stored in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }

    /// Stores an item as-is, bypassing every check. Useful for seeding
    /// malformed data.
    pub async fn insert_raw(&self, table: &str, item: Item) -> StoreResult<()> {
        let key = item_key(&item)?;
        self.state
            .write()
            .await
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
        Ok(())
    }
}

fn string_attribute(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Some(value.clone()),
        _ => None,
    }
}

fn item_key(item: &Item) -> StoreResult<(String, String)> {
    let partition = string_attribute(item, PARTITION_KEY_ATTRIBUTE).ok_or_else(|| {
        StoreError::Permanent(format!("missing key attribute '{PARTITION_KEY_ATTRIBUTE}'"))
    })?;
    let sort = string_attribute(item, SORT_KEY_ATTRIBUTE).unwrap_or_default();
    Ok((partition, sort))
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn get_item(&self, table: &str, key: Item) -> StoreResult<Option<Item>> {
        let key = item_key(&key)?;
        let mut state = self.state.write().await;
        state.injected_failure()?;
        Ok(state.tables.get(table).and_then(|t| t.get(&key)).cloned())
    }

    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        let key = item_key(&item)?;
        let mut state = self.state.write().await;
        state.injected_failure()?;
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: Item,
        patch: &Patch,
    ) -> StoreResult<Option<Item>> {
        let key = item_key(&key)?;
        let mut state = self.state.write().await;
        state.injected_failure()?;

        let Some(item) = state.tables.get_mut(table).and_then(|t| t.get_mut(&key)) else {
            return Ok(None);
        };
        for (attribute, value) in patch.set_attributes() {
            item.insert(attribute.to_string(), value.clone());
        }
        for (attribute, value) in patch.appended_attributes() {
            let additions = value.as_l().unwrap_or_default();
            match item.get_mut(*attribute) {
                Some(AttributeValue::L(existing)) => existing.extend_from_slice(additions),
                Some(other) => {
                    return Err(StoreError::Permanent(format!(
                        "cannot append to {} attribute '{attribute}'",
                        other.type_name()
                    )));
                }
                None => {
                    item.insert(attribute.to_string(), AttributeValue::L(additions.to_vec()));
                }
            }
        }
        for attribute in patch.removed_attributes() {
            item.remove(*attribute);
        }
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, table: &str, key: Item) -> StoreResult<()> {
        let key = item_key(&key)?;
        let mut state = self.state.write().await;
        state.injected_failure()?;
        if let Some(t) = state.tables.get_mut(table) {
            t.remove(&key);
        }
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        _filter: Option<&FilterExpression>,
    ) -> StoreResult<Vec<Item>> {
        let mut state = self.state.write().await;
        state.injected_failure()?;
        Ok(state
            .tables
            .get(table)
            .map(|t| {
                t.iter()
                    .filter(|((p, _), _)| p == partition)
                    .map(|(_, item)| item.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn batch_write(&self, table: &str, items: Vec<Item>) -> StoreResult<Vec<Item>> {
        let mut state = self.state.write().await;
        state.record_batch(items.len());
        state.injected_failure()?;

        let mut unprocessed = Vec::new();
        for item in items {
            let key = item_key(&item)?;
            if state.rejected_partitions.contains(&key.0) {
                unprocessed.push(item);
                continue;
            }
            if state.deferred_pending > 0 {
                state.deferred_pending -= 1;
                unprocessed.push(item);
                continue;
            }
            state
                .tables
                .entry(table.to_string())
                .or_default()
                .insert(key, item);
        }
        Ok(unprocessed)
    }
}
