//! Table Client: typed access to one table.

use std::marker::PhantomData;
use std::sync::Arc;

use super::error::{Result, TableError};
use super::filter::{FilterBuilder, FilterExpression};
use super::keys::{self, Key};
use super::record::{self, Record};
use super::retry::RetryPolicy;
use super::schema::SchemaDescriptor;
use super::traits::{StorageBackend, MAX_BATCH_WRITE_ITEMS};
use super::update::{Patch, PatchBuilder};

/// Tuning knobs for a [`TableClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Retry policy for every store call.
    pub retry: RetryPolicy,
    /// Records per batched write. Clamped to what the backend accepts.
    pub batch_size: usize,
    /// Chunks of a bulk insert written concurrently.
    pub parallelism: usize,
    /// Batched-write rounds per chunk before leftovers are reported unwritten.
    pub max_bulk_rounds: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            batch_size: MAX_BATCH_WRITE_ITEMS,
            parallelism: 4,
            max_bulk_rounds: 5,
        }
    }
}

impl TableOptions {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_max_bulk_rounds(mut self, rounds: usize) -> Self {
        self.max_bulk_rounds = rounds;
        self
    }
}

/// Typed get/put/update/delete/query/bulk-insert over one table.
///
/// Bound at construction to one record type and its [`SchemaDescriptor`].
/// Callers pass and receive records only; key derivation, attribute naming,
/// and retries stay inside. The client holds no state beyond the shared
/// backend handle, so clones are cheap and calls may run concurrently.
pub struct TableClient<R> {
    pub(super) backend: Arc<dyn StorageBackend>,
    pub(super) schema: Arc<SchemaDescriptor>,
    pub(super) options: TableOptions,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for TableClient<R> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            schema: Arc::clone(&self.schema),
            options: self.options,
            _record: PhantomData,
        }
    }
}

impl<R: Record> TableClient<R> {
    /// Binds `R` to `table_name` on `backend` with default options.
    ///
    /// Fails with [`TableError::Schema`] if `R`'s field table is invalid.
    pub fn new(backend: Arc<dyn StorageBackend>, table_name: impl Into<String>) -> Result<Self> {
        let schema = SchemaDescriptor::for_record::<R>(table_name)?;
        Ok(Self {
            backend,
            schema: Arc::new(schema),
            options: TableOptions::default(),
            _record: PhantomData,
        })
    }

    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    /// Starts a filter for [`query`](Self::query) on this table.
    pub fn filter(&self) -> FilterBuilder<'_> {
        FilterBuilder::new(&self.schema)
    }

    /// Starts a patch for [`update`](Self::update) on this table.
    pub fn patch(&self) -> PatchBuilder<'_> {
        PatchBuilder::new(&self.schema)
    }

    pub fn key_of(&self, record: &R) -> Result<Key> {
        keys::encode(&self.schema, record)
    }

    /// Point read. `Ok(None)` when nothing is stored at the key.
    ///
    /// `sort` must be given exactly when the table has a sort key.
    pub async fn get(&self, partition: &str, sort: Option<&str>) -> Result<Option<R>> {
        let key = keys::from_parts(&self.schema, partition, sort)?;
        let table = self.table_name();
        tracing::debug!(table, operation = "GetItem", %key, "Store call");

        let item = self
            .options
            .retry
            .run(table, "GetItem", || {
                self.backend.get_item(table, keys::to_item(&key))
            })
            .await?;

        let Some(item) = item else {
            return Ok(None);
        };

        let stored = keys::decode(&self.schema, &item)?;
        if stored != key {
            return Err(TableError::decode(format!(
                "{table}: read {key} but the store returned {stored}"
            )));
        }
        record::from_storage(&self.schema, &item).map(Some)
    }

    /// Upsert. Replaces whatever is stored at the record's key and hands the
    /// record back unchanged.
    pub async fn put(&self, record: R) -> Result<R> {
        let item = record::to_storage(&self.schema, &record)?;
        let table = self.table_name();
        tracing::debug!(table, operation = "PutItem", "Store call");

        self.options
            .retry
            .run(table, "PutItem", || self.backend.put_item(table, item.clone()))
            .await?;
        Ok(record)
    }

    /// Merges `patch` into the stored item and returns the full result.
    ///
    /// Fails with [`TableError::NotFound`] when nothing is stored at the key;
    /// nothing is created in that case.
    pub async fn update(&self, partition: &str, sort: Option<&str>, patch: &Patch) -> Result<R> {
        let table = self.table_name();
        if patch.table_name() != table {
            return Err(TableError::schema(format!(
                "{table}: patch was built for table '{}'",
                patch.table_name()
            )));
        }
        let key = keys::from_parts(&self.schema, partition, sort)?;
        tracing::debug!(table, operation = "UpdateItem", %key, "Store call");

        let item = self
            .options
            .retry
            .run(table, "UpdateItem", || {
                self.backend.update_item(table, keys::to_item(&key), patch)
            })
            .await?;

        match item {
            Some(item) => record::from_storage(&self.schema, &item),
            None => Err(TableError::NotFound {
                table: table.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Removes the item at the key. Removing a missing item is not an error.
    pub async fn delete(&self, partition: &str, sort: Option<&str>) -> Result<()> {
        let key = keys::from_parts(&self.schema, partition, sort)?;
        let table = self.table_name();
        tracing::debug!(table, operation = "DeleteItem", %key, "Store call");

        self.options
            .retry
            .run(table, "DeleteItem", || {
                self.backend.delete_item(table, keys::to_item(&key))
            })
            .await
    }

    /// Every record in `partition` matching `filter`, in the store's key order.
    ///
    /// The filter is pushed down to backends that evaluate filters themselves
    /// and applied here otherwise.
    pub async fn query(&self, partition: &str, filter: Option<&FilterExpression>) -> Result<Vec<R>> {
        let table = self.table_name();
        if partition.is_empty() {
            return Err(TableError::schema(format!(
                "{table}: partition key '{}' must not be empty",
                self.schema.partition_field().name
            )));
        }
        if let Some(filter) = filter {
            if filter.table_name() != table {
                return Err(TableError::schema(format!(
                    "{table}: filter was built for table '{}'",
                    filter.table_name()
                )));
            }
        }

        let server_side = self.backend.filters_server_side();
        let pushed = filter.filter(|_| server_side);
        tracing::debug!(table, operation = "Query", partition, server_side, "Store call");

        let items = self
            .options
            .retry
            .run(table, "Query", || self.backend.query(table, partition, pushed))
            .await?;

        let mut records = Vec::with_capacity(items.len());
        for item in &items {
            let key = keys::decode(&self.schema, item)?;
            if key.partition != partition {
                return Err(TableError::decode(format!(
                    "{table}: query for partition '{partition}' returned {key}"
                )));
            }
            if let Some(filter) = filter {
                if !server_side && !filter.matches(item) {
                    continue;
                }
            }
            records.push(record::from_storage(&self.schema, item)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::attribute::AttributeValue;
    use crate::storage::memory::MemoryStore;
    use crate::storage::record::{FieldReader, FieldWriter};
    use crate::storage::schema::{FieldDef, FieldKind};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Attendee {
        pub event_code: String,
        pub phone: String,
        pub name: Option<String>,
        pub event_version: String,
    }

    impl Record for Attendee {
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::partition("event_code"),
            FieldDef::sort("phone"),
            FieldDef::optional("name", FieldKind::String),
            FieldDef::required("event_version", FieldKind::String),
        ];

        fn write_fields(&self, fields: &mut FieldWriter) {
            fields
                .set("event_code", &self.event_code)
                .set("phone", &self.phone)
                .set_optional("name", self.name.as_ref())
                .set("event_version", &self.event_version);
        }

        fn read_fields(fields: &FieldReader<'_>) -> Result<Self> {
            Ok(Self {
                event_code: fields.required("event_code")?,
                phone: fields.required("phone")?,
                name: fields.optional("name")?,
                event_version: fields.required("event_version")?,
            })
        }
    }

    pub(crate) fn attendee(event_code: &str, phone: &str, name: &str, version: &str) -> Attendee {
        Attendee {
            event_code: event_code.to_string(),
            phone: phone.to_string(),
            name: Some(name.to_string()),
            event_version: version.to_string(),
        }
    }

    pub(crate) fn client(store: &MemoryStore) -> TableClient<Attendee> {
        TableClient::new(Arc::new(store.clone()), "dev-attendee")
            .unwrap()
            .with_options(TableOptions::default().with_retry(RetryPolicy::fast(3)))
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryStore::new();
        let client = client(&store);
        let record = attendee("E1", "010", "A", "v1");

        let written = client.put(record.clone()).await.unwrap();
        assert_eq!(written, record);

        let read = client.get("E1", Some("010")).await.unwrap();
        assert_eq!(read, Some(record));
    }

    #[tokio::test]
    async fn test_put_is_upsert() {
        let store = MemoryStore::new();
        let client = client(&store);
        let record = attendee("E1", "010", "A", "v1");

        client.put(record.clone()).await.unwrap();
        client.put(record.clone()).await.unwrap();
        assert_eq!(store.len("dev-attendee").await, 1);

        let renamed = attendee("E1", "010", "B", "v1");
        client.put(renamed.clone()).await.unwrap();
        assert_eq!(store.len("dev-attendee").await, 1);
        assert_eq!(client.get("E1", Some("010")).await.unwrap(), Some(renamed));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(client(&store).get("E1", Some("010")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_requires_sort_key() {
        let store = MemoryStore::new();
        let err = client(&store).get("E1", None).await.unwrap_err();
        assert!(matches!(err, TableError::Schema(_)));
    }

    #[tokio::test]
    async fn test_put_rejects_empty_partition() {
        let store = MemoryStore::new();
        let err = client(&store)
            .put(attendee("", "010", "A", "v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::Schema(_)));
        assert!(store.is_empty("dev-attendee").await);
    }

    #[tokio::test]
    async fn test_update_preserves_untouched_fields() {
        let store = MemoryStore::new();
        let client = client(&store);
        let record = attendee("E1", "010", "A", "v1");
        client.put(record.clone()).await.unwrap();

        let patch = client.patch().set("event_version", "v2").build().unwrap();
        let updated = client.update("E1", Some("010"), &patch).await.unwrap();

        let expected = Attendee {
            event_version: "v2".to_string(),
            ..record
        };
        assert_eq!(updated, expected);
        assert_eq!(client.get("E1", Some("010")).await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn test_update_can_clear_optional_field() {
        let store = MemoryStore::new();
        let client = client(&store);
        client.put(attendee("E1", "010", "A", "v1")).await.unwrap();

        let patch = client.patch().clear("name").build().unwrap();
        let updated = client.update("E1", Some("010"), &patch).await.unwrap();
        assert_eq!(updated.name, None);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let client = client(&store);
        let patch = client.patch().set("name", "A").build().unwrap();

        let err = client.update("E1", Some("010"), &patch).await.unwrap_err();
        assert_eq!(
            err,
            TableError::NotFound {
                table: "dev-attendee".to_string(),
                key: "(E1, 010)".to_string(),
            }
        );
        assert!(store.is_empty("dev-attendee").await);
    }

    #[tokio::test]
    async fn test_update_rejects_patch_for_other_table() {
        let store = MemoryStore::new();
        let client = client(&store);
        let other = TableClient::<Attendee>::new(Arc::new(store.clone()), "prod-attendee").unwrap();
        let patch = other.patch().set("name", "A").build().unwrap();

        let err = client.update("E1", Some("010"), &patch).await.unwrap_err();
        assert!(matches!(err, TableError::Schema(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let store = MemoryStore::new();
        let client = client(&store);
        client.put(attendee("E1", "010", "A", "v1")).await.unwrap();

        client.delete("E1", Some("010")).await.unwrap();
        assert_eq!(client.get("E1", Some("010")).await.unwrap(), None);

        // Deleting an absent key is fine too.
        client.delete("E1", Some("010")).await.unwrap();
        client.delete("E9", Some("999")).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_is_scoped_and_filtered() {
        let store = MemoryStore::new();
        let client = client(&store);
        client.put(attendee("E1", "011", "B", "v2")).await.unwrap();
        client.put(attendee("E1", "010", "A", "v1")).await.unwrap();
        client.put(attendee("E1", "012", "C", "v1")).await.unwrap();
        client.put(attendee("E2", "010", "D", "v1")).await.unwrap();

        let all = client.query("E1", None).await.unwrap();
        let phones: Vec<_> = all.iter().map(|a| a.phone.as_str()).collect();
        assert_eq!(phones, vec!["010", "011", "012"]);

        let filter = client.filter().eq("event_version", "v1").build().unwrap();
        let v1 = client.query("E1", Some(&filter)).await.unwrap();
        assert_eq!(v1.len(), 2);
        assert!(v1.iter().all(|a| a.event_code == "E1" && a.event_version == "v1"));
    }

    #[tokio::test]
    async fn test_query_rejects_filter_for_other_table() {
        let store = MemoryStore::new();
        let client = client(&store);
        let other = TableClient::<Attendee>::new(Arc::new(store.clone()), "prod-attendee").unwrap();
        let filter = other.filter().eq("event_version", "v1").build().unwrap();

        assert!(matches!(
            client.query("E1", Some(&filter)).await,
            Err(TableError::Schema(_))
        ));
        assert!(matches!(
            client.query("", None).await,
            Err(TableError::Schema(_))
        ));
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let store = MemoryStore::new();
        let client = client(&store);
        let record = Attendee {
            event_code: "E1".to_string(),
            phone: "010".to_string(),
            name: Some("A".to_string()),
            event_version: "v1".to_string(),
        };
        client.put(record.clone()).await.unwrap();
        client.put(attendee("E1", "011", "B", "v0")).await.unwrap();

        assert_eq!(client.get("E1", Some("010")).await.unwrap(), Some(record.clone()));

        let filter = client
            .filter()
            .condition_named("event_version", "eq", "v1")
            .build()
            .unwrap();
        assert_eq!(client.query("E1", Some(&filter)).await.unwrap(), vec![record]);

        client.delete("E1", Some("010")).await.unwrap();
        assert_eq!(client.get("E1", Some("010")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = MemoryStore::new();
        let client = client(&store);
        store.fail_next(2).await;

        client.put(attendee("E1", "010", "A", "v1")).await.unwrap();
        assert_eq!(store.len("dev-attendee").await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_storage_unavailable() {
        let store = MemoryStore::new();
        let client = client(&store);
        store.fail_next(3).await;

        let err = client.get("E1", Some("010")).await.unwrap_err();
        assert!(matches!(
            err,
            TableError::StorageUnavailable {
                operation: "GetItem",
                attempts: 3,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_zero_retry_policy_fails_fast() {
        let store = MemoryStore::new();
        let client = client(&store).with_options(TableOptions::default().with_retry(RetryPolicy::none()));
        store.fail_next(1).await;

        assert!(client.delete("E1", Some("010")).await.is_err());
        assert!(client.delete("E1", Some("010")).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_stored_item_is_decode_error() {
        let store = MemoryStore::new();
        let client = client(&store);
        let mut item = keys::to_item(&Key::new("E1", Some("010")));
        item.insert("event_version".to_string(), AttributeValue::from(2i64));
        store.insert_raw("dev-attendee", item).await.unwrap();

        assert!(matches!(
            client.get("E1", Some("010")).await,
            Err(TableError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_the_backend() {
        let store = MemoryStore::new();
        let client = client(&store);
        let copy = client.clone();
        client.put(attendee("E1", "010", "A", "v1")).await.unwrap();
        assert!(copy.get("E1", Some("010")).await.unwrap().is_some());
    }
}
