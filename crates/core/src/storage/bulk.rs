//! Chunked, concurrent bulk insert with retry of unprocessed items.

use std::collections::{HashMap, HashSet};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use super::attribute::Item;
use super::client::TableClient;
use super::error::{Result, StoreError};
use super::keys::{self, Key};
use super::record::{self, Record};

/// Outcome of [`TableClient::bulk_insert`].
///
/// Partial failure is reported here, never raised: every input record is
/// either counted in `written`, returned in `unwritten`, or counted in
/// `superseded`.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResult<R> {
    /// Records the store accepted.
    pub written: usize,
    /// Records still unwritten when retries ran out or the insert was cancelled.
    pub unwritten: Vec<R>,
    /// Input records dropped because a later record had the same key.
    pub superseded: usize,
    /// Whether cancellation left work undone.
    pub cancelled: bool,
}

impl<R> BulkResult<R> {
    pub fn is_complete(&self) -> bool {
        self.unwritten.is_empty() && !self.cancelled
    }
}

struct Pending<R> {
    key: Key,
    item: Item,
    record: R,
}

struct ChunkOutcome<R> {
    written: usize,
    unwritten: Vec<R>,
    cancelled: bool,
}

impl<R: Record> TableClient<R> {
    /// Writes `records` in batched chunks.
    ///
    /// Every record is encoded before anything is written, so a record that
    /// does not fit the schema fails the whole call with no side effects.
    /// Records sharing a key collapse to the last one. Chunks are written
    /// concurrently up to [`TableOptions::parallelism`](super::TableOptions);
    /// items the store leaves unprocessed are resubmitted with backoff for up
    /// to [`TableOptions::max_bulk_rounds`](super::TableOptions) rounds.
    pub async fn bulk_insert(&self, records: Vec<R>) -> Result<BulkResult<R>> {
        self.bulk_insert_with_cancel(records, &CancellationToken::new())
            .await
    }

    /// Like [`bulk_insert`](Self::bulk_insert), but stops dispatching chunks
    /// once `cancel` fires.
    ///
    /// Chunks already accepted by the store stay written; everything not yet
    /// written is returned in [`BulkResult::unwritten`].
    pub async fn bulk_insert_with_cancel(
        &self,
        records: Vec<R>,
        cancel: &CancellationToken,
    ) -> Result<BulkResult<R>> {
        let table = self.table_name();
        let total = records.len();

        let mut pending: Vec<Pending<R>> = Vec::with_capacity(total);
        let mut positions: HashMap<Key, usize> = HashMap::new();
        let mut superseded = 0;
        for record in records {
            let item = record::to_storage(&self.schema, &record)?;
            let key = keys::decode(&self.schema, &item)?;
            // The store rejects a batch holding the same key twice.
            match positions.get(&key) {
                Some(&index) => {
                    pending[index] = Pending { key, item, record };
                    superseded += 1;
                }
                None => {
                    positions.insert(key.clone(), pending.len());
                    pending.push(Pending { key, item, record });
                }
            }
        }

        let chunk_size = self
            .options
            .batch_size
            .min(self.backend.max_batch_size())
            .max(1);
        let mut chunks = Vec::new();
        let mut rest = pending.into_iter().peekable();
        while rest.peek().is_some() {
            chunks.push(rest.by_ref().take(chunk_size).collect::<Vec<_>>());
        }
        tracing::debug!(table, total, chunks = chunks.len(), chunk_size, "Bulk insert");

        let parallelism = self.options.parallelism.max(1);
        let mut queue = chunks.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut result = BulkResult {
            written: 0,
            unwritten: Vec::new(),
            superseded,
            cancelled: false,
        };

        loop {
            while in_flight.len() < parallelism && !cancel.is_cancelled() {
                match queue.next() {
                    Some((index, chunk)) => in_flight.push(self.write_chunk(index, chunk, cancel)),
                    None => break,
                }
            }
            match in_flight.next().await {
                Some(outcome) => {
                    result.written += outcome.written;
                    result.unwritten.extend(outcome.unwritten);
                    result.cancelled |= outcome.cancelled;
                }
                None => break,
            }
        }

        for (_, chunk) in queue {
            result.cancelled = true;
            result.unwritten.extend(chunk.into_iter().map(|p| p.record));
        }

        if !result.unwritten.is_empty() {
            tracing::warn!(
                table,
                unwritten = result.unwritten.len(),
                cancelled = result.cancelled,
                "Bulk insert left records unwritten"
            );
        }
        tracing::info!(
            table,
            total,
            written = result.written,
            unwritten = result.unwritten.len(),
            superseded = result.superseded,
            "Bulk insert finished"
        );
        Ok(result)
    }

    async fn write_chunk(
        &self,
        chunk: usize,
        records: Vec<Pending<R>>,
        cancel: &CancellationToken,
    ) -> ChunkOutcome<R> {
        let table = self.table_name();
        let max_rounds = self.options.max_bulk_rounds.max(1);
        let mut remaining = records;
        let mut written = 0;
        let mut cancelled = false;
        let mut round = 0;

        loop {
            let items: Vec<Item> = remaining.iter().map(|p| p.item.clone()).collect();
            match self.backend.batch_write(table, items).await {
                Ok(unprocessed) => {
                    let submitted = remaining.len();
                    remaining = self.unprocessed(remaining, &unprocessed);
                    written += submitted - remaining.len();
                }
                Err(StoreError::Transient(message)) => {
                    tracing::warn!(table, chunk, round, %message, "Batch write failed");
                }
                Err(StoreError::Permanent(message)) => {
                    tracing::warn!(table, chunk, round, %message, "Batch write rejected");
                    break;
                }
            }

            round += 1;
            if remaining.is_empty() || round >= max_rounds {
                break;
            }

            let delay = self.options.retry.delay_for(round - 1);
            tracing::debug!(
                table,
                chunk,
                round,
                unprocessed = remaining.len(),
                delay_ms = delay.as_millis() as u64,
                "Retrying unprocessed items"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        ChunkOutcome {
            written,
            unwritten: remaining.into_iter().map(|p| p.record).collect(),
            cancelled,
        }
    }

    /// Narrows `remaining` to the entries the store handed back.
    ///
    /// If any returned item has an unreadable key, everything is resubmitted;
    /// rewriting an accepted item is a harmless upsert.
    fn unprocessed(&self, remaining: Vec<Pending<R>>, unprocessed: &[Item]) -> Vec<Pending<R>> {
        if unprocessed.is_empty() {
            return Vec::new();
        }
        let keys: Option<HashSet<Key>> = unprocessed
            .iter()
            .map(|item| keys::decode(&self.schema, item).ok())
            .collect();
        match keys {
            Some(keys) => remaining
                .into_iter()
                .filter(|p| keys.contains(&p.key))
                .collect(),
            None => remaining,
        }
    }
}
