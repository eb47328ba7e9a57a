//! Partition-store collaborator traits
//!
//! The engine never owns stored data; it reads through these traits. A real
//! deployment backs them with the columnar store, the in-memory
//! [`MemoryStore`](crate::store::MemoryStore) backs them for tests and
//! embedders.
//!
//! Of the whole `PartitionStore` surface the query engine itself only calls
//! `scan_partitions`; `setup`/`ingest`/`scan_splits` belong to the write
//! path and the query planner sitting in front of the engine.

use crate::store::error::StoreResult;
use crate::store::types::{DatasetRef, Record, Sample, ScanSplit, Schema, ShardId, TimeRange};
use async_trait::async_trait;
use std::sync::Arc;

/// Lazy sequence of samples decoded from one partition column
pub type SampleIter<'a> = Box<dyn Iterator<Item = Sample> + Send + 'a>;

/// Lazy, finite sequence of partitions yielded by a scan split
pub type PartitionIter = Box<dyn Iterator<Item = StoreResult<Arc<dyn Partition>>> + Send>;

/// Opaque handle to one series' stored samples for a scan's time range
///
/// Implementations expose named column readers; decode format is theirs.
/// `read_values` yields samples in ascending timestamp order, and reading
/// the schema's time column yields `(timestamp, timestamp as f64)` pairs.
pub trait Partition: Send + Sync {
    /// Key of the series this partition holds
    fn series_key(&self) -> &str;

    /// Decode one column into a lazy sample sequence
    fn read_values(&self, column: &str) -> StoreResult<SampleIter<'_>>;
}

/// The store the engine scans partitions from
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Register a dataset schema for a shard
    async fn setup(&self, schema: &Schema, shard: ShardId) -> StoreResult<()>;

    /// Write records into a shard (write path, out of the engine's scope)
    async fn ingest(
        &self,
        dataset: &DatasetRef,
        shard: ShardId,
        records: Vec<Record>,
    ) -> StoreResult<()>;

    /// Plan scan splits over a shard for the desired parallelism
    async fn scan_splits(
        &self,
        dataset: &DatasetRef,
        shard: ShardId,
        range: TimeRange,
        desired_parallelism: usize,
    ) -> StoreResult<Vec<ScanSplit>>;

    /// Open the lazy partition sequence for one split
    ///
    /// The iterator is pulled by the engine with backpressure: the next
    /// partition is only requested once a worker slot is free.
    fn scan_partitions(&self, split: &ScanSplit) -> StoreResult<PartitionIter>;
}
