//! In-memory partition store
//!
//! Reference implementation of the store collaborator traits: one sorted
//! row map per series, range-filtered reads, contiguous split planning.
//! Tests and embedders run against it; store adapters mirror its behavior
//! against the real columnar files.

use crate::store::error::{StoreError, StoreResult};
use crate::store::partition::{Partition, PartitionIter, PartitionStore, SampleIter};
use crate::store::types::{DatasetRef, Record, Sample, ScanSplit, Schema, ShardId, TimeRange};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Rows of one series, keyed by timestamp
type SeriesRows = BTreeMap<i64, HashMap<String, f64>>;

/// All state held for one (dataset, shard) pair
#[derive(Debug, Clone)]
struct ShardData {
    schema: Schema,
    series: BTreeMap<String, SeriesRows>,
}

/// One series' samples materialized for a scan's time range
#[derive(Debug, Clone)]
pub struct MemoryPartition {
    series: String,
    time_column: String,
    value_columns: Vec<String>,
    /// Rows within the scan range, ascending by timestamp
    rows: Vec<(i64, HashMap<String, f64>)>,
}

impl MemoryPartition {
    /// Build a partition from raw rows (sorted here, callers need not bother)
    pub fn from_rows(
        series: impl Into<String>,
        time_column: impl Into<String>,
        value_columns: Vec<String>,
        mut rows: Vec<(i64, HashMap<String, f64>)>,
    ) -> Self {
        rows.sort_by_key(|(timestamp, _)| *timestamp);
        Self {
            series: series.into(),
            time_column: time_column.into(),
            value_columns,
            rows,
        }
    }

    /// Number of rows held by this partition
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the partition holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Partition for MemoryPartition {
    fn series_key(&self) -> &str {
        &self.series
    }

    fn read_values(&self, column: &str) -> StoreResult<SampleIter<'_>> {
        if column == self.time_column {
            return Ok(Box::new(
                self.rows
                    .iter()
                    .map(|(timestamp, _)| Sample::new(*timestamp, *timestamp as f64)),
            ));
        }

        if !self.value_columns.iter().any(|c| c == column) {
            return Err(StoreError::ColumnNotFound(column.to_string()));
        }

        let column = column.to_string();
        // Rows without the column are sparse, not corrupt; skip them.
        Ok(Box::new(self.rows.iter().filter_map(move |(timestamp, values)| {
            values.get(&column).map(|value| Sample::new(*timestamp, *value))
        })))
    }
}

/// In-memory implementation of [`PartitionStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    shards: Arc<RwLock<HashMap<(DatasetRef, ShardId), ShardData>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of series stored for a shard (0 if the shard is unknown)
    pub fn series_count(&self, dataset: &DatasetRef, shard: ShardId) -> usize {
        self.shards
            .read()
            .map(|shards| {
                shards
                    .get(&(dataset.clone(), shard))
                    .map(|data| data.series.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl PartitionStore for MemoryStore {
    async fn setup(&self, schema: &Schema, shard: ShardId) -> StoreResult<()> {
        let mut shards = self
            .shards
            .write()
            .map_err(|_| StoreError::Lock("store lock poisoned".to_string()))?;

        shards
            .entry((schema.dataset.clone(), shard))
            .or_insert_with(|| ShardData {
                schema: schema.clone(),
                series: BTreeMap::new(),
            });

        tracing::debug!(dataset = %schema.dataset, shard = %shard, "shard set up");
        Ok(())
    }

    async fn ingest(
        &self,
        dataset: &DatasetRef,
        shard: ShardId,
        records: Vec<Record>,
    ) -> StoreResult<()> {
        let mut shards = self
            .shards
            .write()
            .map_err(|_| StoreError::Lock("store lock poisoned".to_string()))?;

        let data = shards
            .get_mut(&(dataset.clone(), shard))
            .ok_or_else(|| StoreError::ShardNotFound {
                dataset: dataset.clone(),
                shard,
            })?;

        let count = records.len();
        for record in records {
            for column in record.values.keys() {
                if !data.schema.value_columns.iter().any(|c| c == column) {
                    return Err(StoreError::ColumnNotFound(column.clone()));
                }
            }
            let rows = data.series.entry(record.series).or_default();
            rows.entry(record.timestamp).or_default().extend(record.values);
        }

        tracing::debug!(dataset = %dataset, shard = %shard, records = count, "records ingested");
        Ok(())
    }

    async fn scan_splits(
        &self,
        dataset: &DatasetRef,
        shard: ShardId,
        range: TimeRange,
        desired_parallelism: usize,
    ) -> StoreResult<Vec<ScanSplit>> {
        let shards = self
            .shards
            .read()
            .map_err(|_| StoreError::Lock("store lock poisoned".to_string()))?;

        let data = shards
            .get(&(dataset.clone(), shard))
            .ok_or_else(|| StoreError::ShardNotFound {
                dataset: dataset.clone(),
                shard,
            })?;

        // BTreeMap keys come out sorted, so splits are contiguous key ranges.
        let keys: Vec<String> = data.series.keys().cloned().collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let parallelism = desired_parallelism.max(1);
        let chunk_size = keys.len().div_ceil(parallelism);
        Ok(keys
            .chunks(chunk_size)
            .map(|chunk| ScanSplit::new(dataset.clone(), shard, chunk.to_vec(), range))
            .collect())
    }

    fn scan_partitions(&self, split: &ScanSplit) -> StoreResult<PartitionIter> {
        {
            let shards = self
                .shards
                .read()
                .map_err(|_| StoreError::Lock("store lock poisoned".to_string()))?;
            if !shards.contains_key(&(split.dataset.clone(), split.shard)) {
                return Err(StoreError::ShardNotFound {
                    dataset: split.dataset.clone(),
                    shard: split.shard,
                });
            }
        }

        let shards = Arc::clone(&self.shards);
        let split = split.clone();
        let mut index = 0usize;

        // Lazy pull: each partition is materialized only when the engine
        // asks for it, under a fresh read lock.
        Ok(Box::new(std::iter::from_fn(move || loop {
            let key = split.series.get(index)?.clone();
            index += 1;

            let guard = match shards.read() {
                Ok(guard) => guard,
                Err(_) => return Some(Err(StoreError::Lock("store lock poisoned".to_string()))),
            };
            let data = match guard.get(&(split.dataset.clone(), split.shard)) {
                Some(data) => data,
                None => {
                    return Some(Err(StoreError::ShardNotFound {
                        dataset: split.dataset.clone(),
                        shard: split.shard,
                    }))
                }
            };

            match data.series.get(&key) {
                Some(rows) => {
                    let rows: Vec<(i64, HashMap<String, f64>)> = rows
                        .range(split.range.start..split.range.end)
                        .map(|(timestamp, values)| (*timestamp, values.clone()))
                        .collect();
                    let partition = MemoryPartition::from_rows(
                        key,
                        data.schema.time_column.clone(),
                        data.schema.value_columns.clone(),
                        rows,
                    );
                    return Some(Ok(Arc::new(partition) as Arc<dyn Partition>));
                }
                // Series dropped between split planning and the scan: skip.
                None => continue,
            }
        })))
    }
}
