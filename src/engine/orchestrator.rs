//! Query execution orchestrator
//!
//! Drives one query end to end: synchronous validation, then asynchronous
//! fan-out of per-partition aggregation tasks over a scan split, folding
//! results into the combiner as they arrive.
//!
//! # Execution Pipeline
//!
//! ```text
//! QuerySpec → validate → scan_partitions → [worker tasks] → fold → Aggregate
//! ```
//!
//! Worker tasks are tokio tasks gated by a semaphore, never one thread per
//! partition. The dispatcher acquires a permit before pulling the next
//! partition from the split, so a slow fold backpressures the scan. The
//! first runtime fault cancels the query: outstanding tasks are signaled
//! through a shared cancellation token and partial combiner state is
//! discarded.

use crate::engine::aggregate::SeriesValues;
use crate::engine::combine::{Aggregate, CombineFold};
use crate::query::error::{QueryError, QueryResult};
use crate::query::plan::ExecutionPlan;
use crate::query::spec::QuerySpec;
use crate::query::validate::validate;
use crate::store::{PartitionIter, PartitionStore, ScanSplit, Schema, ShardId};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Configuration for the query engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent partition tasks per query (default: 8)
    pub worker_capacity: usize,
    /// Capacity of the per-query result channel (default: 64)
    pub result_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_capacity: 8,
            result_queue_depth: 64,
        }
    }
}

/// Lifecycle states of one submitted query
///
/// `Received` through `Failed(validation)` happen synchronously on the
/// caller's path; `Scheduled` onward is asynchronous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Received,
    Validating,
    Scheduled,
    Running,
    Completed,
    Failed,
}

/// The query-time aggregation engine
///
/// Holds a handle to the external partition store; of the store's surface
/// only `scan_partitions` is ever called here. One engine serves many
/// queries; no state is shared between them.
pub struct QueryEngine {
    store: Arc<dyn PartitionStore>,
    config: EngineConfig,
}

impl QueryEngine {
    /// Create an engine with default configuration
    pub fn new(store: Arc<dyn PartitionStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(store: Arc<dyn PartitionStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Submit one query over one scan split
    ///
    /// Validation completes before any partition is scanned; a validation
    /// error never schedules execution. The returned future resolves to
    /// exactly one outcome: a complete [`Aggregate`] or one [`QueryError`].
    pub async fn submit(
        &self,
        schema: &Schema,
        shard: ShardId,
        spec: &QuerySpec,
        split: ScanSplit,
    ) -> QueryResult<Aggregate> {
        let query_id = Uuid::new_v4();
        let span = tracing::info_span!("query", id = %query_id, shard = %shard);

        async move {
            let started = Instant::now();
            tracing::debug!(state = ?QueryState::Received, aggregate = %spec.aggregate_func, combiner = %spec.combiner_func, "query state");

            tracing::debug!(state = ?QueryState::Validating, "query state");
            let plan = match validate(spec, schema) {
                Ok(plan) => Arc::new(plan),
                Err(err) => {
                    tracing::debug!(state = ?QueryState::Failed, error = %err, "query rejected");
                    return Err(err);
                }
            };

            tracing::debug!(state = ?QueryState::Scheduled, partitions = split.len(), "query state");
            let partitions = self.store.scan_partitions(&split)?;

            tracing::debug!(state = ?QueryState::Running, "query state");
            match self.run(plan, partitions).await {
                Ok((aggregate, scanned)) => {
                    tracing::info!(
                        state = ?QueryState::Completed,
                        partitions = scanned,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "query completed"
                    );
                    Ok(aggregate)
                }
                Err(err) => {
                    tracing::warn!(state = ?QueryState::Failed, error = %err, "query failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Fan out partition tasks and drive the combiner fold to completion
    async fn run(
        &self,
        plan: Arc<ExecutionPlan>,
        partitions: PartitionIter,
    ) -> QueryResult<(Aggregate, usize)> {
        let mut fold = CombineFold::new(&plan.combiner);
        let cancel = CancellationToken::new();
        let capacity = self.config.worker_capacity.max(1);
        let (tx, mut rx) =
            mpsc::channel::<QueryResult<SeriesValues>>(self.config.result_queue_depth.max(1));

        let dispatcher = {
            let cancel = cancel.clone();
            let plan = Arc::clone(&plan);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut partitions = partitions;
                let semaphore = Arc::new(Semaphore::new(capacity));
                loop {
                    // A free worker slot gates the next pull from the split.
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => break,
                        permit = semaphore.clone().acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        },
                    };

                    let Some(next) = partitions.next() else { break };
                    match next {
                        Ok(partition) => {
                            let tx = tx.clone();
                            let plan = Arc::clone(&plan);
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                if cancel.is_cancelled() {
                                    return;
                                }
                                let result = plan
                                    .aggregate
                                    .eval(partition.as_ref())
                                    .map_err(QueryError::from);
                                // A closed receiver discards results of
                                // tasks past their point of no return.
                                let _ = tx.send(result).await;
                            });
                        }
                        Err(err) => {
                            let _ = tx.send(Err(err.into())).await;
                            break;
                        }
                    }
                }
            })
        };
        drop(tx);

        let mut scanned = 0usize;
        let mut fault: Option<QueryError> = None;
        while let Some(result) = rx.recv().await {
            match result {
                Ok(series) => {
                    scanned += 1;
                    if let Err(err) = fold.fold(series) {
                        fault = Some(err);
                        break;
                    }
                }
                Err(err) => {
                    fault = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = fault {
            // Fail fast: stop pulling partitions, signal outstanding tasks,
            // drop partial combiner state.
            cancel.cancel();
            rx.close();
            let _ = dispatcher.await;
            return Err(err);
        }

        let _ = dispatcher.await;
        Ok((fold.finish(), scanned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        DatasetRef, MemoryPartition, MemoryStore, Partition, Record, SampleIter, StoreError,
        StoreResult, TimeRange,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("conflux=debug")
            .try_init();
    }

    /// 10 series, 3 samples each at 100/110/120s, "min" sums landing 4 in
    /// histogram bucket 4 and 6 in bucket 5 for width 2000.
    const SERIES_SUMS: [f64; 10] = [
        8000.0, 8500.0, 9000.0, 9500.0, 10000.0, 10400.0, 10800.0, 11200.0, 11600.0, 11900.0,
    ];

    async fn scenario_store() -> (Arc<MemoryStore>, Schema) {
        let store = Arc::new(MemoryStore::new());
        let schema = Schema::new(DatasetRef::from("gauges"), "timestamp", ["min"]);
        store.setup(&schema, ShardId(0)).await.unwrap();

        let mut records = Vec::new();
        for (i, total) in SERIES_SUMS.iter().enumerate() {
            let series = format!("series-{}", i);
            for (step, value) in [1000.0, 2000.0, total - 3000.0].into_iter().enumerate() {
                records.push(
                    Record::new(series.as_str(), 100_000 + step as i64 * 10_000)
                        .value("min", value),
                );
            }
        }
        store
            .ingest(&schema.dataset, ShardId(0), records)
            .await
            .unwrap();
        (store, schema)
    }

    async fn scenario_split(store: &MemoryStore, schema: &Schema) -> ScanSplit {
        store
            .scan_splits(&schema.dataset, ShardId(0), TimeRange::all(), 1)
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_last_with_list_combiner() {
        init_tracing();
        let (store, schema) = scenario_store().await;
        let split = scenario_split(&store, &schema).await;
        let engine = QueryEngine::new(store);

        let spec = QuerySpec::aggregate("last")
            .aggregate_args(["timestamp", "min"])
            .combiner("list")
            .build();
        let aggregate = engine
            .submit(&schema, ShardId(0), &spec, split)
            .await
            .unwrap();

        let entries = aggregate.as_list().unwrap();
        assert_eq!(entries.len(), 10);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.series, format!("series-{}", i));
            assert_eq!(entry.points.len(), 1);
            assert_eq!(entry.points[0].timestamp, 120_000);
            assert_eq!(entry.points[0].value, SERIES_SUMS[i] - 3000.0);
        }
    }

    #[tokio::test]
    async fn test_sum_with_histogram_combiner() {
        init_tracing();
        let (store, schema) = scenario_store().await;
        let split = scenario_split(&store, &schema).await;
        let engine = QueryEngine::new(store);

        let spec = QuerySpec::aggregate("sum")
            .aggregate_args(["min"])
            .combiner("histogram")
            .combiner_args(["2000"])
            .build();
        let aggregate = engine
            .submit(&schema, ShardId(0), &spec, split)
            .await
            .unwrap();

        assert_eq!(
            aggregate.as_histogram().unwrap(),
            &[0, 0, 0, 0, 4, 6, 0, 0, 0, 0]
        );
    }

    #[tokio::test]
    async fn test_validation_errors_surface_through_submit() {
        let (store, schema) = scenario_store().await;
        let split = scenario_split(&store, &schema).await;
        let engine = QueryEngine::new(store);

        let spec = QuerySpec::aggregate("sum")
            .aggregate_args(["min"])
            .combiner("histogram")
            .build();
        let err = engine
            .submit(&schema, ShardId(0), &spec, split.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::WrongNumberArguments {
                given: 0,
                expected: 1
            }
        ));

        let spec = QuerySpec::aggregate("sum")
            .aggregate_args(["min"])
            .combiner("histogram")
            .combiner_args(["one", "two", "three"])
            .build();
        let err = engine
            .submit(&schema, ShardId(0), &spec, split)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::WrongNumberArguments {
                given: 3,
                expected: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_results_are_deterministic_across_runs() {
        let (store, schema) = scenario_store().await;
        let engine = QueryEngine::new(Arc::clone(&store) as Arc<dyn PartitionStore>);

        let spec = QuerySpec::aggregate("last")
            .aggregate_args(["timestamp", "min"])
            .build();

        let first = engine
            .submit(
                &schema,
                ShardId(0),
                &spec,
                scenario_split(&store, &schema).await,
            )
            .await
            .unwrap();
        let second = engine
            .submit(
                &schema,
                ShardId(0),
                &spec,
                scenario_split(&store, &schema).await,
            )
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_narrow_worker_capacity_still_covers_every_partition() {
        let (store, schema) = scenario_store().await;
        let split = scenario_split(&store, &schema).await;
        let engine = QueryEngine::with_config(
            store,
            EngineConfig {
                worker_capacity: 2,
                result_queue_depth: 1,
            },
        );

        let spec = QuerySpec::aggregate("count").aggregate_args(["min"]).build();
        let aggregate = engine
            .submit(&schema, ShardId(0), &spec, split)
            .await
            .unwrap();

        let entries = aggregate.as_list().unwrap();
        assert_eq!(entries.len(), 10);
        assert!(entries.iter().all(|e| e.points[0].value == 3.0));
    }

    #[tokio::test]
    async fn test_time_group_min_end_to_end() {
        let (store, schema) = scenario_store().await;
        let split = scenario_split(&store, &schema).await;
        let engine = QueryEngine::new(store);

        let spec = QuerySpec::aggregate("time_group_min")
            .aggregate_args(["timestamp", "min", "100000", "120000", "2"])
            .combiner("list")
            .build();
        let aggregate = engine
            .submit(&schema, ShardId(0), &spec, split)
            .await
            .unwrap();

        let entries = aggregate.as_list().unwrap();
        assert_eq!(entries.len(), 10);
        // First window holds the opening sample, second window the
        // 110_000 and 120_000 samples (min 2000).
        assert_eq!(entries[0].points.len(), 2);
        assert_eq!(entries[0].points[0].value, 1000.0);
        assert_eq!(entries[0].points[1].value, 2000.0);
    }

    #[tokio::test]
    async fn test_empty_split_yields_empty_aggregates() {
        let (store, schema) = scenario_store().await;
        let engine = QueryEngine::new(Arc::clone(&store) as Arc<dyn PartitionStore>);
        let empty = ScanSplit::new(
            schema.dataset.clone(),
            ShardId(0),
            Vec::new(),
            TimeRange::all(),
        );

        let spec = QuerySpec::aggregate("last")
            .aggregate_args(["timestamp", "min"])
            .build();
        let aggregate = engine
            .submit(&schema, ShardId(0), &spec, empty.clone())
            .await
            .unwrap();
        assert_eq!(aggregate, Aggregate::List(Vec::new()));

        let spec = QuerySpec::aggregate("sum")
            .aggregate_args(["min"])
            .combiner("histogram")
            .combiner_args(["2000"])
            .build();
        let aggregate = engine
            .submit(&schema, ShardId(0), &spec, empty)
            .await
            .unwrap();
        assert_eq!(aggregate, Aggregate::Histogram(vec![0; 10]));
    }

    /// Partition whose column reads always fail, for fault injection
    struct FaultyPartition;

    impl Partition for FaultyPartition {
        fn series_key(&self) -> &str {
            "series-faulty"
        }

        fn read_values(&self, _column: &str) -> StoreResult<SampleIter<'_>> {
            Err(StoreError::Corruption("truncated block".to_string()))
        }
    }

    /// Store serving a fixed partition list, for fault injection
    struct StaticStore {
        partitions: Vec<Arc<dyn Partition>>,
    }

    #[async_trait]
    impl PartitionStore for StaticStore {
        async fn setup(&self, _schema: &Schema, _shard: ShardId) -> StoreResult<()> {
            Ok(())
        }

        async fn ingest(
            &self,
            _dataset: &DatasetRef,
            _shard: ShardId,
            _records: Vec<Record>,
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn scan_splits(
            &self,
            dataset: &DatasetRef,
            shard: ShardId,
            range: TimeRange,
            _desired_parallelism: usize,
        ) -> StoreResult<Vec<ScanSplit>> {
            let series = self
                .partitions
                .iter()
                .map(|p| p.series_key().to_string())
                .collect();
            Ok(vec![ScanSplit::new(dataset.clone(), shard, series, range)])
        }

        fn scan_partitions(&self, _split: &ScanSplit) -> StoreResult<PartitionIter> {
            let partitions = self.partitions.clone();
            Ok(Box::new(partitions.into_iter().map(Ok)))
        }
    }

    fn healthy_partition(series: &str) -> Arc<dyn Partition> {
        let rows = (0..3)
            .map(|step| {
                (
                    100_000 + step * 10_000,
                    HashMap::from([("min".to_string(), step as f64)]),
                )
            })
            .collect();
        Arc::new(MemoryPartition::from_rows(
            series,
            "timestamp",
            vec!["min".to_string()],
            rows,
        ))
    }

    #[tokio::test]
    async fn test_fail_fast_on_partition_fault() {
        init_tracing();
        let mut partitions: Vec<Arc<dyn Partition>> =
            (0..4).map(|i| healthy_partition(&format!("series-{}", i))).collect();
        partitions.insert(2, Arc::new(FaultyPartition));
        let store = Arc::new(StaticStore { partitions });

        let schema = Schema::new(DatasetRef::from("gauges"), "timestamp", ["min"]);
        let split = store
            .scan_splits(&schema.dataset, ShardId(0), TimeRange::all(), 1)
            .await
            .unwrap()
            .remove(0);
        let engine = QueryEngine::new(store);

        let spec = QuerySpec::aggregate("sum").aggregate_args(["min"]).build();
        let err = engine
            .submit(&schema, ShardId(0), &spec, split)
            .await
            .unwrap_err();

        // Exactly one fault, no partial aggregate
        assert!(matches!(err, QueryError::RuntimeFault(_)));
    }

    #[tokio::test]
    async fn test_split_iterator_fault_fails_query() {
        let (store, schema) = scenario_store().await;
        let engine = QueryEngine::new(store);

        // A split naming an unknown shard fails when the scan is opened
        let split = ScanSplit::new(
            schema.dataset.clone(),
            ShardId(42),
            vec!["series-0".to_string()],
            TimeRange::all(),
        );
        let spec = QuerySpec::aggregate("sum").aggregate_args(["min"]).build();
        let err = engine
            .submit(&schema, ShardId(42), &spec, split)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::RuntimeFault(_)));
    }
}
