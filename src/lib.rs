//! # Conflux
//!
//! Query-time aggregation and combination engine for distributed
//! time-series data: validates a query descriptor, reduces every partition
//! of a scan split in parallel, and folds the per-partition results into a
//! single answer.
//!
//! ## Features
//!
//! - **Strict validation**: arity, type, and shape checks complete before
//!   any partition is scanned
//! - **Pluggable functions**: a static registry of aggregation and combiner
//!   functions with declared argument schemas
//! - **Order-independent combination**: commutative folds tolerate
//!   arbitrary partition completion order
//! - **Bounded parallelism**: a semaphore-gated worker pool with
//!   backpressured partition pulls
//! - **Fail-fast faults**: the first runtime fault cancels outstanding
//!   work and discards partial state
//!
//! ## Modules
//!
//! - [`store`]: Partition store boundary (traits + in-memory reference)
//! - [`query`]: Query descriptors, function registry, validation
//! - [`engine`]: Aggregation functions, combiner folds, orchestration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conflux::{
//!     DatasetRef, MemoryStore, PartitionStore, QueryEngine, QuerySpec, Record, Schema,
//!     ShardId, TimeRange,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Stand up a store and ingest some samples
//!     let store = Arc::new(MemoryStore::new());
//!     let schema = Schema::new(DatasetRef::from("gauges"), "timestamp", ["min"]);
//!     store.setup(&schema, ShardId(0)).await?;
//!     store
//!         .ingest(
//!             &schema.dataset,
//!             ShardId(0),
//!             vec![
//!                 Record::new("series-1", 100_000).value("min", 4.0),
//!                 Record::new("series-1", 110_000).value("min", 7.0),
//!             ],
//!         )
//!         .await?;
//!
//!     // Plan the scan and run a query over it
//!     let split = store
//!         .scan_splits(&schema.dataset, ShardId(0), TimeRange::all(), 1)
//!         .await?
//!         .remove(0);
//!     let engine = QueryEngine::new(store);
//!     let spec = QuerySpec::aggregate("sum").aggregate_args(["min"]).build();
//!     let aggregate = engine.submit(&schema, ShardId(0), &spec, split).await?;
//!
//!     println!("{:?}", aggregate);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod query;
pub mod store;

// Re-export top-level types for convenience
pub use engine::{
    Aggregate, AggregateOp, CombineFold, CombinerOp, EngineConfig, QueryEngine, QueryState,
    SamplePoint, SeriesValues, DEFAULT_HISTOGRAM_BUCKETS,
};

pub use query::{
    validate, AggregateKind, ArgKind, ArgValue, CombinerKind, ExecutionPlan, FunctionDescriptor,
    OutputShape, QueryError, QueryResult, QuerySpec, QuerySpecBuilder,
};

pub use store::{
    DatasetRef, MemoryPartition, MemoryStore, Partition, PartitionIter, PartitionStore, Record,
    Sample, SampleIter, ScanSplit, Schema, ShardId, StoreError, StoreResult, TimeRange,
};
