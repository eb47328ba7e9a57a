//! Query execution engine
//!
//! Everything that runs after validation succeeds:
//!
//! - **aggregate**: Per-partition aggregation functions (Last, Sum, ...)
//! - **combine**: Cross-partition combiner folds (List, Histogram)
//! - **orchestrator**: Async fan-out, fold loop, and cancellation
//!
//! # Architecture
//!
//! ```text
//! Scan Split ─┬─ partition ── AggregateOp ──┐
//!             ├─ partition ── AggregateOp ──┼── CombineFold ── Aggregate
//!             └─ partition ── AggregateOp ──┘
//! ```
//!
//! Per-partition reductions run concurrently up to the configured worker
//! capacity; the fold consumes their results in arrival order, which is why
//! every combiner is commutative.

pub mod aggregate;
pub mod combine;
pub mod orchestrator;

// Re-export commonly used types
pub use aggregate::{AggregateOp, SamplePoint, SeriesValues};
pub use combine::{Aggregate, CombineFold, CombinerOp, DEFAULT_HISTOGRAM_BUCKETS};
pub use orchestrator::{EngineConfig, QueryEngine, QueryState};
