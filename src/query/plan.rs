//! Executable query plans
//!
//! A plan is what validation produces on success: the resolved function
//! implementations with their parsed arguments baked in, plus the columns
//! the scan will read. Plans are immutable and shared across concurrently
//! running partition tasks behind an `Arc`.

use crate::engine::aggregate::AggregateOp;
use crate::engine::combine::CombinerOp;

/// A positional argument parsed per its declared [`ArgKind`](crate::query::registry::ArgKind)
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Double(f64),
    Integer(i64),
    Column(String),
}

/// Validated, executable form of a query
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    /// Per-partition reduction to run
    pub aggregate: AggregateOp,
    /// Cross-partition fold to drive
    pub combiner: CombinerOp,
    /// Columns the aggregation reads, in argument order
    pub columns: Vec<String>,
}

impl ExecutionPlan {
    /// Create a plan; requested columns are derived from the aggregation
    pub fn new(aggregate: AggregateOp, combiner: CombinerOp) -> Self {
        let columns = aggregate.columns();
        Self {
            aggregate,
            combiner,
            columns,
        }
    }
}
