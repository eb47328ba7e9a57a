//! Cross-partition combiner functions
//!
//! A combiner folds the stream of per-partition results into one final
//! [`Aggregate`]. Partitions complete in arbitrary order under parallel
//! scanning, so every fold must be commutative and associative; that is a
//! contract, not an optimization.

use crate::engine::aggregate::SeriesValues;
use crate::query::error::{QueryError, QueryResult};
use crate::query::registry::CombinerKind;
use serde::Serialize;

/// Bucket count used when the histogram combiner's second argument is omitted
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 10;

/// A combiner function with its parsed arguments bound
#[derive(Debug, Clone, PartialEq)]
pub enum CombinerOp {
    /// Collect every per-partition result
    List,
    /// Count per-partition scalar values into fixed-width buckets
    Histogram {
        bucket_width: f64,
        bucket_count: usize,
    },
}

impl CombinerOp {
    /// Registry variant this operation was built from
    pub fn kind(&self) -> CombinerKind {
        match self {
            Self::List => CombinerKind::List,
            Self::Histogram { .. } => CombinerKind::Histogram,
        }
    }
}

/// Final query result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// Every series' individual result, sorted by series key
    List(Vec<SeriesValues>),
    /// Bucket counts, indexed by bucket
    Histogram(Vec<u64>),
}

impl Aggregate {
    /// Series results if this is a list aggregate
    pub fn as_list(&self) -> Option<&[SeriesValues]> {
        match self {
            Self::List(entries) => Some(entries),
            _ => None,
        }
    }

    /// Bucket counts if this is a histogram aggregate
    pub fn as_histogram(&self) -> Option<&[u64]> {
        match self {
            Self::Histogram(counts) => Some(counts),
            _ => None,
        }
    }
}

/// Streaming histogram accumulator, O(bucket count) memory
#[derive(Debug)]
pub struct HistogramFold {
    bucket_width: f64,
    counts: Vec<u64>,
    dropped: u64,
}

impl HistogramFold {
    fn new(bucket_width: f64, bucket_count: usize) -> Self {
        Self {
            bucket_width,
            counts: vec![0; bucket_count],
            dropped: 0,
        }
    }

    fn fold(&mut self, series: &SeriesValues) -> QueryResult<()> {
        let value = match series.points.as_slice() {
            // Empty partitions contribute nothing, same as out-of-range values
            [] => {
                self.dropped += 1;
                return Ok(());
            }
            [point] => point.value,
            _ => {
                return Err(QueryError::RuntimeFault(format!(
                    "histogram combiner requires a single-point series, got {} points for {}",
                    series.points.len(),
                    series.series
                )))
            }
        };

        // Half-open buckets of `bucket_width` starting at zero; anything
        // outside [0, count * width) is dropped without error. NaN fails the
        // `>= 0` test and falls through to the drop counter.
        if value >= 0.0 {
            let index = (value / self.bucket_width) as usize;
            if index < self.counts.len() {
                self.counts[index] += 1;
                return Ok(());
            }
        }
        self.dropped += 1;
        Ok(())
    }

    fn finish(self) -> Vec<u64> {
        if self.dropped > 0 {
            tracing::debug!(dropped = self.dropped, "histogram fold dropped values");
        }
        self.counts
    }
}

/// Accumulator driving one query's combination stage
///
/// Owned exclusively by the query's fold loop; per-partition reductions run
/// in parallel but their results enter here one at a time.
#[derive(Debug)]
pub enum CombineFold {
    List { entries: Vec<SeriesValues> },
    Histogram(HistogramFold),
}

impl CombineFold {
    /// Create the accumulator for a planned combiner
    pub fn new(op: &CombinerOp) -> Self {
        match op {
            CombinerOp::List => Self::List {
                entries: Vec::new(),
            },
            CombinerOp::Histogram {
                bucket_width,
                bucket_count,
            } => Self::Histogram(HistogramFold::new(*bucket_width, *bucket_count)),
        }
    }

    /// Fold one per-partition result, in arrival order
    pub fn fold(&mut self, series: SeriesValues) -> QueryResult<()> {
        match self {
            Self::List { entries } => {
                entries.push(series);
                Ok(())
            }
            Self::Histogram(fold) => fold.fold(&series),
        }
    }

    /// Finish the fold and produce the final aggregate
    ///
    /// List output is sorted by series key so the result is identical for
    /// every arrival order.
    pub fn finish(self) -> Aggregate {
        match self {
            Self::List { mut entries } => {
                entries.sort_by(|a, b| a.series.cmp(&b.series));
                Aggregate::List(entries)
            }
            Self::Histogram(fold) => Aggregate::Histogram(fold.finish()),
        }
    }
}
