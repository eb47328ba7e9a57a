//! Per-partition aggregation functions
//!
//! Each [`AggregateOp`] is a pure, deterministic reduction over exactly one
//! partition's column data. Operations carry their parsed arguments, hold no
//! state between invocations, and are safe to evaluate concurrently across
//! partitions without synchronization.

use crate::query::registry::AggregateKind;
use crate::store::{Partition, StoreResult};
use serde::{Deserialize, Serialize};

/// One point of an aggregated series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Aggregated value
    pub value: f64,
}

impl SamplePoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Per-partition aggregate result: a series key plus ordered points
///
/// Produced exactly once per partition and immutable thereafter. Scalar
/// aggregations carry exactly one point; an empty partition carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesValues {
    /// Key of the series the partition belongs to
    pub series: String,
    /// Aggregated points, ascending by timestamp
    pub points: Vec<SamplePoint>,
}

impl SeriesValues {
    /// Result with no points (empty partition)
    pub fn empty(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            points: Vec::new(),
        }
    }

    /// Result with exactly one point
    pub fn single(series: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self {
            series: series.into(),
            points: vec![SamplePoint::new(timestamp, value)],
        }
    }
}

/// An aggregation function with its parsed arguments bound
///
/// Built by the validator; the argument schemas live in the
/// [registry](crate::query::registry).
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOp {
    /// Chronologically last sample of the value column
    Last {
        time_column: String,
        value_column: String,
    },
    /// Arithmetic sum of the value column
    Sum { value_column: String },
    /// Minimum of the value column, timestamped at the minimal sample
    Min { value_column: String },
    /// Maximum of the value column, timestamped at the maximal sample
    Max { value_column: String },
    /// Sample count of the value column
    Count { value_column: String },
    /// Per-window minimum over `windows` equal-width windows of [start, end]
    TimeGroupMin {
        time_column: String,
        value_column: String,
        start: i64,
        end: i64,
        windows: usize,
    },
}

impl AggregateOp {
    /// Registry variant this operation was built from
    pub fn kind(&self) -> AggregateKind {
        match self {
            Self::Last { .. } => AggregateKind::Last,
            Self::Sum { .. } => AggregateKind::Sum,
            Self::Min { .. } => AggregateKind::Min,
            Self::Max { .. } => AggregateKind::Max,
            Self::Count { .. } => AggregateKind::Count,
            Self::TimeGroupMin { .. } => AggregateKind::TimeGroupMin,
        }
    }

    /// Columns this operation reads, in argument order
    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::Last {
                time_column,
                value_column,
            }
            | Self::TimeGroupMin {
                time_column,
                value_column,
                ..
            } => vec![time_column.clone(), value_column.clone()],
            Self::Sum { value_column }
            | Self::Min { value_column }
            | Self::Max { value_column }
            | Self::Count { value_column } => vec![value_column.clone()],
        }
    }

    /// Reduce one partition to its aggregate result
    pub fn eval(&self, partition: &dyn Partition) -> StoreResult<SeriesValues> {
        let series = partition.series_key().to_string();
        match self {
            Self::Last { value_column, .. } => {
                // Samples arrive in ascending timestamp order per the
                // Partition contract, so the last one wins.
                Ok(match partition.read_values(value_column)?.last() {
                    Some(sample) => SeriesValues::single(series, sample.timestamp, sample.value),
                    None => SeriesValues::empty(series),
                })
            }

            Self::Sum { value_column } => {
                let mut sum = 0.0;
                let mut last_seen: Option<i64> = None;
                for sample in partition.read_values(value_column)? {
                    sum += sample.value;
                    last_seen = Some(sample.timestamp);
                }
                Ok(match last_seen {
                    Some(timestamp) => SeriesValues::single(series, timestamp, sum),
                    None => SeriesValues::empty(series),
                })
            }

            Self::Min { value_column } => {
                let best = partition
                    .read_values(value_column)?
                    .reduce(|best, sample| if sample.value < best.value { sample } else { best });
                Ok(match best {
                    Some(sample) => SeriesValues::single(series, sample.timestamp, sample.value),
                    None => SeriesValues::empty(series),
                })
            }

            Self::Max { value_column } => {
                let best = partition
                    .read_values(value_column)?
                    .reduce(|best, sample| if sample.value > best.value { sample } else { best });
                Ok(match best {
                    Some(sample) => SeriesValues::single(series, sample.timestamp, sample.value),
                    None => SeriesValues::empty(series),
                })
            }

            Self::Count { value_column } => {
                let mut count = 0usize;
                let mut last_seen: Option<i64> = None;
                for sample in partition.read_values(value_column)? {
                    count += 1;
                    last_seen = Some(sample.timestamp);
                }
                Ok(match last_seen {
                    Some(timestamp) => SeriesValues::single(series, timestamp, count as f64),
                    None => SeriesValues::empty(series),
                })
            }

            Self::TimeGroupMin {
                value_column,
                start,
                end,
                windows,
                ..
            } => {
                let span = end - start;
                let mut minima: Vec<Option<f64>> = vec![None; *windows];
                for sample in partition.read_values(value_column)? {
                    if sample.timestamp < *start || sample.timestamp > *end {
                        continue;
                    }
                    // Widened arithmetic: (offset * windows) can overflow i64
                    // for extreme time ranges.
                    let index = (((sample.timestamp - start) as i128 * *windows as i128)
                        / span as i128) as usize;
                    let index = index.min(windows - 1);
                    minima[index] = Some(match minima[index] {
                        Some(current) if current <= sample.value => current,
                        _ => sample.value,
                    });
                }

                // One point per non-empty window, timestamped at window start
                let points = minima
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, minimum)| {
                        minimum.map(|value| {
                            let window_start =
                                start + ((index as i128 * span as i128) / *windows as i128) as i64;
                            SamplePoint::new(window_start, value)
                        })
                    })
                    .collect();
                Ok(SeriesValues {
                    series,
                    points,
                })
            }
        }
    }
}
