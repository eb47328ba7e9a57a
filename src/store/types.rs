//! Core data types shared across the store boundary
//!
//! This module defines the vocabulary the engine and the partition store
//! agree on:
//! - `Sample`: one decoded (timestamp, value) pair
//! - `Record`: one ingested row for a series
//! - `Schema`: the column layout of a dataset
//! - `TimeRange`: a half-open time interval for scans
//! - `ScanSplit`: a parallelizable unit of partitions for one query task

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a dataset within the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef(pub String);

impl DatasetRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DatasetRef {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for DatasetRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Horizontal partitioning unit used for ingestion and query locality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardId(pub u32);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One decoded sample from a partition's column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// The decoded value
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One row of ingested data for a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Series the row belongs to
    pub series: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Column values carried by the row
    #[serde(default)]
    pub values: HashMap<String, f64>,
}

impl Record {
    /// Create a new record with no column values
    pub fn new(series: impl Into<String>, timestamp: i64) -> Self {
        Self {
            series: series.into(),
            timestamp,
            values: HashMap::new(),
        }
    }

    /// Builder method: set a column value
    pub fn value(mut self, column: impl Into<String>, value: f64) -> Self {
        self.values.insert(column.into(), value);
        self
    }
}

/// Column layout of a dataset
///
/// Every dataset has one time column plus a set of named value columns.
/// Column-name query arguments are resolved against this schema during
/// validation, before any partition is scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Dataset this schema describes
    pub dataset: DatasetRef,
    /// Name of the timestamp column
    pub time_column: String,
    /// Names of the value columns
    pub value_columns: Vec<String>,
}

impl Schema {
    /// Create a new schema
    pub fn new(
        dataset: DatasetRef,
        time_column: impl Into<String>,
        value_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            dataset,
            time_column: time_column.into(),
            value_columns: value_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Check whether a column name refers to the time column or a value column
    pub fn has_column(&self, name: &str) -> bool {
        self.time_column == name || self.value_columns.iter().any(|c| c == name)
    }
}

/// Time range for scans (half-open interval: [start, end))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start timestamp (inclusive), in milliseconds
    pub start: i64,
    /// End timestamp (exclusive), in milliseconds
    pub end: i64,
}

impl TimeRange {
    /// Create a new time range
    ///
    /// # Panics
    /// Panics if start >= end
    pub fn new(start: i64, end: i64) -> Self {
        assert!(start < end, "TimeRange: start must be less than end");
        Self { start, end }
    }

    /// Create a time range, returning None if invalid
    pub fn try_new(start: i64, end: i64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Range covering all representable timestamps
    pub fn all() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }

    /// Create a range for the last N hours from now
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now().timestamp_millis();
        let start = end - (hours * 3600 * 1000);
        Self { start, end }
    }

    /// Create a range for the last N days from now
    pub fn last_days(days: i64) -> Self {
        Self::last_hours(days * 24)
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Get the duration in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.end - self.start
    }
}

/// A parallelizable unit of partitions assigned to one execution task
///
/// Splits are produced by the store's split planner and handed back to the
/// engine unchanged; the engine treats the series list as opaque and only
/// passes the split to `scan_partitions`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSplit {
    /// Dataset the split belongs to
    pub dataset: DatasetRef,
    /// Shard the split reads from
    pub shard: ShardId,
    /// Series keys covered by this split, in scan order
    pub series: Vec<String>,
    /// Time range every partition in the split is bounded to
    pub range: TimeRange,
}

impl ScanSplit {
    /// Create a new scan split
    pub fn new(dataset: DatasetRef, shard: ShardId, series: Vec<String>, range: TimeRange) -> Self {
        Self {
            dataset,
            shard,
            series,
            range,
        }
    }

    /// Number of partitions the split covers
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the split covers no partitions
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange::new(1000, 2000);

        assert!(!range.contains(999));
        assert!(range.contains(1000));
        assert!(range.contains(1500));
        assert!(range.contains(1999));
        assert!(!range.contains(2000));
    }

    #[test]
    fn test_time_range_overlaps() {
        let range1 = TimeRange::new(1000, 2000);
        let range2 = TimeRange::new(1500, 2500);
        let range3 = TimeRange::new(2000, 3000);

        assert!(range1.overlaps(&range2));
        assert!(!range1.overlaps(&range3)); // Adjacent, not overlapping
    }

    #[test]
    fn test_time_range_all_contains_everything() {
        let range = TimeRange::all();
        assert!(range.contains(0));
        assert!(range.contains(i64::MIN));
        assert!(range.contains(i64::MAX - 1));
    }

    #[test]
    fn test_schema_has_column() {
        let schema = Schema::new(DatasetRef::from("gauges"), "timestamp", ["min", "max"]);

        assert!(schema.has_column("timestamp"));
        assert!(schema.has_column("min"));
        assert!(schema.has_column("max"));
        assert!(!schema.has_column("avg"));
    }

    #[test]
    fn test_record_builder() {
        let record = Record::new("series-1", 100_000).value("min", 4.5).value("max", 9.0);

        assert_eq!(record.series, "series-1");
        assert_eq!(record.timestamp, 100_000);
        assert_eq!(record.values.get("min"), Some(&4.5));
        assert_eq!(record.values.get("max"), Some(&9.0));
    }

    #[test]
    fn test_scan_split_len() {
        let split = ScanSplit::new(
            DatasetRef::from("gauges"),
            ShardId(0),
            vec!["a".to_string(), "b".to_string()],
            TimeRange::all(),
        );

        assert_eq!(split.len(), 2);
        assert!(!split.is_empty());
    }
}
