//! Function registry
//!
//! Static, read-only catalog of the aggregation and combiner functions the
//! engine knows. Function selection is a closed tagged-variant set resolved
//! by name; each variant points at a `'static` descriptor carrying its
//! argument schema. The registry is immutable after process start and
//! requires no locking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse rule for one positional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    /// Floating-point number
    Double,
    /// Whole number
    Integer,
    /// Name of a schema column
    ColumnName,
}

impl ArgKind {
    /// Human-readable label used in `BadArgument` errors
    pub fn label(&self) -> &'static str {
        match self {
            ArgKind::Double => "double",
            ArgKind::Integer => "integer",
            ArgKind::ColumnName => "column name",
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Declared output shape of an aggregation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// One point per partition
    Scalar,
    /// Many points per partition
    Series,
}

/// Argument schema of one registered function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Canonical function name
    pub name: &'static str,
    /// Minimum accepted argument count
    pub min_args: usize,
    /// Maximum accepted argument count
    pub max_args: usize,
    /// Per-position parse rules, `max_args` entries
    pub arg_kinds: &'static [ArgKind],
}

static LAST_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "last",
    min_args: 2,
    max_args: 2,
    arg_kinds: &[ArgKind::ColumnName, ArgKind::ColumnName],
};

static SUM_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "sum",
    min_args: 1,
    max_args: 1,
    arg_kinds: &[ArgKind::ColumnName],
};

static MIN_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "min",
    min_args: 1,
    max_args: 1,
    arg_kinds: &[ArgKind::ColumnName],
};

static MAX_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "max",
    min_args: 1,
    max_args: 1,
    arg_kinds: &[ArgKind::ColumnName],
};

static COUNT_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "count",
    min_args: 1,
    max_args: 1,
    arg_kinds: &[ArgKind::ColumnName],
};

static TIME_GROUP_MIN_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "time_group_min",
    min_args: 5,
    max_args: 5,
    arg_kinds: &[
        ArgKind::ColumnName,
        ArgKind::ColumnName,
        ArgKind::Integer,
        ArgKind::Integer,
        ArgKind::Integer,
    ],
};

static LIST_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "list",
    min_args: 0,
    max_args: 0,
    arg_kinds: &[],
};

static HISTOGRAM_DESC: FunctionDescriptor = FunctionDescriptor {
    name: "histogram",
    min_args: 1,
    max_args: 2,
    arg_kinds: &[ArgKind::Double, ArgKind::Integer],
};

/// Registered per-partition aggregation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Chronologically last sample
    Last,
    /// Arithmetic sum over the range
    Sum,
    /// Minimum value over the range
    Min,
    /// Maximum value over the range
    Max,
    /// Number of samples in the range
    Count,
    /// Per-window minimum over equal-width time windows
    TimeGroupMin,
}

impl AggregateKind {
    /// Resolve a function name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "last" => Some(Self::Last),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            "time_group_min" => Some(Self::TimeGroupMin),
            _ => None,
        }
    }

    /// Argument schema for this function
    pub fn descriptor(&self) -> &'static FunctionDescriptor {
        match self {
            Self::Last => &LAST_DESC,
            Self::Sum => &SUM_DESC,
            Self::Min => &MIN_DESC,
            Self::Max => &MAX_DESC,
            Self::Count => &COUNT_DESC,
            Self::TimeGroupMin => &TIME_GROUP_MIN_DESC,
        }
    }

    /// Declared output shape
    pub fn output_shape(&self) -> OutputShape {
        match self {
            Self::TimeGroupMin => OutputShape::Series,
            _ => OutputShape::Scalar,
        }
    }

    /// All registered aggregation functions
    pub fn all() -> &'static [AggregateKind] {
        &[
            Self::Last,
            Self::Sum,
            Self::Min,
            Self::Max,
            Self::Count,
            Self::TimeGroupMin,
        ]
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().name)
    }
}

/// Registered cross-partition combiner functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinerKind {
    /// Identity fold: every per-partition result, unchanged
    List,
    /// Bucketed counts of per-partition scalar values
    Histogram,
}

impl CombinerKind {
    /// Resolve a combiner name, case-insensitively
    ///
    /// `simple` is accepted as an alias for `list`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "list" | "simple" => Some(Self::List),
            "histogram" => Some(Self::Histogram),
            _ => None,
        }
    }

    /// Argument schema for this combiner
    pub fn descriptor(&self) -> &'static FunctionDescriptor {
        match self {
            Self::List => &LIST_DESC,
            Self::Histogram => &HISTOGRAM_DESC,
        }
    }

    /// Whether this combiner can fold results of the given shape
    pub fn accepts_shape(&self, shape: OutputShape) -> bool {
        match self {
            Self::List => true,
            Self::Histogram => shape == OutputShape::Scalar,
        }
    }

    /// All registered combiner functions
    pub fn all() -> &'static [CombinerKind] {
        &[Self::List, Self::Histogram]
    }
}

impl fmt::Display for CombinerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_lookup() {
        assert_eq!(AggregateKind::from_name("last"), Some(AggregateKind::Last));
        assert_eq!(AggregateKind::from_name("SUM"), Some(AggregateKind::Sum));
        assert_eq!(
            AggregateKind::from_name("time_group_min"),
            Some(AggregateKind::TimeGroupMin)
        );
        assert_eq!(AggregateKind::from_name("median"), None);
    }

    #[test]
    fn test_combiner_lookup_with_alias() {
        assert_eq!(CombinerKind::from_name("list"), Some(CombinerKind::List));
        assert_eq!(CombinerKind::from_name("simple"), Some(CombinerKind::List));
        assert_eq!(
            CombinerKind::from_name("Histogram"),
            Some(CombinerKind::Histogram)
        );
        assert_eq!(CombinerKind::from_name("topk"), None);
    }

    #[test]
    fn test_descriptor_arity() {
        let desc = CombinerKind::Histogram.descriptor();
        assert_eq!(desc.min_args, 1);
        assert_eq!(desc.max_args, 2);
        assert_eq!(desc.arg_kinds.len(), desc.max_args);

        let desc = AggregateKind::TimeGroupMin.descriptor();
        assert_eq!(desc.min_args, 5);
        assert_eq!(desc.arg_kinds[2], ArgKind::Integer);
    }

    #[test]
    fn test_every_descriptor_is_consistent() {
        for kind in AggregateKind::all() {
            let desc = kind.descriptor();
            assert!(desc.min_args <= desc.max_args);
            assert_eq!(desc.arg_kinds.len(), desc.max_args);
            assert_eq!(AggregateKind::from_name(desc.name), Some(*kind));
        }
        for kind in CombinerKind::all() {
            let desc = kind.descriptor();
            assert!(desc.min_args <= desc.max_args);
            assert_eq!(desc.arg_kinds.len(), desc.max_args);
            assert_eq!(CombinerKind::from_name(desc.name), Some(*kind));
        }
    }

    #[test]
    fn test_shape_compatibility() {
        assert!(CombinerKind::List.accepts_shape(OutputShape::Scalar));
        assert!(CombinerKind::List.accepts_shape(OutputShape::Series));
        assert!(CombinerKind::Histogram.accepts_shape(OutputShape::Scalar));
        assert!(!CombinerKind::Histogram.accepts_shape(OutputShape::Series));
    }
}
