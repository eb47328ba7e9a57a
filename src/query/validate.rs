//! Query validation
//!
//! Turns a raw [`QuerySpec`] into an executable plan or exactly one
//! [`QueryError`]. Validation runs synchronously on the caller's path and
//! always completes before any partition is scanned.
//!
//! # Check Order
//!
//! ```text
//! resolve names → shape compatibility → arity → parse → range checks
//! ```
//!
//! Shape compatibility is decided before any argument is looked at, so an
//! incompatible pairing reports `InvalidAggregator` regardless of argument
//! validity. Arity is checked before value parsing, and a type error never
//! re-triggers an arity error.

use crate::engine::aggregate::AggregateOp;
use crate::engine::combine::{CombinerOp, DEFAULT_HISTOGRAM_BUCKETS};
use crate::query::error::{QueryError, QueryResult};
use crate::query::plan::{ArgValue, ExecutionPlan};
use crate::query::registry::{AggregateKind, ArgKind, CombinerKind, FunctionDescriptor};
use crate::query::spec::QuerySpec;
use crate::store::Schema;

/// Upper bound on time windows and histogram buckets a single query may
/// allocate; accumulator memory is proportional to this.
pub const MAX_BUCKETS: usize = 1_000_000;

/// Validate a query spec against a dataset schema
pub fn validate(spec: &QuerySpec, schema: &Schema) -> QueryResult<ExecutionPlan> {
    let aggregate_kind = AggregateKind::from_name(&spec.aggregate_func).ok_or_else(|| {
        QueryError::InvalidAggregator(format!(
            "unknown aggregation function: {}",
            spec.aggregate_func
        ))
    })?;
    let combiner_kind = CombinerKind::from_name(&spec.combiner_func).ok_or_else(|| {
        QueryError::InvalidAggregator(format!("unknown combiner function: {}", spec.combiner_func))
    })?;

    if !combiner_kind.accepts_shape(aggregate_kind.output_shape()) {
        return Err(QueryError::InvalidAggregator(format!(
            "combiner {} requires a single-point series but {} produces a multi-point series",
            combiner_kind, aggregate_kind
        )));
    }

    let combiner_args = parse_args(combiner_kind.descriptor(), &spec.combiner_args, schema)?;
    let aggregate_args = parse_args(aggregate_kind.descriptor(), &spec.aggregate_args, schema)?;

    let combiner = build_combiner(combiner_kind, &combiner_args)?;
    let aggregate = build_aggregate(aggregate_kind, &aggregate_args)?;

    Ok(ExecutionPlan::new(aggregate, combiner))
}

/// Check arity, then parse each positional argument per its declared kind
fn parse_args(
    descriptor: &FunctionDescriptor,
    raw: &[String],
    schema: &Schema,
) -> QueryResult<Vec<ArgValue>> {
    if raw.len() < descriptor.min_args || raw.len() > descriptor.max_args {
        return Err(QueryError::WrongNumberArguments {
            given: raw.len(),
            expected: descriptor.min_args,
        });
    }

    raw.iter()
        .enumerate()
        .map(|(index, value)| parse_arg(descriptor.arg_kinds[index], index, value, schema))
        .collect()
}

fn parse_arg(kind: ArgKind, index: usize, value: &str, schema: &Schema) -> QueryResult<ArgValue> {
    let bad = || QueryError::BadArgument {
        index,
        value: value.to_string(),
        expected: kind.label(),
    };

    match kind {
        ArgKind::Double => value.parse::<f64>().map(ArgValue::Double).map_err(|_| bad()),
        ArgKind::Integer => value.parse::<i64>().map(ArgValue::Integer).map_err(|_| bad()),
        ArgKind::ColumnName => {
            if schema.has_column(value) {
                Ok(ArgValue::Column(value.to_string()))
            } else {
                Err(bad())
            }
        }
    }
}

fn build_aggregate(kind: AggregateKind, args: &[ArgValue]) -> QueryResult<AggregateOp> {
    match (kind, args) {
        (AggregateKind::Last, [ArgValue::Column(time), ArgValue::Column(value)]) => {
            Ok(AggregateOp::Last {
                time_column: time.clone(),
                value_column: value.clone(),
            })
        }
        (AggregateKind::Sum, [ArgValue::Column(value)]) => Ok(AggregateOp::Sum {
            value_column: value.clone(),
        }),
        (AggregateKind::Min, [ArgValue::Column(value)]) => Ok(AggregateOp::Min {
            value_column: value.clone(),
        }),
        (AggregateKind::Max, [ArgValue::Column(value)]) => Ok(AggregateOp::Max {
            value_column: value.clone(),
        }),
        (AggregateKind::Count, [ArgValue::Column(value)]) => Ok(AggregateOp::Count {
            value_column: value.clone(),
        }),
        (
            AggregateKind::TimeGroupMin,
            [ArgValue::Column(time), ArgValue::Column(value), ArgValue::Integer(start), ArgValue::Integer(end), ArgValue::Integer(windows)],
        ) => {
            if *end <= *start {
                return Err(QueryError::BadArgument {
                    index: 3,
                    value: end.to_string(),
                    expected: "window end after start",
                });
            }
            let windows = usize::try_from(*windows)
                .ok()
                .filter(|w| (1..=MAX_BUCKETS).contains(w))
                .ok_or_else(|| QueryError::BadArgument {
                    index: 4,
                    value: windows.to_string(),
                    expected: "positive window count",
                })?;
            Ok(AggregateOp::TimeGroupMin {
                time_column: time.clone(),
                value_column: value.clone(),
                start: *start,
                end: *end,
                windows,
            })
        }
        // Unreachable through parse_args; the descriptor pins arity and kinds.
        _ => Err(QueryError::InvalidAggregator(format!(
            "argument schema mismatch for {}",
            kind
        ))),
    }
}

fn build_combiner(kind: CombinerKind, args: &[ArgValue]) -> QueryResult<CombinerOp> {
    match (kind, args) {
        (CombinerKind::List, []) => Ok(CombinerOp::List),
        (CombinerKind::Histogram, [ArgValue::Double(width), rest @ ..]) => {
            if !width.is_finite() || *width <= 0.0 {
                return Err(QueryError::BadArgument {
                    index: 0,
                    value: width.to_string(),
                    expected: "positive bucket width",
                });
            }
            let bucket_count = match rest {
                [] => DEFAULT_HISTOGRAM_BUCKETS,
                [ArgValue::Integer(count)] => usize::try_from(*count)
                    .ok()
                    .filter(|c| (1..=MAX_BUCKETS).contains(c))
                    .ok_or_else(|| QueryError::BadArgument {
                        index: 1,
                        value: count.to_string(),
                        expected: "positive bucket count",
                    })?,
                _ => {
                    return Err(QueryError::InvalidAggregator(
                        "argument schema mismatch for histogram".to_string(),
                    ))
                }
            };
            Ok(CombinerOp::Histogram {
                bucket_width: *width,
                bucket_count,
            })
        }
        _ => Err(QueryError::InvalidAggregator(format!(
            "argument schema mismatch for {}",
            kind
        ))),
    }
}
