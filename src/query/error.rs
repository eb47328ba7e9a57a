//! Query error types
//!
//! The first three kinds are produced during validation only and never
//! schedule execution; `RuntimeFault` is execution-time and fails the whole
//! query. A query yields exactly one outcome: a complete aggregate or
//! exactly one of these errors.

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur during query validation and execution
#[derive(Error, Debug)]
pub enum QueryError {
    /// Argument count outside the function's declared bounds
    ///
    /// `expected` reports the function's minimum arity.
    #[error("Wrong number of arguments: given {given}, expected {expected}")]
    WrongNumberArguments { given: usize, expected: usize },

    /// An argument failed its positional parse rule
    #[error("Bad argument at position {index}: {value:?} is not a valid {expected}")]
    BadArgument {
        index: usize,
        value: String,
        expected: &'static str,
    },

    /// Unknown function name or incompatible function pairing
    #[error("Invalid aggregator: {0}")]
    InvalidAggregator(String),

    /// Partition aggregation failed at execution time
    #[error("Runtime fault: {0}")]
    RuntimeFault(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::RuntimeFault(err.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::WrongNumberArguments {
            given: 3,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "Wrong number of arguments: given 3, expected 1"
        );

        let err = QueryError::BadArgument {
            index: 0,
            value: "one".to_string(),
            expected: "double",
        };
        assert_eq!(
            err.to_string(),
            "Bad argument at position 0: \"one\" is not a valid double"
        );
    }

    #[test]
    fn test_store_error_becomes_runtime_fault() {
        let err: QueryError = StoreError::Corruption("truncated block".to_string()).into();
        assert!(matches!(err, QueryError::RuntimeFault(_)));
    }
}
