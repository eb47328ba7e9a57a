//! Store collaborator error types
//!
//! Defines all errors that can surface while reading partitions.

use crate::store::types::{DatasetRef, ShardId};
use thiserror::Error;

/// Errors that can occur in the partition store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Requested column does not exist in the schema
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Referenced dataset has never been set up
    #[error("Dataset not found: {0}")]
    DatasetNotFound(DatasetRef),

    /// Shard has not been set up for the dataset
    #[error("Shard {shard} not found for dataset {dataset}")]
    ShardNotFound {
        dataset: DatasetRef,
        shard: ShardId,
    },

    /// Stored data could not be decoded
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
