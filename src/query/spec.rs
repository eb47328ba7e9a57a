//! Query descriptors
//!
//! A [`QuerySpec`] is the raw, unvalidated form of a query: function names
//! plus positional string arguments, exactly as a caller hands them over
//! the wire. Validation turns it into an executable plan; the spec itself
//! is built once and never mutated.

use serde::{Deserialize, Serialize};

fn default_combiner_func() -> String {
    "list".to_string()
}

/// Raw query descriptor submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Name of the per-partition aggregation function
    pub aggregate_func: String,
    /// Positional arguments for the aggregation function
    #[serde(default)]
    pub aggregate_args: Vec<String>,
    /// Name of the cross-partition combiner function
    #[serde(default = "default_combiner_func")]
    pub combiner_func: String,
    /// Positional arguments for the combiner function
    #[serde(default)]
    pub combiner_args: Vec<String>,
}

impl QuerySpec {
    /// Start building a spec with the given aggregation function
    pub fn aggregate(name: impl Into<String>) -> QuerySpecBuilder {
        QuerySpecBuilder::new(name)
    }

    /// Parse a caller-supplied JSON descriptor
    ///
    /// The combiner defaults to `list` when omitted.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Builder for constructing query specs programmatically
#[derive(Debug, Clone)]
pub struct QuerySpecBuilder {
    aggregate_func: String,
    aggregate_args: Vec<String>,
    combiner_func: String,
    combiner_args: Vec<String>,
}

impl QuerySpecBuilder {
    /// Create a new builder for the given aggregation function
    pub fn new(aggregate_func: impl Into<String>) -> Self {
        Self {
            aggregate_func: aggregate_func.into(),
            aggregate_args: Vec::new(),
            combiner_func: default_combiner_func(),
            combiner_args: Vec::new(),
        }
    }

    /// Set the aggregation function arguments
    pub fn aggregate_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.aggregate_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the combiner function
    pub fn combiner(mut self, name: impl Into<String>) -> Self {
        self.combiner_func = name.into();
        self
    }

    /// Set the combiner function arguments
    pub fn combiner_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.combiner_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Build the spec
    pub fn build(self) -> QuerySpec {
        QuerySpec {
            aggregate_func: self.aggregate_func,
            aggregate_args: self.aggregate_args,
            combiner_func: self.combiner_func,
            combiner_args: self.combiner_args,
        }
    }
}
