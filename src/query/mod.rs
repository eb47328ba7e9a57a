//! Query descriptors, validation, and planning
//!
//! Turns raw query descriptors into executable plans:
//!
//! - **spec**: Raw query descriptor as submitted by callers
//! - **registry**: Static catalog of aggregation and combiner functions
//! - **validate**: Arity/type/shape validation producing a plan
//! - **plan**: Executable plan shared across partition tasks
//! - **error**: Error types
//!
//! # Validation Pipeline
//!
//! ```text
//! QuerySpec → resolve names → shape check → arity → parse → ExecutionPlan
//! ```
//!
//! # Example
//!
//! ```rust
//! use conflux::query::{validate, QuerySpec};
//! use conflux::store::{DatasetRef, Schema};
//!
//! let schema = Schema::new(DatasetRef::from("gauges"), "timestamp", ["min"]);
//! let spec = QuerySpec::aggregate("sum")
//!     .aggregate_args(["min"])
//!     .combiner("histogram")
//!     .combiner_args(["2000"])
//!     .build();
//!
//! let plan = validate(&spec, &schema).expect("valid spec");
//! assert_eq!(plan.columns, vec!["min"]);
//! ```

pub mod error;
pub mod plan;
pub mod registry;
pub mod spec;
pub mod validate;

pub use error::{QueryError, QueryResult};
pub use plan::{ArgValue, ExecutionPlan};
pub use registry::{AggregateKind, ArgKind, CombinerKind, FunctionDescriptor, OutputShape};
pub use spec::{QuerySpec, QuerySpecBuilder};
pub use validate::{validate, MAX_BUCKETS};
