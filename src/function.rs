//! Function resolution.
//!
//! Scalar functions are registered by full signature; aggregation functions
//! are resolved through the [`crate::aggregation::AggregationFactory`]. The
//! [`FunctionRegistry`] is the table the call-site binder queries.

pub mod builtins;
pub mod registry;
pub mod scalar;

pub use registry::{BindingTarget, FunctionRegistry};
pub use scalar::{ScalarFunction, ScalarImplementation};
