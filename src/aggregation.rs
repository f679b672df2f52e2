//! Type-specialized aggregation.
//!
//! Each algorithm is written once as an [`AggregationTemplate`] over a
//! [`NativeType`] marker. The [`AggregationFactory`] registers one
//! monomorphized [`SpecializedAggregation`] per supported (algorithm, type)
//! pair, so the per-row path reads native values straight out of the block
//! with no boxing and no dispatch to a generic "any type" accumulator.
//!
//! Empty-input conventions:
//! - `count` -> 0
//! - `sum`, `avg`, `min`, `max` -> NULL
//! - `approx_count` -> `"0 +/- Infinity"`

pub mod approximate_count;
pub mod average;
pub mod count;
pub mod factory;
pub mod min_max;
pub mod native;
pub mod specialized;
pub mod sum;

pub use approximate_count::ApproximateCountAggregation;
pub use average::AverageAggregation;
pub use count::CountAggregation;
pub use factory::AggregationFactory;
pub use min_max::{MaxAggregation, MinAggregation};
pub use native::{BigintType, BooleanType, DoubleType, NativeType, VarcharType};
pub use specialized::{AggregationTemplate, SpecializedAccumulator, SpecializedAggregation};
pub use sum::SumAggregation;

use crate::block::Block;
use crate::error::{CompileError, CompileResult, EvalResult};
use crate::types::{Type, Value};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Supported aggregation algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregationKind {
    /// COUNT(expr) - counts non-NULL values
    Count,
    /// SUM(expr) - sums numeric values, ignoring NULLs
    Sum,
    /// AVG(expr) - average of numeric values, ignoring NULLs
    Avg,
    /// MIN(expr) - minimum value, ignoring NULLs
    Min,
    /// MAX(expr) - maximum value, ignoring NULLs
    Max,
    /// Sampled COUNT(expr) reported with an error bound
    ApproximateCount,
}

impl AggregationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Sum => "sum",
            AggregationKind::Avg => "avg",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
            AggregationKind::ApproximateCount => "approx_count",
        }
    }

    /// Look up an algorithm by function name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(AggregationKind::Count),
            "sum" => Some(AggregationKind::Sum),
            "avg" => Some(AggregationKind::Avg),
            "min" => Some(AggregationKind::Min),
            "max" => Some(AggregationKind::Max),
            "approx_count" => Some(AggregationKind::ApproximateCount),
            _ => None,
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters fixed when a specialization is built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationParameters {
    /// Confidence level of approximate results, in (0, 1)
    pub confidence: f64,
}

impl Default for AggregationParameters {
    fn default() -> Self {
        Self { confidence: 0.95 }
    }
}

impl AggregationParameters {
    pub fn with_confidence(confidence: f64) -> Self {
        Self { confidence }
    }

    pub fn validate(&self) -> CompileResult<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(CompileError::InvalidParameter {
                name: "confidence",
                reason: format!("{} is not in the open interval (0, 1)", self.confidence),
            });
        }
        Ok(())
    }
}

/// A concrete aggregation for one algorithm and one input type.
///
/// Implementations are stateless and shared; per-group state lives in the
/// [`Accumulator`]s they create.
pub trait AggregationImplementation: Send + Sync + fmt::Debug {
    fn kind(&self) -> AggregationKind;

    fn input_type(&self) -> Type;

    fn output_type(&self) -> Type;

    fn parameters(&self) -> &AggregationParameters;

    /// Fresh accumulator in the algorithm's "no rows" state
    fn init(&self) -> Box<dyn Accumulator>;

    /// Rebuild an accumulator from [`Accumulator::serialize`] output
    fn deserialize(&self, bytes: &[u8]) -> EvalResult<Box<dyn Accumulator>>;
}

/// Partial aggregation state.
///
/// Null positions never contribute. `merge` is associative and commutative;
/// callers must not merge into the same destination from two threads.
pub trait Accumulator: Send + fmt::Debug {
    fn kind(&self) -> AggregationKind;

    fn input_type(&self) -> Type;

    /// Fold the value at `position` into the state
    fn accumulate(&mut self, block: &dyn Block, position: usize) -> EvalResult<()> {
        self.accumulate_weighted(block, position, 1)
    }

    /// Fold a sampled row that stands for `weight` rows
    fn accumulate_weighted(
        &mut self,
        block: &dyn Block,
        position: usize,
        weight: u64,
    ) -> EvalResult<()>;

    /// Fold every position of the block
    fn accumulate_block(&mut self, block: &dyn Block) -> EvalResult<()>;

    /// Combine another partial state of the same specialization into this one
    fn merge(&mut self, other: &dyn Accumulator) -> EvalResult<()>;

    /// Final output value
    fn evaluate(&self) -> Value;

    /// Serialize the partial state for an exchange between nodes
    fn serialize(&self) -> EvalResult<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        for kind in [
            AggregationKind::Count,
            AggregationKind::Sum,
            AggregationKind::Avg,
            AggregationKind::Min,
            AggregationKind::Max,
            AggregationKind::ApproximateCount,
        ] {
            assert_eq!(AggregationKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AggregationKind::from_name("median"), None);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(AggregationParameters::default().validate().is_ok());
        assert!(AggregationParameters::with_confidence(0.0).validate().is_err());
        assert!(AggregationParameters::with_confidence(1.0).validate().is_err());
        assert!(AggregationParameters::with_confidence(f64::NAN).validate().is_err());
    }
}
