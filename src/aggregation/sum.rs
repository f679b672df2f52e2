//! SUM(expr), specialized for BIGINT (checked) and DOUBLE.

use crate::aggregation::{
    AggregationKind, AggregationParameters, AggregationTemplate, BigintType, DoubleType,
};
use crate::error::{EvalResult, EvaluationError};
use crate::types::{Type, Value};

/// Sums non-null values; NULL over empty input
pub struct SumAggregation;

impl AggregationTemplate<BigintType> for SumAggregation {
    type State = Option<i64>;

    const KIND: AggregationKind = AggregationKind::Sum;

    fn output_type() -> Type {
        Type::Bigint
    }

    fn init(_parameters: &AggregationParameters) -> Option<i64> {
        None
    }

    fn input(state: &mut Option<i64>, value: i64, weight: u64) -> EvalResult<()> {
        let weighted = i64::try_from(weight)
            .ok()
            .and_then(|w| value.checked_mul(w))
            .ok_or_else(overflow)?;
        let sum = state.unwrap_or(0).checked_add(weighted).ok_or_else(overflow)?;
        *state = Some(sum);
        Ok(())
    }

    fn combine(state: &mut Option<i64>, other: &Option<i64>) -> EvalResult<()> {
        if let Some(other) = other {
            let sum = state.unwrap_or(0).checked_add(*other).ok_or_else(overflow)?;
            *state = Some(sum);
        }
        Ok(())
    }

    fn output(state: &Option<i64>) -> Value {
        state.map(Value::Bigint).unwrap_or(Value::Null)
    }
}

impl AggregationTemplate<DoubleType> for SumAggregation {
    type State = Option<f64>;

    const KIND: AggregationKind = AggregationKind::Sum;

    fn output_type() -> Type {
        Type::Double
    }

    fn init(_parameters: &AggregationParameters) -> Option<f64> {
        None
    }

    fn input(state: &mut Option<f64>, value: f64, weight: u64) -> EvalResult<()> {
        *state = Some(state.unwrap_or(0.0) + value * weight as f64);
        Ok(())
    }

    fn combine(state: &mut Option<f64>, other: &Option<f64>) -> EvalResult<()> {
        if let Some(other) = other {
            *state = Some(state.unwrap_or(0.0) + other);
        }
        Ok(())
    }

    fn output(state: &Option<f64>) -> Value {
        state.map(Value::Double).unwrap_or(Value::Null)
    }
}

fn overflow() -> EvaluationError {
    EvaluationError::Overflow {
        operation: "sum".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{AggregationImplementation, SpecializedAggregation};
    use crate::block::{bigint_block, double_block};

    #[test]
    fn test_sum_bigint() -> EvalResult<()> {
        let aggregation: SpecializedAggregation<SumAggregation, BigintType> =
            SpecializedAggregation::new(AggregationParameters::default());
        let mut accumulator = aggregation.init();
        assert_eq!(accumulator.evaluate(), Value::Null);

        accumulator.accumulate_block(bigint_block([Some(3), None, Some(-1)]).as_ref())?;
        assert_eq!(accumulator.evaluate(), Value::Bigint(2));
        Ok(())
    }

    #[test]
    fn test_sum_bigint_overflow() {
        let aggregation: SpecializedAggregation<SumAggregation, BigintType> =
            SpecializedAggregation::new(AggregationParameters::default());
        let mut accumulator = aggregation.init();
        let result = accumulator.accumulate_block(bigint_block([Some(i64::MAX), Some(1)]).as_ref());
        assert!(matches!(result, Err(EvaluationError::Overflow { .. })));
    }

    #[test]
    fn test_sum_all_null_is_null() -> EvalResult<()> {
        let aggregation: SpecializedAggregation<SumAggregation, DoubleType> =
            SpecializedAggregation::new(AggregationParameters::default());
        let mut accumulator = aggregation.init();
        accumulator.accumulate_block(double_block([None, None]).as_ref())?;
        assert_eq!(accumulator.evaluate(), Value::Null);

        accumulator.accumulate_block(double_block([Some(0.5), Some(0.25)]).as_ref())?;
        assert_eq!(accumulator.evaluate(), Value::Double(0.75));
        Ok(())
    }
}
