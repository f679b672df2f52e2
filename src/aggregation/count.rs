//! COUNT(expr): number of non-null input rows.

use crate::aggregation::{AggregationKind, AggregationParameters, AggregationTemplate, NativeType};
use crate::error::{EvalResult, EvaluationError};
use crate::types::{Type, Value};

/// Counts non-null values; 0 over empty input
pub struct CountAggregation;

impl<T: NativeType> AggregationTemplate<T> for CountAggregation {
    type State = i64;

    const KIND: AggregationKind = AggregationKind::Count;

    fn output_type() -> Type {
        Type::Bigint
    }

    fn init(_parameters: &AggregationParameters) -> i64 {
        0
    }

    fn input(state: &mut i64, _value: T::Native<'_>, weight: u64) -> EvalResult<()> {
        *state = i64::try_from(weight)
            .ok()
            .and_then(|w| state.checked_add(w))
            .ok_or_else(overflow)?;
        Ok(())
    }

    fn combine(state: &mut i64, other: &i64) -> EvalResult<()> {
        *state = state.checked_add(*other).ok_or_else(overflow)?;
        Ok(())
    }

    fn output(state: &i64) -> Value {
        Value::Bigint(*state)
    }
}

fn overflow() -> EvaluationError {
    EvaluationError::Overflow {
        operation: "count".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{AggregationImplementation, BooleanType, SpecializedAggregation};
    use crate::block::boolean_block;

    #[test]
    fn test_count_boolean() -> EvalResult<()> {
        let aggregation: SpecializedAggregation<CountAggregation, BooleanType> =
            SpecializedAggregation::new(AggregationParameters::default());
        let mut accumulator = aggregation.init();
        assert_eq!(accumulator.evaluate(), Value::Bigint(0));

        // false is a value, not a null
        accumulator.accumulate_block(boolean_block([Some(false), None, Some(true)]).as_ref())?;
        assert_eq!(accumulator.evaluate(), Value::Bigint(2));

        let block = boolean_block([Some(true)]);
        accumulator.accumulate_weighted(block.as_ref(), 0, 10)?;
        assert_eq!(accumulator.evaluate(), Value::Bigint(12));
        Ok(())
    }
}
