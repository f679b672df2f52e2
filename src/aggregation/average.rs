//! AVG(expr), specialized for BIGINT and DOUBLE; always yields DOUBLE.

use crate::aggregation::{
    AggregationKind, AggregationParameters, AggregationTemplate, BigintType, DoubleType,
};
use crate::error::{EvalResult, EvaluationError};
use crate::types::{Type, Value};
use serde::{Deserialize, Serialize};

/// Running count and sum
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AverageState<S> {
    pub count: u64,
    pub sum: S,
}

/// Averages non-null values; NULL over empty input
pub struct AverageAggregation;

impl AggregationTemplate<BigintType> for AverageAggregation {
    type State = AverageState<i64>;

    const KIND: AggregationKind = AggregationKind::Avg;

    fn output_type() -> Type {
        Type::Double
    }

    fn init(_parameters: &AggregationParameters) -> Self::State {
        AverageState::default()
    }

    fn input(state: &mut Self::State, value: i64, weight: u64) -> EvalResult<()> {
        let weighted = i64::try_from(weight)
            .ok()
            .and_then(|w| value.checked_mul(w))
            .ok_or_else(overflow)?;
        state.sum = state.sum.checked_add(weighted).ok_or_else(overflow)?;
        state.count = state.count.checked_add(weight).ok_or_else(overflow)?;
        Ok(())
    }

    fn combine(state: &mut Self::State, other: &Self::State) -> EvalResult<()> {
        state.sum = state.sum.checked_add(other.sum).ok_or_else(overflow)?;
        state.count = state.count.checked_add(other.count).ok_or_else(overflow)?;
        Ok(())
    }

    fn output(state: &Self::State) -> Value {
        if state.count == 0 {
            return Value::Null;
        }
        Value::Double(state.sum as f64 / state.count as f64)
    }
}

impl AggregationTemplate<DoubleType> for AverageAggregation {
    type State = AverageState<f64>;

    const KIND: AggregationKind = AggregationKind::Avg;

    fn output_type() -> Type {
        Type::Double
    }

    fn init(_parameters: &AggregationParameters) -> Self::State {
        AverageState::default()
    }

    fn input(state: &mut Self::State, value: f64, weight: u64) -> EvalResult<()> {
        state.count = state.count.checked_add(weight).ok_or_else(overflow)?;
        state.sum += value * weight as f64;
        Ok(())
    }

    fn combine(state: &mut Self::State, other: &Self::State) -> EvalResult<()> {
        state.count = state.count.checked_add(other.count).ok_or_else(overflow)?;
        state.sum += other.sum;
        Ok(())
    }

    fn output(state: &Self::State) -> Value {
        if state.count == 0 {
            return Value::Null;
        }
        Value::Double(state.sum / state.count as f64)
    }
}

fn overflow() -> EvaluationError {
    EvaluationError::Overflow {
        operation: "avg".to_string(),
    }
}
