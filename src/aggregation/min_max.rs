//! MIN(expr) and MAX(expr) over any orderable native type.

use crate::aggregation::{AggregationKind, AggregationParameters, AggregationTemplate, NativeType};
use crate::error::EvalResult;
use crate::types::{Type, Value};
use std::cmp::Ordering;

/// Smallest non-null value; NULL over empty input
pub struct MinAggregation;

/// Largest non-null value; NULL over empty input
pub struct MaxAggregation;

fn keep<T: NativeType>(state: &mut Option<T::Owned>, value: T::Native<'_>, wanted: Ordering) {
    let replace = match state {
        None => true,
        Some(current) => T::compare(value, current) == wanted,
    };
    if replace {
        *state = Some(T::into_owned(value));
    }
}

fn keep_owned<T: NativeType>(state: &mut Option<T::Owned>, other: &Option<T::Owned>, wanted: Ordering) {
    if let Some(other) = other {
        let replace = match state {
            None => true,
            Some(current) => T::compare_owned(other, current) == wanted,
        };
        if replace {
            *state = Some(other.clone());
        }
    }
}

impl<T: NativeType> AggregationTemplate<T> for MinAggregation {
    type State = Option<T::Owned>;

    const KIND: AggregationKind = AggregationKind::Min;

    fn output_type() -> Type {
        T::TYPE
    }

    fn init(_parameters: &AggregationParameters) -> Self::State {
        None
    }

    fn input(state: &mut Self::State, value: T::Native<'_>, _weight: u64) -> EvalResult<()> {
        keep::<T>(state, value, Ordering::Less);
        Ok(())
    }

    fn combine(state: &mut Self::State, other: &Self::State) -> EvalResult<()> {
        keep_owned::<T>(state, other, Ordering::Less);
        Ok(())
    }

    fn output(state: &Self::State) -> Value {
        state.as_ref().map(T::to_value).unwrap_or(Value::Null)
    }
}

impl<T: NativeType> AggregationTemplate<T> for MaxAggregation {
    type State = Option<T::Owned>;

    const KIND: AggregationKind = AggregationKind::Max;

    fn output_type() -> Type {
        T::TYPE
    }

    fn init(_parameters: &AggregationParameters) -> Self::State {
        None
    }

    fn input(state: &mut Self::State, value: T::Native<'_>, _weight: u64) -> EvalResult<()> {
        keep::<T>(state, value, Ordering::Greater);
        Ok(())
    }

    fn combine(state: &mut Self::State, other: &Self::State) -> EvalResult<()> {
        keep_owned::<T>(state, other, Ordering::Greater);
        Ok(())
    }

    fn output(state: &Self::State) -> Value {
        state.as_ref().map(T::to_value).unwrap_or(Value::Null)
    }
}
