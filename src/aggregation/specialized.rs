//! Monomorphized aggregation specializations.

use crate::aggregation::{
    Accumulator, AggregationImplementation, AggregationKind, AggregationParameters, NativeType,
};
use crate::block::Block;
use crate::error::{EvalResult, EvaluationError};
use crate::types::{Type, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// Type-independent description of an aggregation algorithm.
///
/// `input` only ever sees non-null values; null positions are skipped by
/// the specialization before the template is called.
pub trait AggregationTemplate<T: NativeType>: Send + Sync + 'static {
    type State: Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static;

    const KIND: AggregationKind;

    fn output_type() -> Type;

    fn init(parameters: &AggregationParameters) -> Self::State;

    fn input(state: &mut Self::State, value: T::Native<'_>, weight: u64) -> EvalResult<()>;

    fn combine(state: &mut Self::State, other: &Self::State) -> EvalResult<()>;

    fn output(state: &Self::State) -> Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StateHeader {
    kind: AggregationKind,
    input_type: Type,
}

#[derive(Serialize)]
struct PartialStateRef<'a, S> {
    header: StateHeader,
    state: &'a S,
}

#[derive(Deserialize)]
struct PartialState<S> {
    #[allow(dead_code)]
    header: StateHeader,
    state: S,
}

/// The aggregation template `A` instantiated for the native type `T`
pub struct SpecializedAggregation<A, T> {
    parameters: AggregationParameters,
    _template: PhantomData<fn() -> (A, T)>,
}

impl<A, T> SpecializedAggregation<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    pub fn new(parameters: AggregationParameters) -> Self {
        Self {
            parameters,
            _template: PhantomData,
        }
    }
}

impl<A, T> fmt::Debug for SpecializedAggregation<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecializedAggregation")
            .field("kind", &A::KIND)
            .field("input_type", &T::TYPE)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl<A, T> AggregationImplementation for SpecializedAggregation<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    fn kind(&self) -> AggregationKind {
        A::KIND
    }

    fn input_type(&self) -> Type {
        T::TYPE
    }

    fn output_type(&self) -> Type {
        A::output_type()
    }

    fn parameters(&self) -> &AggregationParameters {
        &self.parameters
    }

    fn init(&self) -> Box<dyn Accumulator> {
        Box::new(SpecializedAccumulator::<A, T>::new(A::init(&self.parameters)))
    }

    fn deserialize(&self, bytes: &[u8]) -> EvalResult<Box<dyn Accumulator>> {
        let header: StateHeader = bincode::deserialize(bytes)
            .map_err(|e| EvaluationError::StateSerialization(e.to_string()))?;
        let expected = StateHeader {
            kind: A::KIND,
            input_type: T::TYPE,
        };
        if header != expected {
            return Err(EvaluationError::IncompatibleState {
                reason: format!(
                    "state of {}({}) cannot be read as {}({})",
                    header.kind, header.input_type, expected.kind, expected.input_type
                ),
            });
        }
        let partial: PartialState<A::State> = bincode::deserialize(bytes)
            .map_err(|e| EvaluationError::StateSerialization(e.to_string()))?;
        Ok(Box::new(SpecializedAccumulator::<A, T>::new(partial.state)))
    }
}

/// Accumulator for one specialization; holds the template state unboxed
pub struct SpecializedAccumulator<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    state: A::State,
    _template: PhantomData<fn() -> (A, T)>,
}

impl<A, T> SpecializedAccumulator<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    pub fn new(state: A::State) -> Self {
        Self {
            state,
            _template: PhantomData,
        }
    }

    pub fn state(&self) -> &A::State {
        &self.state
    }

    fn check_block_type(block: &dyn Block) -> EvalResult<()> {
        if block.block_type() != T::TYPE {
            return Err(EvaluationError::TypeMismatch {
                expected: T::TYPE,
                actual: block.block_type().to_string(),
                context: format!("{} aggregation input", A::KIND),
            });
        }
        Ok(())
    }
}

impl<A, T> fmt::Debug for SpecializedAccumulator<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecializedAccumulator")
            .field("kind", &A::KIND)
            .field("input_type", &T::TYPE)
            .field("state", &self.state)
            .finish()
    }
}

impl<A, T> Accumulator for SpecializedAccumulator<A, T>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    fn kind(&self) -> AggregationKind {
        A::KIND
    }

    fn input_type(&self) -> Type {
        T::TYPE
    }

    fn accumulate_weighted(
        &mut self,
        block: &dyn Block,
        position: usize,
        weight: u64,
    ) -> EvalResult<()> {
        Self::check_block_type(block)?;
        if block.is_null(position)? {
            return Ok(());
        }
        A::input(&mut self.state, T::read(block, position)?, weight)
    }

    fn accumulate_block(&mut self, block: &dyn Block) -> EvalResult<()> {
        Self::check_block_type(block)?;
        for position in 0..block.position_count() {
            if block.is_null(position)? {
                continue;
            }
            A::input(&mut self.state, T::read(block, position)?, 1)?;
        }
        Ok(())
    }

    fn merge(&mut self, other: &dyn Accumulator) -> EvalResult<()> {
        let other = other.as_any().downcast_ref::<Self>().ok_or_else(|| {
            EvaluationError::IncompatibleState {
                reason: format!(
                    "cannot merge {}({}) into {}({})",
                    other.kind(),
                    other.input_type(),
                    A::KIND,
                    T::TYPE
                ),
            }
        })?;
        A::combine(&mut self.state, &other.state)
    }

    fn evaluate(&self) -> Value {
        A::output(&self.state)
    }

    fn serialize(&self) -> EvalResult<Vec<u8>> {
        let partial = PartialStateRef {
            header: StateHeader {
                kind: A::KIND,
                input_type: T::TYPE,
            },
            state: &self.state,
        };
        bincode::serialize(&partial).map_err(|e| EvaluationError::StateSerialization(e.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
