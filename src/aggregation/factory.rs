//! Table of aggregation specializations.

use crate::aggregation::{
    AggregationImplementation, AggregationKind, AggregationParameters, AggregationTemplate,
    ApproximateCountAggregation, AverageAggregation, BigintType, BooleanType, CountAggregation,
    DoubleType, MaxAggregation, MinAggregation, NativeType, SpecializedAggregation,
    SumAggregation, VarcharType,
};
use crate::error::{CompileError, CompileResult};
use crate::types::Type;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

type Constructor = fn(AggregationParameters) -> Arc<dyn AggregationImplementation>;

fn specialize<A, T>(parameters: AggregationParameters) -> Arc<dyn AggregationImplementation>
where
    T: NativeType,
    A: AggregationTemplate<T>,
{
    Arc::new(SpecializedAggregation::<A, T>::new(parameters))
}

/// Maps `(algorithm, input type)` to the constructor of its specialization.
///
/// The table is filled once; lookups never allocate a new code path.
pub struct AggregationFactory {
    constructors: HashMap<(AggregationKind, Type), Constructor>,
}

impl AggregationFactory {
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };

        factory.register_for_every_type::<CountAggregation>();
        factory.register_for_every_type::<MinAggregation>();
        factory.register_for_every_type::<MaxAggregation>();
        factory.register_for_every_type::<ApproximateCountAggregation>();

        factory.register::<SumAggregation, BigintType>();
        factory.register::<SumAggregation, DoubleType>();
        factory.register::<AverageAggregation, BigintType>();
        factory.register::<AverageAggregation, DoubleType>();

        log::debug!(
            "aggregation factory built with {} specializations",
            factory.constructors.len()
        );
        factory
    }

    /// Process-wide factory, built on first use
    pub fn global() -> &'static AggregationFactory {
        static FACTORY: OnceLock<AggregationFactory> = OnceLock::new();
        FACTORY.get_or_init(AggregationFactory::new)
    }

    fn register<A, T>(&mut self)
    where
        T: NativeType,
        A: AggregationTemplate<T>,
    {
        self.constructors
            .insert((A::KIND, T::TYPE), specialize::<A, T> as Constructor);
    }

    fn register_for_every_type<A>(&mut self)
    where
        A: AggregationTemplate<BooleanType>
            + AggregationTemplate<BigintType>
            + AggregationTemplate<DoubleType>
            + AggregationTemplate<VarcharType>,
    {
        self.register::<A, BooleanType>();
        self.register::<A, BigintType>();
        self.register::<A, DoubleType>();
        self.register::<A, VarcharType>();
    }

    /// Specialization with default parameters
    pub fn build(
        &self,
        kind: AggregationKind,
        input_type: Type,
    ) -> CompileResult<Arc<dyn AggregationImplementation>> {
        self.build_with(kind, input_type, AggregationParameters::default())
    }

    pub fn build_with(
        &self,
        kind: AggregationKind,
        input_type: Type,
        parameters: AggregationParameters,
    ) -> CompileResult<Arc<dyn AggregationImplementation>> {
        parameters.validate()?;
        let constructor = self.constructors.get(&(kind, input_type)).ok_or(
            CompileError::UnsupportedAggregation {
                kind,
                value_type: input_type,
            },
        )?;
        Ok(constructor(parameters))
    }

    pub fn supports(&self, kind: AggregationKind, input_type: Type) -> bool {
        self.constructors.contains_key(&(kind, input_type))
    }

    /// Registered pairs in a stable order
    pub fn specializations(&self) -> Vec<(AggregationKind, Type)> {
        let mut pairs: Vec<_> = self.constructors.keys().copied().collect();
        pairs.sort();
        pairs
    }
}

impl Default for AggregationFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AggregationFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationFactory")
            .field("specializations", &self.specializations())
            .finish()
    }
}
