//! Signature lookup for scalar and aggregation functions.

use crate::aggregation::{
    AggregationFactory, AggregationImplementation, AggregationKind, AggregationParameters,
};
use crate::error::{CompileError, CompileResult};
use crate::function::builtins::builtin_functions;
use crate::function::ScalarFunction;
use crate::signature::Signature;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a signature resolves to
#[derive(Clone)]
pub enum BindingTarget {
    Scalar(Arc<ScalarFunction>),
    Aggregation(Arc<dyn AggregationImplementation>),
}

impl BindingTarget {
    pub fn is_aggregation(&self) -> bool {
        matches!(self, BindingTarget::Aggregation(_))
    }
}

impl fmt::Debug for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingTarget::Scalar(function) => {
                f.debug_tuple("Scalar").field(function.signature()).finish()
            }
            BindingTarget::Aggregation(aggregation) => f
                .debug_tuple("Aggregation")
                .field(&aggregation.kind())
                .field(&aggregation.input_type())
                .finish(),
        }
    }
}

/// Function table queried by the call-site binder
pub struct FunctionRegistry {
    scalars: HashMap<Signature, Arc<ScalarFunction>>,
    aggregations: &'static AggregationFactory,
    aggregation_parameters: AggregationParameters,
}

impl FunctionRegistry {
    /// Registry holding every built-in scalar function
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for function in builtin_functions() {
            registry.register(function);
        }
        registry
    }

    /// Registry with no scalar functions; aggregations still resolve
    pub fn empty() -> Self {
        Self {
            scalars: HashMap::new(),
            aggregations: AggregationFactory::global(),
            aggregation_parameters: AggregationParameters::default(),
        }
    }

    /// Parameters applied to every aggregation this registry resolves
    pub fn with_aggregation_parameters(
        mut self,
        parameters: AggregationParameters,
    ) -> CompileResult<Self> {
        parameters.validate()?;
        self.aggregation_parameters = parameters;
        Ok(self)
    }

    /// Register a scalar function, replacing any function with the same signature
    pub fn register(&mut self, function: ScalarFunction) -> Option<Arc<ScalarFunction>> {
        self.scalars
            .insert(function.signature().clone(), Arc::new(function))
    }

    pub fn aggregation_parameters(&self) -> &AggregationParameters {
        &self.aggregation_parameters
    }

    pub fn scalar_count(&self) -> usize {
        self.scalars.len()
    }

    /// Resolve a signature to a scalar implementation or an aggregation
    /// specialization. Fails with `FunctionNotFound` when neither matches the
    /// name, argument types and return type.
    pub fn resolve(&self, signature: &Signature) -> CompileResult<BindingTarget> {
        if let Some(function) = self.scalars.get(signature) {
            return Ok(BindingTarget::Scalar(Arc::clone(function)));
        }
        if let Some(aggregation) = self.resolve_aggregation(signature)? {
            return Ok(BindingTarget::Aggregation(aggregation));
        }
        Err(CompileError::FunctionNotFound {
            signature: signature.clone(),
        })
    }

    fn resolve_aggregation(
        &self,
        signature: &Signature,
    ) -> CompileResult<Option<Arc<dyn AggregationImplementation>>> {
        let Some(kind) = AggregationKind::from_name(signature.name()) else {
            return Ok(None);
        };
        let [input_type] = signature.argument_types() else {
            return Ok(None);
        };
        if !self.aggregations.supports(kind, *input_type) {
            return Ok(None);
        }
        let aggregation =
            self.aggregations
                .build_with(kind, *input_type, self.aggregation_parameters)?;
        if aggregation.output_type() != signature.return_type() {
            return Ok(None);
        }
        Ok(Some(aggregation))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("scalars", &self.scalars.len())
            .field("aggregation_parameters", &self.aggregation_parameters)
            .finish()
    }
}
