//! Expression compiler entry points.

use crate::aggregation::{Accumulator, AggregationImplementation};
use crate::block::{check_position, BlockBuilder, BlockRef};
use crate::codegen::{
    CallSite, CallSiteBinder, Fragment, GeneratorContext, GeneratorRegistry, RowCursor,
};
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult, EvalResult};
use crate::expression::{RowExpression, TypeChecker};
use crate::function::{BindingTarget, FunctionRegistry};
use crate::page::{Page, RowLayout};
use crate::session::Session;
use crate::signature::Signature;
use crate::types::{Type, Value};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Lowers expression trees into fragments.
///
/// Compilation is read-only with respect to row data. The compiled artifacts
/// are immutable and may be evaluated from any number of threads.
pub struct ExpressionCompiler {
    binder: CallSiteBinder,
    generators: GeneratorRegistry,
    config: CompilerConfig,
    cache: DashMap<(RowExpression, RowLayout), CompiledExpression>,
}

impl ExpressionCompiler {
    pub fn new(functions: Arc<FunctionRegistry>, config: CompilerConfig) -> Self {
        Self::with_generators(functions, config, GeneratorRegistry::new())
    }

    pub fn with_generators(
        functions: Arc<FunctionRegistry>,
        config: CompilerConfig,
        generators: GeneratorRegistry,
    ) -> Self {
        Self {
            binder: CallSiteBinder::new(functions),
            generators,
            config,
            cache: DashMap::new(),
        }
    }

    pub fn binder(&self) -> &CallSiteBinder {
        &self.binder
    }

    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        self.binder.functions()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Mutable generator table. Cached artifacts are dropped since they were
    /// produced by the previous generators.
    pub fn generators_mut(&mut self) -> &mut GeneratorRegistry {
        self.cache.clear();
        &mut self.generators
    }

    pub fn cached_expressions(&self) -> usize {
        self.cache.len()
    }

    fn check_depth(&self, expr: &RowExpression) -> CompileResult<()> {
        if expr.depth() > self.config.max_expression_depth {
            return Err(CompileError::ExpressionTooDeep {
                limit: self.config.max_expression_depth,
            });
        }
        Ok(())
    }

    /// Type check and generate code for a scalar expression
    pub fn compile(
        &self,
        expr: &RowExpression,
        layout: &RowLayout,
    ) -> CompileResult<CompiledExpression> {
        let key = (expr.clone(), layout.clone());
        if self.config.cache_compiled_expressions {
            if let Some(compiled) = self.cache.get(&key) {
                log::trace!("compiled expression cache hit for {}", expr);
                return Ok(compiled.value().clone());
            }
        }

        self.check_depth(expr)?;
        let output_type = TypeChecker::new(layout).check(expr)?;
        let context = GeneratorContext::new(&self.generators, &self.binder, layout);
        let fragment = context.generate(expr)?;
        log::debug!("compiled {} returning {}", expr, output_type);

        let compiled = CompiledExpression {
            expression: Arc::new(expr.clone()),
            input_layout: layout.clone(),
            output_type,
            fragment,
        };
        if self.config.cache_compiled_expressions {
            self.cache.insert(key, compiled.clone());
        }
        Ok(compiled)
    }

    /// Compile a predicate; its output must be boolean
    pub fn compile_filter(
        &self,
        expr: &RowExpression,
        layout: &RowLayout,
    ) -> CompileResult<CompiledExpression> {
        self.check_depth(expr)?;
        TypeChecker::new(layout).check_filter_predicate(expr)?;
        self.compile(expr, layout)
    }

    /// Compile an aggregate call such as `count(#2)`. The single argument
    /// must be an input reference.
    pub fn compile_aggregation(
        &self,
        expr: &RowExpression,
        layout: &RowLayout,
    ) -> CompileResult<CompiledAggregation> {
        let RowExpression::Call {
            signature,
            arguments,
        } = expr
        else {
            return Err(CompileError::NotAnAggregation {
                expression: expr.to_string(),
            });
        };

        self.check_depth(expr)?;
        TypeChecker::new(layout).check(expr)?;
        let [RowExpression::InputReference { channel, .. }] = arguments.as_slice() else {
            return Err(CompileError::InvalidAggregationInput {
                reason: format!("{} must take a single input reference", expr),
            });
        };

        let binding = self
            .binder
            .resolve(&CallSite::new(signature.clone(), arguments.clone()))?;
        let BindingTarget::Aggregation(implementation) = binding.target() else {
            return Err(CompileError::NotAnAggregation {
                expression: expr.to_string(),
            });
        };
        log::debug!(
            "compiled aggregation {} as {:?}",
            expr,
            implementation
        );

        Ok(CompiledAggregation {
            signature: signature.clone(),
            input_channel: *channel,
            binding_id: binding.binding_id(),
            implementation: Arc::clone(implementation),
        })
    }
}

impl fmt::Debug for ExpressionCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionCompiler")
            .field("binder", &self.binder)
            .field("generators", &self.generators)
            .field("config", &self.config)
            .field("cached_expressions", &self.cache.len())
            .finish()
    }
}

/// Executable form of a scalar expression
#[derive(Clone)]
pub struct CompiledExpression {
    expression: Arc<RowExpression>,
    input_layout: RowLayout,
    output_type: Type,
    fragment: Fragment,
}

impl CompiledExpression {
    pub fn expression(&self) -> &RowExpression {
        &self.expression
    }

    /// Layout the expression was compiled against
    pub fn input_layout(&self) -> &RowLayout {
        &self.input_layout
    }

    pub fn output_type(&self) -> Type {
        self.output_type
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Evaluate one row; `Value::Null` is the null flag
    pub fn evaluate(&self, session: &Session, page: &Page, position: usize) -> EvalResult<Value> {
        check_position(position, page.position_count())?;
        (self.fragment)(&RowCursor::new(session, page, position))
    }

    /// Evaluate every row of the page into a block of the output type
    pub fn evaluate_page(&self, session: &Session, page: &Page) -> EvalResult<BlockRef> {
        let mut builder = BlockBuilder::with_capacity(self.output_type, page.position_count());
        for position in 0..page.position_count() {
            let value = (self.fragment)(&RowCursor::new(session, page, position))?;
            builder.append_value(&value)?;
        }
        Ok(builder.build())
    }

    /// Evaluate the selected rows, in order, into a block
    pub fn evaluate_positions(
        &self,
        session: &Session,
        page: &Page,
        positions: &[usize],
    ) -> EvalResult<BlockRef> {
        let mut builder = BlockBuilder::with_capacity(self.output_type, positions.len());
        for &position in positions {
            builder.append_value(&self.evaluate(session, page, position)?)?;
        }
        Ok(builder.build())
    }

    /// Positions where a predicate is TRUE; NULL counts as false
    pub fn select_positions(&self, session: &Session, page: &Page) -> EvalResult<Vec<usize>> {
        let mut selected = Vec::new();
        for position in 0..page.position_count() {
            if (self.fragment)(&RowCursor::new(session, page, position))? == Value::Boolean(true) {
                selected.push(position);
            }
        }
        Ok(selected)
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("expression", &self.expression.to_string())
            .field("output_type", &self.output_type)
            .finish()
    }
}

/// Executable form of an aggregate call
#[derive(Debug, Clone)]
pub struct CompiledAggregation {
    signature: Signature,
    input_channel: usize,
    binding_id: u64,
    implementation: Arc<dyn AggregationImplementation>,
}

impl CompiledAggregation {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn input_channel(&self) -> usize {
        self.input_channel
    }

    pub fn binding_id(&self) -> u64 {
        self.binding_id
    }

    pub fn implementation(&self) -> &Arc<dyn AggregationImplementation> {
        &self.implementation
    }

    pub fn output_type(&self) -> Type {
        self.implementation.output_type()
    }

    pub fn create_accumulator(&self) -> Box<dyn Accumulator> {
        self.implementation.init()
    }

    /// Fold every row of the page
    pub fn accumulate_page(&self, accumulator: &mut dyn Accumulator, page: &Page) -> EvalResult<()> {
        accumulator.accumulate_block(page.block(self.input_channel)?.as_ref())
    }

    /// Fold one row of the page
    pub fn accumulate_position(
        &self,
        accumulator: &mut dyn Accumulator,
        page: &Page,
        position: usize,
    ) -> EvalResult<()> {
        accumulator.accumulate(page.block(self.input_channel)?.as_ref(), position)
    }

    /// Fold one sampled row that stands for `weight` rows
    pub fn accumulate_weighted(
        &self,
        accumulator: &mut dyn Accumulator,
        page: &Page,
        position: usize,
        weight: u64,
    ) -> EvalResult<()> {
        accumulator.accumulate_weighted(page.block(self.input_channel)?.as_ref(), position, weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{bigint_block, double_block, varchar_block};
    use crate::codegen::{fragment, Generator};
    use crate::error::EvaluationError;
    use crate::expression::ExpressionKind;
    use crate::function::ScalarFunction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn compiler() -> ExpressionCompiler {
        ExpressionCompiler::new(Arc::new(FunctionRegistry::new()), CompilerConfig::default())
    }

    fn session() -> Session {
        Session::new("tester")
    }

    fn bigint_binary(name: &str) -> Signature {
        Signature::new(name, Type::Bigint, vec![Type::Bigint, Type::Bigint])
    }

    #[test]
    fn test_add_column_and_constant() -> anyhow::Result<()> {
        let compiler = compiler();
        let expr = RowExpression::call(
            bigint_binary("add"),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(5)],
        );
        let layout = RowLayout::new(vec![Type::Bigint]);
        let compiled = compiler.compile(&expr, &layout)?;
        assert_eq!(compiled.output_type(), Type::Bigint);

        let page = Page::new(vec![bigint_block([Some(1), None, Some(10)])])?;
        assert_eq!(compiled.evaluate(&session(), &page, 2)?, Value::Bigint(15));
        assert_eq!(compiled.evaluate(&session(), &page, 1)?, Value::Null);
        assert!(matches!(
            compiled.evaluate(&session(), &page, 3),
            Err(EvaluationError::PositionOutOfBounds { .. })
        ));

        let output = compiled.evaluate_page(&session(), &page)?;
        assert_eq!(output.position_count(), 3);
        assert!(output.is_null(1)?);
        assert_eq!(output.get_long(0)?, 6);
        Ok(())
    }

    #[test]
    fn test_constants_and_inputs_round_trip() -> anyhow::Result<()> {
        let compiler = compiler();
        let page = Page::new(vec![
            varchar_block([Some("a"), None]),
            double_block([None, Some(2.5)]),
        ])?;
        let layout = page.layout();

        for constant in [
            RowExpression::bigint(7),
            RowExpression::varchar("x"),
            RowExpression::null(Type::Double),
        ] {
            let compiled = compiler.compile(&constant, &layout)?;
            let RowExpression::Constant { value, .. } = &constant else {
                unreachable!()
            };
            for position in 0..page.position_count() {
                assert_eq!(&compiled.evaluate(&session(), &page, position)?, value);
            }
        }

        for (channel, value_type) in [(0, Type::Varchar), (1, Type::Double)] {
            let compiled = compiler.compile(&RowExpression::input(channel, value_type), &layout)?;
            let block = page.block(channel)?;
            for position in 0..page.position_count() {
                let value = compiled.evaluate(&session(), &page, position)?;
                assert_eq!(value.is_null(), block.is_null(position)?);
                assert_eq!(value, block.get_object_value(&session(), position)?);
            }
        }
        Ok(())
    }

    #[test]
    fn test_null_argument_skips_later_arguments() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = FunctionRegistry::new();
        registry.register(ScalarFunction::new(
            Signature::new("tick", Type::Bigint, vec![]),
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Bigint(1))
            },
        ));
        let compiler =
            ExpressionCompiler::new(Arc::new(registry), CompilerConfig::default());

        let tick = RowExpression::call(Signature::new("tick", Type::Bigint, vec![]), vec![]);
        let expr = RowExpression::call(
            bigint_binary("add"),
            vec![RowExpression::input(0, Type::Bigint), tick],
        );
        let layout = RowLayout::new(vec![Type::Bigint]);
        let compiled = compiler.compile(&expr, &layout)?;
        let page = Page::new(vec![bigint_block([None, Some(2)])])?;

        assert_eq!(compiled.evaluate(&session(), &page, 0)?, Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(compiled.evaluate(&session(), &page, 1)?, Value::Bigint(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_errors_propagate_from_the_failing_operand() -> anyhow::Result<()> {
        let compiler = compiler();
        // (#0 / #1) + (#1 / #0)
        let expr = RowExpression::call(
            bigint_binary("add"),
            vec![
                RowExpression::call(
                    bigint_binary("divide"),
                    vec![
                        RowExpression::input(0, Type::Bigint),
                        RowExpression::input(1, Type::Bigint),
                    ],
                ),
                RowExpression::call(
                    bigint_binary("divide"),
                    vec![
                        RowExpression::input(1, Type::Bigint),
                        RowExpression::input(0, Type::Bigint),
                    ],
                ),
            ],
        );
        let layout = RowLayout::new(vec![Type::Bigint, Type::Bigint]);
        let compiled = compiler.compile(&expr, &layout)?;
        let page = Page::new(vec![
            bigint_block([Some(4), Some(0)]),
            bigint_block([Some(2), Some(3)]),
        ])?;
        assert_eq!(compiled.evaluate(&session(), &page, 0)?, Value::Bigint(2));
        assert_eq!(
            compiled.evaluate(&session(), &page, 1),
            Err(EvaluationError::DivisionByZero)
        );
        Ok(())
    }

    #[test]
    fn test_compile_errors() {
        let compiler = compiler();
        let layout = RowLayout::new(vec![Type::Bigint]);

        let missing = RowExpression::call(
            Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Boolean]),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::boolean(true)],
        );
        assert!(matches!(
            compiler.compile(&missing, &layout),
            Err(CompileError::FunctionNotFound { .. })
        ));

        let arity = RowExpression::call(bigint_binary("add"), vec![RowExpression::bigint(1)]);
        assert!(matches!(
            compiler.compile(&arity, &layout),
            Err(CompileError::ArityMismatch { .. })
        ));

        let aggregate = RowExpression::call(
            Signature::new("sum", Type::Bigint, vec![Type::Bigint]),
            vec![RowExpression::input(0, Type::Bigint)],
        );
        assert!(matches!(
            compiler.compile(&aggregate, &layout),
            Err(CompileError::AggregateInScalarContext { .. })
        ));

        assert!(matches!(
            compiler.compile_filter(&RowExpression::bigint(1), &layout),
            Err(CompileError::NonBooleanFilter { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let compiler = ExpressionCompiler::new(
            Arc::new(FunctionRegistry::new()),
            CompilerConfig::default().with_max_expression_depth(3),
        );
        let negate = Signature::new("negate", Type::Bigint, vec![Type::Bigint]);
        let mut expr = RowExpression::bigint(1);
        for _ in 0..3 {
            expr = RowExpression::call(negate.clone(), vec![expr]);
        }
        let layout = RowLayout::new(vec![]);
        assert_eq!(
            compiler.compile(&expr, &layout).err(),
            Some(CompileError::ExpressionTooDeep { limit: 3 })
        );
    }

    #[test]
    fn test_cache_and_binding_reuse() -> anyhow::Result<()> {
        let compiler = compiler();
        let layout = RowLayout::new(vec![Type::Bigint]);
        let expr = RowExpression::call(
            bigint_binary("multiply"),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(2)],
        );
        compiler.compile(&expr, &layout)?;
        compiler.compile(&expr.clone(), &layout)?;
        assert_eq!(compiler.cached_expressions(), 1);
        assert_eq!(compiler.binder().lookup_count(), 1);

        let uncached = ExpressionCompiler::new(
            Arc::new(FunctionRegistry::new()),
            CompilerConfig::default().without_cache(),
        );
        uncached.compile(&expr, &layout)?;
        uncached.compile(&expr, &layout)?;
        assert_eq!(uncached.cached_expressions(), 0);
        // the binder still resolves the call site once
        assert_eq!(uncached.binder().lookup_count(), 1);
        assert_eq!(uncached.binder().bound_call_sites(), 1);
        Ok(())
    }

    #[test]
    fn test_replace_generator() -> anyhow::Result<()> {
        fn doubled_constant(
            _context: &GeneratorContext<'_>,
            expr: &RowExpression,
        ) -> CompileResult<Fragment> {
            let value = match expr {
                RowExpression::Constant {
                    value: Value::Bigint(v),
                    ..
                } => Value::Bigint(v * 2),
                RowExpression::Constant { value, .. } => value.clone(),
                _ => unreachable!(),
            };
            Ok(fragment(move |_| Ok(value.clone())))
        }

        let mut compiler = compiler();
        let layout = RowLayout::new(vec![]);
        let page = Page::empty_with_positions(1);
        let expr = RowExpression::bigint(21);
        assert_eq!(
            compiler.compile(&expr, &layout)?.evaluate(&session(), &page, 0)?,
            Value::Bigint(21)
        );

        let replaced = compiler
            .generators_mut()
            .register(ExpressionKind::Constant, doubled_constant as Generator);
        assert!(replaced.is_some());
        assert_eq!(
            compiler.compile(&expr, &layout)?.evaluate(&session(), &page, 0)?,
            Value::Bigint(42)
        );
        Ok(())
    }

    #[test]
    fn test_compile_aggregation() -> anyhow::Result<()> {
        let compiler = compiler();
        let layout = RowLayout::new(vec![Type::Varchar, Type::Bigint]);
        let count = RowExpression::call(
            Signature::new("count", Type::Bigint, vec![Type::Varchar]),
            vec![RowExpression::input(0, Type::Varchar)],
        );
        let compiled = compiler.compile_aggregation(&count, &layout)?;
        assert_eq!(compiled.input_channel(), 0);
        assert_eq!(compiled.output_type(), Type::Bigint);

        let page = Page::new(vec![
            varchar_block([None, Some("a"), None, Some("b"), None]),
            bigint_block([Some(1); 5]),
        ])?;
        let mut accumulator = compiled.create_accumulator();
        compiled.accumulate_page(accumulator.as_mut(), &page)?;
        assert_eq!(accumulator.evaluate(), Value::Bigint(2));

        let scalar = RowExpression::call(
            Signature::new("negate", Type::Bigint, vec![Type::Bigint]),
            vec![RowExpression::input(1, Type::Bigint)],
        );
        assert!(matches!(
            compiler.compile_aggregation(&scalar, &layout),
            Err(CompileError::NotAnAggregation { .. })
        ));

        let nested = RowExpression::call(
            Signature::new("sum", Type::Bigint, vec![Type::Bigint]),
            vec![RowExpression::call(
                Signature::new("negate", Type::Bigint, vec![Type::Bigint]),
                vec![RowExpression::input(1, Type::Bigint)],
            )],
        );
        assert!(matches!(
            compiler.compile_aggregation(&nested, &layout),
            Err(CompileError::InvalidAggregationInput { .. })
        ));
        assert!(matches!(
            compiler.compile_aggregation(&RowExpression::bigint(1), &layout),
            Err(CompileError::NotAnAggregation { .. })
        ));
        Ok(())
    }
}
