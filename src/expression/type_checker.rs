//! Type checking for expression trees.

use crate::error::{CompileError, CompileResult};
use crate::expression::RowExpression;
use crate::page::RowLayout;
use crate::types::Type;

/// Validates a tree against a row layout before code generation
pub struct TypeChecker<'a> {
    /// Types of the input channels
    layout: &'a RowLayout,
}

impl<'a> TypeChecker<'a> {
    pub fn new(layout: &'a RowLayout) -> Self {
        Self { layout }
    }

    /// Type check an expression and return its output type
    pub fn check(&self, expr: &RowExpression) -> CompileResult<Type> {
        match expr {
            RowExpression::Constant { value_type, value } => {
                if !value.is_compatible_with(*value_type) {
                    return Err(CompileError::ConstantTypeMismatch {
                        expected: *value_type,
                        value: value.to_string(),
                    });
                }
                Ok(*value_type)
            }

            RowExpression::InputReference {
                value_type,
                channel,
            } => {
                let actual = self.layout.channel_type(*channel).ok_or(
                    CompileError::ChannelOutOfBounds {
                        channel: *channel,
                        channel_count: self.layout.channel_count(),
                    },
                )?;
                if actual != *value_type {
                    return Err(CompileError::ChannelTypeMismatch {
                        channel: *channel,
                        expected: *value_type,
                        actual,
                    });
                }
                Ok(actual)
            }

            RowExpression::Call {
                signature,
                arguments,
            } => {
                if arguments.len() != signature.arity() {
                    return Err(CompileError::ArityMismatch {
                        signature: signature.clone(),
                        expected: signature.arity(),
                        actual: arguments.len(),
                    });
                }
                for (index, (argument, expected)) in arguments
                    .iter()
                    .zip(signature.argument_types())
                    .enumerate()
                {
                    let actual = self.check(argument)?;
                    if actual != *expected {
                        return Err(CompileError::ArgumentTypeMismatch {
                            signature: signature.clone(),
                            index,
                            expected: *expected,
                            actual,
                        });
                    }
                }
                Ok(signature.return_type())
            }
        }
    }

    /// Check that an expression is usable as a filter
    pub fn check_filter_predicate(&self, expr: &RowExpression) -> CompileResult<()> {
        let output = self.check(expr)?;
        if output != Type::Boolean {
            return Err(CompileError::NonBooleanFilter { actual: output });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use crate::types::Value;

    fn layout() -> RowLayout {
        RowLayout::new(vec![Type::Bigint, Type::Varchar, Type::Boolean])
    }

    fn add_bigint() -> Signature {
        Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Bigint])
    }

    #[test]
    fn test_constant_type_checking() {
        let layout = layout();
        let checker = TypeChecker::new(&layout);

        assert_eq!(checker.check(&RowExpression::bigint(42)).unwrap(), Type::Bigint);
        assert_eq!(checker.check(&RowExpression::varchar("x")).unwrap(), Type::Varchar);
        assert_eq!(checker.check(&RowExpression::null(Type::Double)).unwrap(), Type::Double);

        let bad = RowExpression::typed_constant(Type::Bigint, Value::from("42"));
        assert!(matches!(
            checker.check(&bad),
            Err(CompileError::ConstantTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_input_reference_type_checking() {
        let layout = layout();
        let checker = TypeChecker::new(&layout);

        assert_eq!(
            checker.check(&RowExpression::input(1, Type::Varchar)).unwrap(),
            Type::Varchar
        );
        assert!(matches!(
            checker.check(&RowExpression::input(3, Type::Bigint)),
            Err(CompileError::ChannelOutOfBounds {
                channel: 3,
                channel_count: 3
            })
        ));
        assert!(matches!(
            checker.check(&RowExpression::input(0, Type::Double)),
            Err(CompileError::ChannelTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_call_type_checking() {
        let layout = layout();
        let checker = TypeChecker::new(&layout);

        let expr = RowExpression::call(
            add_bigint(),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(5)],
        );
        assert_eq!(checker.check(&expr).unwrap(), Type::Bigint);

        // Arity mismatch
        let expr = RowExpression::call(add_bigint(), vec![RowExpression::bigint(5)]);
        assert!(matches!(
            checker.check(&expr),
            Err(CompileError::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));

        // Argument type mismatch
        let expr = RowExpression::call(
            add_bigint(),
            vec![RowExpression::bigint(5), RowExpression::input(1, Type::Varchar)],
        );
        assert!(matches!(
            checker.check(&expr),
            Err(CompileError::ArgumentTypeMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_filter_predicate_checking() {
        let layout = layout();
        let checker = TypeChecker::new(&layout);

        assert!(checker
            .check_filter_predicate(&RowExpression::input(2, Type::Boolean))
            .is_ok());
        assert!(checker
            .check_filter_predicate(&RowExpression::null(Type::Boolean))
            .is_ok());
        assert!(checker
            .check_filter_predicate(&RowExpression::input(0, Type::Bigint))
            .is_err());
    }
}
