//! Expression tree definitions.

use crate::signature::Signature;
use crate::types::{Type, Value};
use std::fmt;

/// Discriminant of a [`RowExpression`], used to look up generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Constant,
    InputReference,
    Call,
}

impl ExpressionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExpressionKind::Constant => "constant",
            ExpressionKind::InputReference => "input reference",
            ExpressionKind::Call => "call",
        }
    }
}

/// Immutable typed expression tree. Nodes carry no evaluation logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowExpression {
    /// Literal value; `Value::Null` is a typed SQL NULL
    Constant { value_type: Type, value: Value },

    /// Zero-based channel of the current row
    InputReference { value_type: Type, channel: usize },

    /// Function application, arguments in declaration order
    Call {
        signature: Signature,
        arguments: Vec<RowExpression>,
    },
}

impl RowExpression {
    /// Create a constant, typing it from the value
    pub fn constant(value: impl Into<Value>) -> Option<Self> {
        let value = value.into();
        let value_type = value.value_type()?;
        Some(RowExpression::Constant { value_type, value })
    }

    /// Create a constant with an explicit type
    pub fn typed_constant(value_type: Type, value: Value) -> Self {
        RowExpression::Constant { value_type, value }
    }

    /// Create a typed NULL constant
    pub fn null(value_type: Type) -> Self {
        RowExpression::Constant {
            value_type,
            value: Value::Null,
        }
    }

    pub fn bigint(value: i64) -> Self {
        Self::typed_constant(Type::Bigint, Value::Bigint(value))
    }

    pub fn double(value: f64) -> Self {
        Self::typed_constant(Type::Double, Value::Double(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed_constant(Type::Boolean, Value::Boolean(value))
    }

    pub fn varchar(value: impl Into<String>) -> Self {
        Self::typed_constant(Type::Varchar, Value::Varchar(value.into()))
    }

    /// Create a reference to an input channel
    pub fn input(channel: usize, value_type: Type) -> Self {
        RowExpression::InputReference {
            value_type,
            channel,
        }
    }

    /// Create a function call
    pub fn call(signature: Signature, arguments: Vec<RowExpression>) -> Self {
        RowExpression::Call {
            signature,
            arguments,
        }
    }

    pub fn kind(&self) -> ExpressionKind {
        match self {
            RowExpression::Constant { .. } => ExpressionKind::Constant,
            RowExpression::InputReference { .. } => ExpressionKind::InputReference,
            RowExpression::Call { .. } => ExpressionKind::Call,
        }
    }

    /// Declared result type of this node
    pub fn expression_type(&self) -> Type {
        match self {
            RowExpression::Constant { value_type, .. } => *value_type,
            RowExpression::InputReference { value_type, .. } => *value_type,
            RowExpression::Call { signature, .. } => signature.return_type(),
        }
    }

    /// Nesting depth; a leaf has depth 1
    pub fn depth(&self) -> usize {
        match self {
            RowExpression::Call { arguments, .. } => {
                1 + arguments.iter().map(|a| a.depth()).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

impl fmt::Display for RowExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowExpression::Constant { value, .. } => write!(f, "{}", value),
            RowExpression::InputReference { channel, .. } => write!(f, "#{}", channel),
            RowExpression::Call {
                signature,
                arguments,
            } => {
                write!(f, "{}(", signature.name())?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_bigint() -> Signature {
        Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Bigint])
    }

    #[test]
    fn test_constants() {
        assert_eq!(
            RowExpression::constant(42i64),
            Some(RowExpression::bigint(42))
        );
        assert_eq!(RowExpression::constant(Value::Null), None);
        assert_eq!(RowExpression::null(Type::Double).expression_type(), Type::Double);
    }

    #[test]
    fn test_kind_and_type() {
        let expr = RowExpression::call(
            add_bigint(),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(5)],
        );
        assert_eq!(expr.kind(), ExpressionKind::Call);
        assert_eq!(expr.expression_type(), Type::Bigint);
        assert_eq!(expr.depth(), 2);
        assert_eq!(expr.to_string(), "add(#0, 5)");
    }

    #[test]
    fn test_structural_equality() {
        let a = RowExpression::call(add_bigint(), vec![RowExpression::bigint(1), RowExpression::bigint(2)]);
        let b = RowExpression::call(add_bigint(), vec![RowExpression::bigint(1), RowExpression::bigint(2)]);
        let c = RowExpression::call(add_bigint(), vec![RowExpression::bigint(2), RowExpression::bigint(1)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
