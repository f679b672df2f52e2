//! Error types for expression compilation and evaluation.

use crate::aggregation::AggregationKind;
use crate::signature::Signature;
use crate::types::Type;
use thiserror::Error;

/// Errors raised while compiling an expression. They abort compilation
/// before any row is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Function not found: {signature}")]
    FunctionNotFound { signature: Signature },

    #[error("Function {signature} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        signature: Signature,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {index} of {signature} has type {actual}, expected {expected}")]
    ArgumentTypeMismatch {
        signature: Signature,
        index: usize,
        expected: Type,
        actual: Type,
    },

    #[error("Channel {channel} out of bounds for layout with {channel_count} channels")]
    ChannelOutOfBounds { channel: usize, channel_count: usize },

    #[error("Channel {channel} has type {actual}, expression declares {expected}")]
    ChannelTypeMismatch {
        channel: usize,
        expected: Type,
        actual: Type,
    },

    #[error("Constant of type {expected} holds incompatible value {value}")]
    ConstantTypeMismatch { expected: Type, value: String },

    #[error("Filter expression must be boolean, got {actual}")]
    NonBooleanFilter { actual: Type },

    #[error("Expression nesting exceeds the limit of {limit}")]
    ExpressionTooDeep { limit: usize },

    #[error("Aggregate function {signature} cannot be used in a scalar expression")]
    AggregateInScalarContext { signature: Signature },

    #[error("Expression is not an aggregate call: {expression}")]
    NotAnAggregation { expression: String },

    #[error("No {kind} aggregation is registered for type {value_type}")]
    UnsupportedAggregation {
        kind: AggregationKind,
        value_type: Type,
    },

    #[error("Invalid aggregation input: {reason}")]
    InvalidAggregationInput { reason: String },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("No generator registered for {kind} expressions")]
    MissingGenerator { kind: &'static str },

    #[error("The {generator} generator was handed a {kind} expression")]
    UnexpectedExpression {
        generator: &'static str,
        kind: &'static str,
    },
}

/// Errors raised while evaluating compiled code against blocks. They are
/// fatal to the current row or query, never to the process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Cannot cast '{value}' to {target}")]
    InvalidCast { value: String, target: Type },

    #[error("Position {position} out of bounds for block with {position_count} positions")]
    PositionOutOfBounds {
        position: usize,
        position_count: usize,
    },

    #[error("Index {index} out of range in {function}")]
    IndexOutOfRange { function: &'static str, index: i64 },

    #[error("Channel {channel} out of bounds for page with {channel_count} channels")]
    ChannelOutOfBounds { channel: usize, channel_count: usize },

    #[error("Cannot read {access} from a {block_type} block")]
    UnsupportedAccess {
        access: &'static str,
        block_type: Type,
    },

    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: Type,
        actual: String,
        context: String,
    },

    #[error("Blocks have different position counts: {expected} and {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },

    #[error("Incompatible aggregation state: {reason}")]
    IncompatibleState { reason: String },

    #[error("Invalid UTF-8 in varchar value after {valid_up_to} bytes")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("State serialization failed: {0}")]
    StateSerialization(String),
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Result type for evaluation.
pub type EvalResult<T> = Result<T, EvaluationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let signature = Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Varchar]);
        let err = CompileError::FunctionNotFound {
            signature: signature.clone(),
        };
        assert_eq!(
            err.to_string(),
            "Function not found: add(bigint,varchar):bigint"
        );

        let err = CompileError::ArityMismatch {
            signature,
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Function add(bigint,varchar):bigint expects 2 arguments, got 1"
        );

        let err = EvaluationError::PositionOutOfBounds {
            position: 5,
            position_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "Position 5 out of bounds for block with 3 positions"
        );

        assert_eq!(EvaluationError::DivisionByZero.to_string(), "Division by zero");

        let err = CompileError::UnsupportedAggregation {
            kind: AggregationKind::Sum,
            value_type: Type::Varchar,
        };
        assert_eq!(
            err.to_string(),
            "No sum aggregation is registered for type varchar"
        );
    }
}
