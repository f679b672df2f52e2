//! Expression node model.
//!
//! This module provides:
//! - The immutable `RowExpression` tree (constants, input references, calls)
//! - Type checking of a tree against a row layout
//!
//! Nodes never evaluate themselves; execution lives in `codegen`.

pub mod row_expression;
pub mod type_checker;

pub use row_expression::{ExpressionKind, RowExpression};
pub use type_checker::TypeChecker;
