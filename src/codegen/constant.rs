use crate::codegen::{fragment, Fragment, GeneratorContext};
use crate::error::{CompileError, CompileResult};
use crate::expression::RowExpression;

/// Yields the literal (or its NULL) for every row
pub fn generate_constant(
    _context: &GeneratorContext<'_>,
    expr: &RowExpression,
) -> CompileResult<Fragment> {
    let RowExpression::Constant { value, .. } = expr else {
        return Err(CompileError::UnexpectedExpression {
            generator: "constant",
            kind: expr.kind().name(),
        });
    };
    let value = value.clone();
    Ok(fragment(move |_| Ok(value.clone())))
}
