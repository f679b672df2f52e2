use crate::codegen::{Fragment, GeneratorContext};
use crate::error::{CompileError, CompileResult};
use crate::expression::RowExpression;

/// Generates every argument in declaration order, binds the call site and
/// splices the bound function over the argument code.
pub fn generate_call(
    context: &GeneratorContext<'_>,
    expr: &RowExpression,
) -> CompileResult<Fragment> {
    let RowExpression::Call {
        signature,
        arguments,
    } = expr
    else {
        return Err(CompileError::UnexpectedExpression {
            generator: "call",
            kind: expr.kind().name(),
        });
    };

    let argument_code = arguments
        .iter()
        .map(|argument| context.generate(argument))
        .collect::<CompileResult<Vec<_>>>()?;

    context
        .binder()
        .bind(
            signature,
            context.session_accessor(),
            arguments,
            argument_code,
        )?
        .into_fragment()
}
