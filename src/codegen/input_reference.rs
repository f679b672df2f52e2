use crate::block::{decode_varchar, Block};
use crate::codegen::{fragment, Fragment, GeneratorContext};
use crate::error::{CompileError, CompileResult, EvalResult};
use crate::expression::RowExpression;
use crate::types::{Type, Value};

type Reader = fn(&dyn Block, usize) -> EvalResult<Value>;

fn read_boolean(block: &dyn Block, position: usize) -> EvalResult<Value> {
    block.get_boolean(position).map(Value::Boolean)
}

fn read_bigint(block: &dyn Block, position: usize) -> EvalResult<Value> {
    block.get_long(position).map(Value::Bigint)
}

fn read_double(block: &dyn Block, position: usize) -> EvalResult<Value> {
    block.get_double(position).map(Value::Double)
}

fn read_varchar(block: &dyn Block, position: usize) -> EvalResult<Value> {
    let text = decode_varchar(block.get_slice(position)?)?;
    Ok(Value::Varchar(text.to_string()))
}

fn read_varbinary(block: &dyn Block, position: usize) -> EvalResult<Value> {
    block
        .get_slice(position)
        .map(|slice| Value::Varbinary(slice.to_vec()))
}

fn reader_for(value_type: Type) -> Reader {
    match value_type {
        Type::Boolean => read_boolean,
        Type::Bigint => read_bigint,
        Type::Double => read_double,
        Type::Varchar => read_varchar,
        Type::Varbinary => read_varbinary,
    }
}

/// Reads channel `c` at the cursor position, checking the null flag before
/// touching the payload. The typed reader is chosen once, here.
pub fn generate_input_reference(
    context: &GeneratorContext<'_>,
    expr: &RowExpression,
) -> CompileResult<Fragment> {
    let RowExpression::InputReference {
        value_type,
        channel,
    } = *expr
    else {
        return Err(CompileError::UnexpectedExpression {
            generator: "input reference",
            kind: expr.kind().name(),
        });
    };

    let layout = context.layout();
    match layout.channel_type(channel) {
        None => {
            return Err(CompileError::ChannelOutOfBounds {
                channel,
                channel_count: layout.channel_count(),
            })
        }
        Some(actual) if actual != value_type => {
            return Err(CompileError::ChannelTypeMismatch {
                channel,
                expected: value_type,
                actual,
            })
        }
        Some(_) => {}
    }

    let read = reader_for(value_type);
    Ok(fragment(move |cursor| {
        let block = cursor.page().block(channel)?;
        let position = cursor.position();
        if block.is_null(position)? {
            return Ok(Value::Null);
        }
        read(block.as_ref(), position)
    }))
}
