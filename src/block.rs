//! Null-aware columnar blocks.
//!
//! A block is a fixed-length, position-indexed container of values of one
//! type. Null tracking is explicit and separate from the payload: a null
//! position carries a zeroed payload that readers must never interpret.
//!
//! Encodings:
//! - **FixedWidthBlock**: BOOLEAN, BIGINT and DOUBLE values
//! - **VariableWidthBlock**: VARCHAR and VARBINARY values
//! - **RunLengthBlock**: a single value repeated
//! - **DictionaryBlock**: positions mapped onto a shared dictionary block
//!
//! Blocks are produced by a single [`BlockBuilder`] and are immutable once
//! built, so they are shared across threads as [`BlockRef`].

pub mod builder;
pub mod dictionary;
pub mod fixed_width;
pub mod run_length;
pub mod variable_width;

pub use builder::BlockBuilder;
pub use dictionary::DictionaryBlock;
pub use fixed_width::FixedWidthBlock;
pub use run_length::RunLengthBlock;
pub use variable_width::VariableWidthBlock;

use crate::error::{EvalResult, EvaluationError};
use crate::session::Session;
use crate::types::{Type, Value};
use std::fmt;
use std::sync::Arc;

/// Shared, immutable block handle
pub type BlockRef = Arc<dyn Block>;

/// Positional column storage with explicit null tracking.
///
/// Every accessor fails with [`EvaluationError::PositionOutOfBounds`] for a
/// position outside `[0, position_count)`. Typed accessors that do not match
/// the block type fail with [`EvaluationError::UnsupportedAccess`].
pub trait Block: Send + Sync + fmt::Debug {
    fn block_type(&self) -> Type;

    fn position_count(&self) -> usize;

    fn is_null(&self, position: usize) -> EvalResult<bool>;

    fn get_boolean(&self, position: usize) -> EvalResult<bool> {
        let _ = position;
        Err(unsupported("boolean", self.block_type()))
    }

    fn get_long(&self, position: usize) -> EvalResult<i64> {
        let _ = position;
        Err(unsupported("bigint", self.block_type()))
    }

    fn get_double(&self, position: usize) -> EvalResult<f64> {
        let _ = position;
        Err(unsupported("double", self.block_type()))
    }

    fn get_slice(&self, position: usize) -> EvalResult<&[u8]> {
        let _ = position;
        Err(unsupported("slice", self.block_type()))
    }

    /// Materialize the value at `position`, `Value::Null` iff the position is null
    fn get_object_value(&self, _session: &Session, position: usize) -> EvalResult<Value> {
        if self.is_null(position)? {
            return Ok(Value::Null);
        }
        match self.block_type() {
            Type::Boolean => self.get_boolean(position).map(Value::Boolean),
            Type::Bigint => self.get_long(position).map(Value::Bigint),
            Type::Double => self.get_double(position).map(Value::Double),
            Type::Varchar => {
                let text = decode_varchar(self.get_slice(position)?)?;
                Ok(Value::Varchar(text.to_string()))
            }
            Type::Varbinary => self.get_slice(position).map(|s| Value::Varbinary(s.to_vec())),
        }
    }
}

pub(crate) fn check_position(position: usize, position_count: usize) -> EvalResult<()> {
    if position >= position_count {
        return Err(EvaluationError::PositionOutOfBounds {
            position,
            position_count,
        });
    }
    Ok(())
}

/// VARCHAR payloads are UTF-8; builders reject anything else
pub(crate) fn decode_varchar(bytes: &[u8]) -> EvalResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| EvaluationError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

pub(crate) fn unsupported(access: &'static str, block_type: Type) -> EvaluationError {
    EvaluationError::UnsupportedAccess { access, block_type }
}

/// Build a block from materialized values of one type
pub fn block_from_values(block_type: Type, values: &[Value]) -> EvalResult<BlockRef> {
    let mut builder = BlockBuilder::with_capacity(block_type, values.len());
    for value in values {
        builder.append_value(value)?;
    }
    Ok(builder.build())
}

pub fn boolean_block<I: IntoIterator<Item = Option<bool>>>(values: I) -> BlockRef {
    let mut builder = BlockBuilder::new(Type::Boolean);
    for value in values {
        match value {
            Some(v) => builder.push_boolean(v),
            None => builder.append_null(),
        }
    }
    builder.build()
}

pub fn bigint_block<I: IntoIterator<Item = Option<i64>>>(values: I) -> BlockRef {
    let mut builder = BlockBuilder::new(Type::Bigint);
    for value in values {
        match value {
            Some(v) => builder.push_long(v),
            None => builder.append_null(),
        }
    }
    builder.build()
}

pub fn double_block<I: IntoIterator<Item = Option<f64>>>(values: I) -> BlockRef {
    let mut builder = BlockBuilder::new(Type::Double);
    for value in values {
        match value {
            Some(v) => builder.push_double(v),
            None => builder.append_null(),
        }
    }
    builder.build()
}

pub fn varchar_block<'a, I: IntoIterator<Item = Option<&'a str>>>(values: I) -> BlockRef {
    let mut builder = BlockBuilder::new(Type::Varchar);
    for value in values {
        match value {
            Some(v) => builder.push_slice(v.as_bytes()),
            None => builder.append_null(),
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_null_positions(block: &dyn Block, session: &Session) {
        // Every even position is null
        for position in 0..block.position_count() {
            let value = block.get_object_value(session, position).unwrap();
            if position % 2 == 0 {
                assert!(block.is_null(position).unwrap());
                assert_eq!(value, Value::Null);
            } else {
                assert!(!block.is_null(position).unwrap());
                assert!(!value.is_null());
            }
        }
    }

    #[test]
    fn test_null_values_every_encoding() {
        let session = Session::new("test");
        let blocks: Vec<BlockRef> = vec![
            boolean_block([None, Some(false), None, Some(true)]),
            bigint_block([None, Some(0), None, Some(7)]),
            double_block([None, Some(0.0), None, Some(2.5)]),
            varchar_block([None, Some(""), None, Some("x")]),
        ];
        for block in &blocks {
            assert_eq!(block.position_count(), 4);
            assert_null_positions(block.as_ref(), &session);
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let session = Session::new("test");
        let block = bigint_block([Some(1), None]);
        assert!(matches!(
            block.is_null(2),
            Err(EvaluationError::PositionOutOfBounds {
                position: 2,
                position_count: 2
            })
        ));
        assert!(block.get_long(2).is_err());
        assert!(block.get_object_value(&session, 99).is_err());
    }

    #[test]
    fn test_typed_access_mismatch() {
        let block = varchar_block([Some("a")]);
        assert!(matches!(
            block.get_long(0),
            Err(EvaluationError::UnsupportedAccess {
                access: "bigint",
                block_type: Type::Varchar
            })
        ));
        assert_eq!(block.get_slice(0).unwrap(), b"a");
    }

    #[test]
    fn test_block_from_values() {
        let session = Session::new("test");
        let values = vec![Value::Double(1.5), Value::Null, Value::Double(-3.0)];
        let block = block_from_values(Type::Double, &values).unwrap();
        for (position, expected) in values.iter().enumerate() {
            assert_eq!(&block.get_object_value(&session, position).unwrap(), expected);
        }

        let err = block_from_values(Type::Bigint, &[Value::from("nope")]);
        assert!(matches!(err, Err(EvaluationError::TypeMismatch { .. })));
    }
}
