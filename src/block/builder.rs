//! Single-writer block construction.

use crate::block::{decode_varchar, BlockRef, FixedWidthBlock, VariableWidthBlock};
use crate::error::{EvalResult, EvaluationError};
use crate::types::{Type, Value};
use bytes::{BufMut, BytesMut};
use std::sync::Arc;

/// Appends values of one type and freezes them into an immutable block.
///
/// `build` consumes the builder, so a block has exactly one writer and is
/// never mutated after it is handed out.
#[derive(Debug)]
pub struct BlockBuilder {
    block_type: Type,
    value_is_null: BytesMut,
    data: BytesMut,
    /// Start offsets for variable-width types; empty for fixed-width types
    offsets: Vec<usize>,
}

impl BlockBuilder {
    pub fn new(block_type: Type) -> Self {
        Self::with_capacity(block_type, 16)
    }

    pub fn with_capacity(block_type: Type, positions: usize) -> Self {
        let (data, offsets) = match block_type.fixed_size() {
            Some(size) => (BytesMut::with_capacity(positions * size), Vec::new()),
            None => {
                let mut offsets = Vec::with_capacity(positions + 1);
                offsets.push(0);
                (BytesMut::with_capacity(positions * 8), offsets)
            }
        };
        Self {
            block_type,
            value_is_null: BytesMut::with_capacity(positions),
            data,
            offsets,
        }
    }

    pub fn block_type(&self) -> Type {
        self.block_type
    }

    pub fn position_count(&self) -> usize {
        self.value_is_null.len()
    }

    pub fn append_null(&mut self) {
        self.value_is_null.put_u8(1);
        match self.block_type.fixed_size() {
            Some(size) => self.data.put_bytes(0, size),
            None => self.offsets.push(self.data.len()),
        }
    }

    pub fn append_boolean(&mut self, value: bool) -> EvalResult<()> {
        self.expect(Type::Boolean, "boolean")?;
        self.push_boolean(value);
        Ok(())
    }

    pub fn append_long(&mut self, value: i64) -> EvalResult<()> {
        self.expect(Type::Bigint, "bigint")?;
        self.push_long(value);
        Ok(())
    }

    pub fn append_double(&mut self, value: f64) -> EvalResult<()> {
        self.expect(Type::Double, "double")?;
        self.push_double(value);
        Ok(())
    }

    pub fn append_slice(&mut self, value: &[u8]) -> EvalResult<()> {
        if self.block_type.fixed_size().is_some() {
            return Err(self.mismatch("slice"));
        }
        if self.block_type == Type::Varchar {
            decode_varchar(value)?;
        }
        self.push_slice(value);
        Ok(())
    }

    /// Append a materialized value, rejecting values of another type
    pub fn append_value(&mut self, value: &Value) -> EvalResult<()> {
        match value {
            Value::Null => {
                self.append_null();
                Ok(())
            }
            Value::Boolean(b) => self.append_boolean(*b),
            Value::Bigint(n) => self.append_long(*n),
            Value::Double(d) => self.append_double(*d),
            Value::Varchar(s) => {
                self.expect(Type::Varchar, "varchar")?;
                self.push_slice(s.as_bytes());
                Ok(())
            }
            Value::Varbinary(b) => {
                self.expect(Type::Varbinary, "varbinary")?;
                self.push_slice(b);
                Ok(())
            }
        }
    }

    pub(crate) fn push_boolean(&mut self, value: bool) {
        self.value_is_null.put_u8(0);
        self.data.put_u8(value as u8);
    }

    pub(crate) fn push_long(&mut self, value: i64) {
        self.value_is_null.put_u8(0);
        self.data.put_i64_le(value);
    }

    pub(crate) fn push_double(&mut self, value: f64) {
        self.value_is_null.put_u8(0);
        self.data.put_f64_le(value);
    }

    pub(crate) fn push_slice(&mut self, value: &[u8]) {
        self.value_is_null.put_u8(0);
        self.data.put_slice(value);
        self.offsets.push(self.data.len());
    }

    /// Freeze the appended values into an immutable block
    pub fn build(self) -> BlockRef {
        let position_count = self.position_count();
        let value_is_null = self.value_is_null.freeze();
        let data = self.data.freeze();
        match self.block_type.fixed_size() {
            Some(_) => Arc::new(FixedWidthBlock::from_parts(
                self.block_type,
                position_count,
                value_is_null,
                data,
            )),
            None => Arc::new(VariableWidthBlock::from_parts(
                self.block_type,
                Arc::from(self.offsets),
                value_is_null,
                data,
            )),
        }
    }

    fn expect(&self, expected: Type, actual: &str) -> EvalResult<()> {
        if self.block_type != expected {
            return Err(self.mismatch(actual));
        }
        Ok(())
    }

    fn mismatch(&self, actual: &str) -> EvaluationError {
        EvaluationError::TypeMismatch {
            expected: self.block_type,
            actual: actual.to_string(),
            context: "block builder".to_string(),
        }
    }
}
