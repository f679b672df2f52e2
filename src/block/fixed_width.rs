//! Fixed-width block encoding for BOOLEAN, BIGINT and DOUBLE.

use crate::block::{check_position, unsupported, Block};
use crate::error::EvalResult;
use crate::types::Type;
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

/// Values stored back to back in little-endian order, one null flag byte
/// per position.
#[derive(Debug, Clone)]
pub struct FixedWidthBlock {
    block_type: Type,
    fixed_size: usize,
    position_count: usize,
    value_is_null: Bytes,
    data: Bytes,
}

impl FixedWidthBlock {
    /// Parts come from a `BlockBuilder`, which keeps them consistent.
    pub(crate) fn from_parts(
        block_type: Type,
        position_count: usize,
        value_is_null: Bytes,
        data: Bytes,
    ) -> Self {
        let fixed_size = block_type.fixed_size().unwrap_or(1);
        debug_assert_eq!(value_is_null.len(), position_count);
        debug_assert_eq!(data.len(), position_count * fixed_size);
        Self {
            block_type,
            fixed_size,
            position_count,
            value_is_null,
            data,
        }
    }

    fn payload(&self, position: usize) -> EvalResult<&[u8]> {
        check_position(position, self.position_count)?;
        let offset = position * self.fixed_size;
        Ok(&self.data[offset..offset + self.fixed_size])
    }
}

impl Block for FixedWidthBlock {
    fn block_type(&self) -> Type {
        self.block_type
    }

    fn position_count(&self) -> usize {
        self.position_count
    }

    fn is_null(&self, position: usize) -> EvalResult<bool> {
        check_position(position, self.position_count)?;
        Ok(self.value_is_null[position] != 0)
    }

    fn get_boolean(&self, position: usize) -> EvalResult<bool> {
        if self.block_type != Type::Boolean {
            return Err(unsupported("boolean", self.block_type));
        }
        Ok(self.payload(position)?[0] != 0)
    }

    fn get_long(&self, position: usize) -> EvalResult<i64> {
        if self.block_type != Type::Bigint {
            return Err(unsupported("bigint", self.block_type));
        }
        Ok(LittleEndian::read_i64(self.payload(position)?))
    }

    fn get_double(&self, position: usize) -> EvalResult<f64> {
        if self.block_type != Type::Double {
            return Err(unsupported("double", self.block_type));
        }
        Ok(LittleEndian::read_f64(self.payload(position)?))
    }
}
