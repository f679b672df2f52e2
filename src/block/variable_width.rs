//! Variable-width block encoding for VARCHAR and VARBINARY.

use crate::block::{check_position, Block};
use crate::error::EvalResult;
use crate::types::Type;
use bytes::Bytes;
use std::sync::Arc;

/// Concatenated payloads addressed by `position_count + 1` offsets.
#[derive(Debug, Clone)]
pub struct VariableWidthBlock {
    block_type: Type,
    offsets: Arc<[usize]>,
    value_is_null: Bytes,
    data: Bytes,
}

impl VariableWidthBlock {
    pub(crate) fn from_parts(
        block_type: Type,
        offsets: Arc<[usize]>,
        value_is_null: Bytes,
        data: Bytes,
    ) -> Self {
        debug_assert_eq!(offsets.len(), value_is_null.len() + 1);
        Self {
            block_type,
            offsets,
            value_is_null,
            data,
        }
    }
}

impl Block for VariableWidthBlock {
    fn block_type(&self) -> Type {
        self.block_type
    }

    fn position_count(&self) -> usize {
        self.value_is_null.len()
    }

    fn is_null(&self, position: usize) -> EvalResult<bool> {
        check_position(position, self.position_count())?;
        Ok(self.value_is_null[position] != 0)
    }

    fn get_slice(&self, position: usize) -> EvalResult<&[u8]> {
        check_position(position, self.position_count())?;
        let start = self.offsets[position];
        let end = self.offsets[position + 1];
        Ok(&self.data[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;

    #[test]
    fn test_offsets() {
        let mut builder = BlockBuilder::new(Type::Varchar);
        builder.append_value(&"abc".into()).unwrap();
        builder.append_null();
        builder.append_value(&"de".into()).unwrap();
        let block = builder.build();

        assert_eq!(block.get_slice(0).unwrap(), b"abc");
        assert_eq!(block.get_slice(2).unwrap(), b"de");
        assert!(block.get_slice(3).is_err());
        assert!(block.get_long(0).is_err());
    }
}
