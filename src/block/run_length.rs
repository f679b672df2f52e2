//! Run-length block: one value repeated for every position.

use crate::block::{check_position, Block, BlockRef};
use crate::error::{EvalResult, EvaluationError};
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct RunLengthBlock {
    value: BlockRef,
    position_count: usize,
}

impl RunLengthBlock {
    /// `value` must be a single-position block
    pub fn new(value: BlockRef, position_count: usize) -> EvalResult<Self> {
        if value.position_count() != 1 {
            return Err(EvaluationError::PositionCountMismatch {
                expected: 1,
                actual: value.position_count(),
            });
        }
        Ok(Self {
            value,
            position_count,
        })
    }

    pub fn value(&self) -> &BlockRef {
        &self.value
    }
}

impl Block for RunLengthBlock {
    fn block_type(&self) -> Type {
        self.value.block_type()
    }

    fn position_count(&self) -> usize {
        self.position_count
    }

    fn is_null(&self, position: usize) -> EvalResult<bool> {
        check_position(position, self.position_count)?;
        self.value.is_null(0)
    }

    fn get_boolean(&self, position: usize) -> EvalResult<bool> {
        check_position(position, self.position_count)?;
        self.value.get_boolean(0)
    }

    fn get_long(&self, position: usize) -> EvalResult<i64> {
        check_position(position, self.position_count)?;
        self.value.get_long(0)
    }

    fn get_double(&self, position: usize) -> EvalResult<f64> {
        check_position(position, self.position_count)?;
        self.value.get_double(0)
    }

    fn get_slice(&self, position: usize) -> EvalResult<&[u8]> {
        check_position(position, self.position_count)?;
        self.value.get_slice(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{bigint_block, varchar_block};
    use crate::session::Session;
    use crate::types::Value;

    #[test]
    fn test_repeated_value() {
        let session = Session::new("test");
        let block = RunLengthBlock::new(varchar_block([Some("x")]), 1000).unwrap();
        assert_eq!(block.position_count(), 1000);
        assert_eq!(block.get_object_value(&session, 999).unwrap(), Value::from("x"));
        assert!(block.get_slice(1000).is_err());
    }

    #[test]
    fn test_repeated_null() {
        let block = RunLengthBlock::new(bigint_block([None]), 3).unwrap();
        assert!((0..3).all(|p| block.is_null(p).unwrap()));
    }

    #[test]
    fn test_requires_single_position() {
        assert!(RunLengthBlock::new(bigint_block([Some(1), Some(2)]), 3).is_err());
    }
}
