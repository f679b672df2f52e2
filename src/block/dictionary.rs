//! Dictionary block: positions index into a shared dictionary.

use crate::block::{check_position, Block, BlockRef};
use crate::error::{EvalResult, EvaluationError};
use crate::types::Type;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DictionaryBlock {
    dictionary: BlockRef,
    ids: Arc<[u32]>,
}

impl DictionaryBlock {
    /// Every id must address a dictionary position
    pub fn new(dictionary: BlockRef, ids: Vec<u32>) -> EvalResult<Self> {
        let dictionary_size = dictionary.position_count();
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= dictionary_size) {
            return Err(EvaluationError::PositionOutOfBounds {
                position: bad as usize,
                position_count: dictionary_size,
            });
        }
        Ok(Self {
            dictionary,
            ids: Arc::from(ids),
        })
    }

    pub fn dictionary(&self) -> &BlockRef {
        &self.dictionary
    }

    fn id(&self, position: usize) -> EvalResult<usize> {
        check_position(position, self.ids.len())?;
        Ok(self.ids[position] as usize)
    }
}

impl Block for DictionaryBlock {
    fn block_type(&self) -> Type {
        self.dictionary.block_type()
    }

    fn position_count(&self) -> usize {
        self.ids.len()
    }

    fn is_null(&self, position: usize) -> EvalResult<bool> {
        self.dictionary.is_null(self.id(position)?)
    }

    fn get_boolean(&self, position: usize) -> EvalResult<bool> {
        self.dictionary.get_boolean(self.id(position)?)
    }

    fn get_long(&self, position: usize) -> EvalResult<i64> {
        self.dictionary.get_long(self.id(position)?)
    }

    fn get_double(&self, position: usize) -> EvalResult<f64> {
        self.dictionary.get_double(self.id(position)?)
    }

    fn get_slice(&self, position: usize) -> EvalResult<&[u8]> {
        self.dictionary.get_slice(self.id(position)?)
    }
}
