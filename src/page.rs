//! Pages of blocks and the row layouts that describe them.

use crate::block::BlockRef;
use crate::error::{EvalResult, EvaluationError};
use crate::session::Session;
use crate::types::{Type, Value};

/// Ordered channel -> type mapping supplied by the planner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowLayout {
    channels: Vec<Type>,
}

impl RowLayout {
    pub fn new(channels: Vec<Type>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_type(&self, channel: usize) -> Option<Type> {
        self.channels.get(channel).copied()
    }

    pub fn types(&self) -> &[Type] {
        &self.channels
    }
}

/// A set of blocks with the same position count; one row per position.
#[derive(Debug, Clone)]
pub struct Page {
    blocks: Vec<BlockRef>,
    position_count: usize,
}

impl Page {
    pub fn new(blocks: Vec<BlockRef>) -> EvalResult<Self> {
        let position_count = blocks.first().map(|b| b.position_count()).unwrap_or(0);
        if let Some(bad) = blocks.iter().find(|b| b.position_count() != position_count) {
            return Err(EvaluationError::PositionCountMismatch {
                expected: position_count,
                actual: bad.position_count(),
            });
        }
        Ok(Self {
            blocks,
            position_count,
        })
    }

    /// A page without channels that still has rows, e.g. for constant-only projections
    pub fn empty_with_positions(position_count: usize) -> Self {
        Self {
            blocks: Vec::new(),
            position_count,
        }
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn channel_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, channel: usize) -> EvalResult<&BlockRef> {
        self.blocks
            .get(channel)
            .ok_or(EvaluationError::ChannelOutOfBounds {
                channel,
                channel_count: self.blocks.len(),
            })
    }

    pub fn blocks(&self) -> &[BlockRef] {
        &self.blocks
    }

    /// Layout derived from the block types
    pub fn layout(&self) -> RowLayout {
        RowLayout::new(self.blocks.iter().map(|b| b.block_type()).collect())
    }

    /// Materialize one row
    pub fn row(&self, session: &Session, position: usize) -> EvalResult<Vec<Value>> {
        self.blocks
            .iter()
            .map(|b| b.get_object_value(session, position))
            .collect()
    }
}
