//! Hash-based aggregation for GROUP BY and aggregate functions.
//!
//! This operator supports:
//! - Multiple grouping channels
//! - Any number of compiled aggregations
//! - Partial and final steps whose intermediate states travel as VARBINARY
//! - SQL NULL handling (nulls never contribute to an aggregate; NULL is a
//!   valid group key)

use crate::aggregation::Accumulator;
use crate::block::{BlockBuilder, BlockRef};
use crate::codegen::CompiledAggregation;
use crate::operator::{Operator, OUTPUT_PAGE_ROWS};
use crate::page::{Page, RowLayout};
use crate::session::Session;
use crate::types::{Type, Value};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Which part of a distributed aggregation the operator performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStep {
    /// Raw rows in, final values out
    Single,
    /// Raw rows in, serialized states out
    Partial,
    /// Serialized states in, final values out
    Final,
}

impl AggregationStep {
    fn consumes_raw_input(&self) -> bool {
        !matches!(self, AggregationStep::Final)
    }

    fn produces_states(&self) -> bool {
        matches!(self, AggregationStep::Partial)
    }
}

/// Accumulators for one group
struct GroupState {
    key: Vec<Value>,
    accumulators: Vec<Box<dyn Accumulator>>,
}

/// Hash aggregation operator
///
/// For `Single` and `Partial`, `group_by` names channels of the raw input and
/// each aggregation reads its own input channel. For `Final`, the input is
/// the output of a `Partial` step: the group key in the first channels and one
/// VARBINARY state channel per aggregation after them.
pub struct HashAggregationOperator {
    /// Child operator providing input pages
    child: Box<dyn Operator>,
    session: Arc<Session>,
    step: AggregationStep,
    group_by: Vec<usize>,
    aggregations: Vec<CompiledAggregation>,
    output_layout: RowLayout,
    /// Group key -> index into `groups`, which keeps first-seen order
    group_index: HashMap<Vec<Value>, usize>,
    groups: Vec<GroupState>,
    output: Option<std::vec::IntoIter<Page>>,
    initialized: bool,
}

impl HashAggregationOperator {
    pub fn new(
        child: Box<dyn Operator>,
        session: Arc<Session>,
        step: AggregationStep,
        group_by: Vec<usize>,
        aggregations: Vec<CompiledAggregation>,
    ) -> Result<Self> {
        if aggregations.is_empty() {
            bail!("At least one aggregation must be specified");
        }
        Ok(Self {
            child,
            session,
            step,
            group_by,
            aggregations,
            output_layout: RowLayout::new(Vec::new()),
            group_index: HashMap::new(),
            groups: Vec::new(),
            output: None,
            initialized: false,
        })
    }

    pub fn step(&self) -> AggregationStep {
        self.step
    }

    fn key_channels(&self) -> Vec<usize> {
        match self.step {
            AggregationStep::Final => (0..self.group_by.len()).collect(),
            _ => self.group_by.clone(),
        }
    }

    /// Validate the child layout and derive the output layout
    fn build_layout(&self, input: &RowLayout) -> Result<RowLayout> {
        let mut channels = Vec::new();
        for channel in self.key_channels() {
            match input.channel_type(channel) {
                Some(t) => channels.push(t),
                None => bail!("GROUP BY channel {} is out of bounds", channel),
            }
        }

        for (i, aggregation) in self.aggregations.iter().enumerate() {
            let input_type = aggregation.implementation().input_type();
            if self.step.consumes_raw_input() {
                let actual = input.channel_type(aggregation.input_channel());
                if actual != Some(input_type) {
                    bail!(
                        "Aggregation {} expects {} on channel {}, input has {:?}",
                        aggregation.signature(),
                        input_type,
                        aggregation.input_channel(),
                        actual
                    );
                }
            } else {
                let state_channel = self.group_by.len() + i;
                if input.channel_type(state_channel) != Some(Type::Varbinary) {
                    bail!(
                        "Final aggregation {} expects a varbinary state on channel {}",
                        aggregation.signature(),
                        state_channel
                    );
                }
            }
            channels.push(if self.step.produces_states() {
                Type::Varbinary
            } else {
                aggregation.output_type()
            });
        }
        Ok(RowLayout::new(channels))
    }

    fn group_for(&mut self, page: &Page, position: usize, key_channels: &[usize]) -> Result<usize> {
        let mut key = Vec::with_capacity(key_channels.len());
        for &channel in key_channels {
            key.push(page.block(channel)?.get_object_value(&self.session, position)?);
        }
        if let Some(&index) = self.group_index.get(&key) {
            return Ok(index);
        }
        let index = self.groups.len();
        let accumulators = self.new_accumulators();
        self.groups.push(GroupState {
            key: key.clone(),
            accumulators,
        });
        self.group_index.insert(key, index);
        Ok(index)
    }

    fn new_accumulators(&self) -> Vec<Box<dyn Accumulator>> {
        self.aggregations
            .iter()
            .map(|aggregation| aggregation.create_accumulator())
            .collect()
    }

    fn add_raw_page(&mut self, page: &Page, key_channels: &[usize]) -> Result<()> {
        if key_channels.is_empty() {
            // Global aggregation folds whole blocks
            let index = self.global_group();
            let group = &mut self.groups[index];
            for (aggregation, accumulator) in self.aggregations.iter().zip(&mut group.accumulators)
            {
                aggregation.accumulate_page(accumulator.as_mut(), page)?;
            }
            return Ok(());
        }

        for position in 0..page.position_count() {
            let index = self.group_for(page, position, key_channels)?;
            let group = &mut self.groups[index];
            for (aggregation, accumulator) in self.aggregations.iter().zip(&mut group.accumulators)
            {
                aggregation.accumulate_position(accumulator.as_mut(), page, position)?;
            }
        }
        Ok(())
    }

    fn add_state_page(&mut self, page: &Page, key_channels: &[usize]) -> Result<()> {
        let state_offset = key_channels.len();
        for position in 0..page.position_count() {
            let index = self.group_for(page, position, key_channels)?;
            let group = &mut self.groups[index];
            for (i, (aggregation, accumulator)) in self
                .aggregations
                .iter()
                .zip(&mut group.accumulators)
                .enumerate()
            {
                let block = page.block(state_offset + i)?;
                if block.is_null(position)? {
                    continue;
                }
                let state = aggregation
                    .implementation()
                    .deserialize(block.get_slice(position)?)?;
                accumulator.merge(state.as_ref())?;
            }
        }
        Ok(())
    }

    fn global_group(&mut self) -> usize {
        if let Some(&index) = self.group_index.get(&Vec::new()) {
            return index;
        }
        let index = self.groups.len();
        let accumulators = self.new_accumulators();
        self.groups.push(GroupState {
            key: Vec::new(),
            accumulators,
        });
        self.group_index.insert(Vec::new(), index);
        index
    }

    /// Process all input pages and build groups
    fn consume_input(&mut self) -> Result<()> {
        let key_channels = self.key_channels();
        while let Some(page) = self.child.next()? {
            if self.step.consumes_raw_input() {
                self.add_raw_page(&page, &key_channels)?;
            } else {
                self.add_state_page(&page, &key_channels)?;
            }
        }

        // For empty input with no GROUP BY, we still need to return one row
        if self.group_by.is_empty() {
            self.global_group();
        }

        let groups = std::mem::take(&mut self.groups);
        self.group_index.clear();
        log::debug!("{:?} aggregation produced {} groups", self.step, groups.len());

        let mut pages = Vec::new();
        for chunk in groups.chunks(OUTPUT_PAGE_ROWS) {
            pages.push(self.build_page(chunk)?);
        }
        self.output = Some(pages.into_iter());
        Ok(())
    }

    fn build_page(&self, groups: &[GroupState]) -> Result<Page> {
        let types = self.output_layout.types();
        let mut builders: Vec<BlockBuilder> = types
            .iter()
            .map(|t| BlockBuilder::with_capacity(*t, groups.len()))
            .collect();
        let key_count = self.key_channels().len();

        for group in groups {
            for (builder, value) in builders.iter_mut().zip(&group.key) {
                builder.append_value(value)?;
            }
            for (builder, accumulator) in builders[key_count..].iter_mut().zip(&group.accumulators)
            {
                if self.step.produces_states() {
                    builder.append_slice(&accumulator.serialize()?)?;
                } else {
                    builder.append_value(&accumulator.evaluate())?;
                }
            }
        }

        let blocks: Vec<BlockRef> = builders.into_iter().map(BlockBuilder::build).collect();
        Ok(Page::new(blocks)?)
    }
}

impl Operator for HashAggregationOperator {
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.child.init()?;
        self.output_layout = self.build_layout(self.child.output_layout())?;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Page>> {
        if !self.initialized {
            bail!("Operator not initialized. Call init() first.");
        }

        // First consume all input if we haven't already
        if self.output.is_none() {
            self.consume_input()?;
        }

        Ok(self.output.as_mut().and_then(|pages| pages.next()))
    }

    fn output_layout(&self) -> &RowLayout {
        &self.output_layout
    }
}
