//! Operator over a fixed list of pages.

use crate::operator::Operator;
use crate::page::{Page, RowLayout};
use anyhow::{bail, Result};
use std::collections::VecDeque;

/// Yields the pages it was built with, in order
pub struct ValuesOperator {
    layout: RowLayout,
    pages: VecDeque<Page>,
    initialized: bool,
}

impl ValuesOperator {
    pub fn new(layout: RowLayout, pages: Vec<Page>) -> Result<Self> {
        for (index, page) in pages.iter().enumerate() {
            let page_layout = page.layout();
            if page_layout != layout {
                bail!(
                    "Page {} has channel types {:?}, expected {:?}",
                    index,
                    page_layout.types(),
                    layout.types()
                );
            }
        }
        Ok(Self {
            layout,
            pages: pages.into(),
            initialized: false,
        })
    }
}

impl Operator for ValuesOperator {
    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Page>> {
        if !self.initialized {
            bail!("Operator not initialized. Call init() first.");
        }
        Ok(self.pages.pop_front())
    }

    fn output_layout(&self) -> &RowLayout {
        &self.layout
    }
}
