//! Operators that drive compiled expressions over pages.
//!
//! Operators follow the Volcano-style iterator model: each produces pages
//! one at a time via `next()`, pulling from its child as needed. Expressions
//! arrive already compiled; operators check in `init()` that they were
//! compiled for the layout the child produces.

use crate::page::{Page, RowLayout};
use anyhow::Result;

pub mod aggregation;
pub mod filter_project;
pub mod values;

pub use aggregation::{AggregationStep, HashAggregationOperator};
pub use filter_project::FilterAndProjectOperator;
pub use values::ValuesOperator;

/// Rows per output page for operators that build their own pages
pub const OUTPUT_PAGE_ROWS: usize = 1024;

/// Trait for all page operators
pub trait Operator: Send {
    /// Initialize the operator. This must be called before `next()`.
    fn init(&mut self) -> Result<()>;

    /// Get the next page from the operator.
    /// Returns None when there are no more pages.
    fn next(&mut self) -> Result<Option<Page>>;

    /// Layout of the pages this operator produces; valid after `init()`
    fn output_layout(&self) -> &RowLayout;
}

/// Drain an operator into a vector of pages
pub fn collect_pages(operator: &mut dyn Operator) -> Result<Vec<Page>> {
    operator.init()?;
    let mut pages = Vec::new();
    while let Some(page) = operator.next()? {
        pages.push(page);
    }
    Ok(pages)
}
