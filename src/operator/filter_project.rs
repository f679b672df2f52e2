//! Filter and projection over compiled expressions.

use crate::codegen::CompiledExpression;
use crate::operator::Operator;
use crate::page::{Page, RowLayout};
use crate::session::Session;
use crate::types::Type;
use anyhow::{bail, Result};
use std::sync::Arc;

/// Keeps the rows where the filter is TRUE and evaluates the projections over
/// them. A NULL filter result drops the row, as in a WHERE clause.
pub struct FilterAndProjectOperator {
    /// Child operator that produces pages
    child: Box<dyn Operator>,
    session: Arc<Session>,
    filter: Option<CompiledExpression>,
    projections: Vec<CompiledExpression>,
    output_layout: RowLayout,
    initialized: bool,
}

impl FilterAndProjectOperator {
    pub fn new(
        child: Box<dyn Operator>,
        session: Arc<Session>,
        filter: Option<CompiledExpression>,
        projections: Vec<CompiledExpression>,
    ) -> Self {
        let output_layout =
            RowLayout::new(projections.iter().map(|p| p.output_type()).collect());
        Self {
            child,
            session,
            filter,
            projections,
            output_layout,
            initialized: false,
        }
    }

    fn check_layout(&self, expression: &CompiledExpression, input: &RowLayout) -> Result<()> {
        if expression.input_layout() != input {
            bail!(
                "Expression {} was compiled for channel types {:?} but the input has {:?}",
                expression.expression(),
                expression.input_layout().types(),
                input.types()
            );
        }
        Ok(())
    }

    fn process(&self, page: &Page) -> Result<Option<Page>> {
        let positions = match &self.filter {
            Some(filter) => filter.select_positions(&self.session, page)?,
            None => (0..page.position_count()).collect(),
        };
        if positions.is_empty() {
            return Ok(None);
        }
        if self.projections.is_empty() {
            return Ok(Some(Page::empty_with_positions(positions.len())));
        }

        let all_rows = positions.len() == page.position_count();
        let blocks = self
            .projections
            .iter()
            .map(|projection| {
                if all_rows {
                    projection.evaluate_page(&self.session, page)
                } else {
                    projection.evaluate_positions(&self.session, page, &positions)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Page::new(blocks)?))
    }
}

impl Operator for FilterAndProjectOperator {
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        // Initialize child operator
        self.child.init()?;
        let input = self.child.output_layout().clone();

        if let Some(filter) = &self.filter {
            if filter.output_type() != Type::Boolean {
                bail!("Filter expression {} is not boolean", filter.expression());
            }
            self.check_layout(filter, &input)?;
        }
        for projection in &self.projections {
            self.check_layout(projection, &input)?;
        }

        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Page>> {
        if !self.initialized {
            bail!("Operator not initialized. Call init() first.");
        }

        // Keep pulling pages until one has a selected row
        while let Some(page) = self.child.next()? {
            if let Some(output) = self.process(&page)? {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    fn output_layout(&self) -> &RowLayout {
        &self.output_layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{bigint_block, varchar_block};
    use crate::codegen::ExpressionCompiler;
    use crate::config::CompilerConfig;
    use crate::expression::RowExpression;
    use crate::function::FunctionRegistry;
    use crate::operator::{collect_pages, ValuesOperator};
    use crate::signature::Signature;
    use crate::types::Value;

    fn input() -> Result<ValuesOperator> {
        let layout = RowLayout::new(vec![Type::Bigint, Type::Varchar]);
        let pages = vec![
            Page::new(vec![
                bigint_block([Some(1), Some(20), None]),
                varchar_block([Some("a"), Some("b"), Some("c")]),
            ])?,
            Page::new(vec![bigint_block([Some(3)]), varchar_block([None])])?,
            Page::new(vec![
                bigint_block([Some(30), Some(40)]),
                varchar_block([Some("d"), Some("e")]),
            ])?,
        ];
        ValuesOperator::new(layout, pages)
    }

    fn compiler() -> ExpressionCompiler {
        ExpressionCompiler::new(Arc::new(FunctionRegistry::new()), CompilerConfig::default())
    }

    #[test]
    fn test_filter_and_project() -> Result<()> {
        let compiler = compiler();
        let layout = RowLayout::new(vec![Type::Bigint, Type::Varchar]);
        // #0 > 10
        let filter = compiler.compile_filter(
            &RowExpression::call(
                Signature::new(
                    "greater_than",
                    Type::Boolean,
                    vec![Type::Bigint, Type::Bigint],
                ),
                vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(10)],
            ),
            &layout,
        )?;
        let upper = compiler.compile(
            &RowExpression::call(
                Signature::new("upper", Type::Varchar, vec![Type::Varchar]),
                vec![RowExpression::input(1, Type::Varchar)],
            ),
            &layout,
        )?;

        let mut operator = FilterAndProjectOperator::new(
            Box::new(input()?),
            Arc::new(Session::new("tester")),
            Some(filter),
            vec![upper],
        );
        let pages = collect_pages(&mut operator)?;
        assert_eq!(operator.output_layout().types(), &[Type::Varchar]);

        // the second page has no match and is skipped; NULL #0 is dropped
        assert_eq!(pages.len(), 2);
        let session = Session::new("tester");
        assert_eq!(pages[0].row(&session, 0)?, vec![Value::from("B")]);
        assert_eq!(pages[0].position_count(), 1);
        assert_eq!(pages[1].position_count(), 2);
        assert_eq!(pages[1].row(&session, 1)?, vec![Value::from("E")]);
        Ok(())
    }

    #[test]
    fn test_rejects_expression_for_other_layout() -> Result<()> {
        let compiler = compiler();
        let other = RowLayout::new(vec![Type::Varchar]);
        let projection = compiler.compile(&RowExpression::input(0, Type::Varchar), &other)?;
        let mut operator = FilterAndProjectOperator::new(
            Box::new(input()?),
            Arc::new(Session::new("tester")),
            None,
            vec![projection],
        );
        assert!(operator.init().is_err());
        Ok(())
    }
}
