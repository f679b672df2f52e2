//! Per-compilation scope handed to every generator.

use crate::codegen::{CallSiteBinder, Fragment, GeneratorRegistry, SessionAccessor};
use crate::error::CompileResult;
use crate::expression::RowExpression;
use crate::page::RowLayout;

/// Scope of one compilation: where generators are found, the layout input
/// references read from, the binder for calls and the session accessor.
///
/// Generation never reads row data.
pub struct GeneratorContext<'a> {
    registry: &'a GeneratorRegistry,
    binder: &'a CallSiteBinder,
    layout: &'a RowLayout,
    session_accessor: SessionAccessor,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(
        registry: &'a GeneratorRegistry,
        binder: &'a CallSiteBinder,
        layout: &'a RowLayout,
    ) -> Self {
        Self {
            registry,
            binder,
            layout,
            session_accessor: SessionAccessor,
        }
    }

    /// Generate code for `expr` with the generator registered for its kind
    pub fn generate(&self, expr: &RowExpression) -> CompileResult<Fragment> {
        let generator = self.registry.get(expr.kind())?;
        generator(self, expr)
    }

    pub fn layout(&self) -> &'a RowLayout {
        self.layout
    }

    pub fn binder(&self) -> &'a CallSiteBinder {
        self.binder
    }

    pub fn session_accessor(&self) -> SessionAccessor {
        self.session_accessor
    }
}
