//! Compiler configuration.

/// Limits and caching switches for [`crate::codegen::ExpressionCompiler`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    /// Deepest expression nesting accepted before compilation fails
    pub max_expression_depth: usize,
    /// Reuse compiled artifacts for structurally equal (expression, layout) pairs
    pub cache_compiled_expressions: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_expression_depth: 256,
            cache_compiled_expressions: true,
        }
    }
}

impl CompilerConfig {
    pub fn with_max_expression_depth(mut self, depth: usize) -> Self {
        self.max_expression_depth = depth;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_compiled_expressions = false;
        self
    }
}
