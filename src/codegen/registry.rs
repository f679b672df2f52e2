//! Dispatch table from expression kind to generator.

use crate::codegen::{constant, function_call, input_reference, Fragment, GeneratorContext};
use crate::error::{CompileError, CompileResult};
use crate::expression::{ExpressionKind, RowExpression};
use std::collections::HashMap;
use std::fmt;

/// Produces the fragment for one expression node, recursing through the
/// context for operands
pub type Generator = fn(&GeneratorContext<'_>, &RowExpression) -> CompileResult<Fragment>;

#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<ExpressionKind, Generator>,
}

impl GeneratorRegistry {
    /// Registry with the built-in generator for every expression kind
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ExpressionKind::Constant, constant::generate_constant);
        registry.register(
            ExpressionKind::InputReference,
            input_reference::generate_input_reference,
        );
        registry.register(ExpressionKind::Call, function_call::generate_call);
        registry
    }

    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Register a generator, returning the one it replaces
    pub fn register(&mut self, kind: ExpressionKind, generator: Generator) -> Option<Generator> {
        self.generators.insert(kind, generator)
    }

    pub fn get(&self, kind: ExpressionKind) -> CompileResult<Generator> {
        self.generators
            .get(&kind)
            .copied()
            .ok_or(CompileError::MissingGenerator { kind: kind.name() })
    }

    pub fn contains(&self, kind: ExpressionKind) -> bool {
        self.generators.contains_key(&kind)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.generators.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("GeneratorRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_kind() {
        let registry = GeneratorRegistry::new();
        for kind in [
            ExpressionKind::Constant,
            ExpressionKind::InputReference,
            ExpressionKind::Call,
        ] {
            assert!(registry.contains(kind));
            assert!(registry.get(kind).is_ok());
        }
    }

    #[test]
    fn test_missing_generator() {
        let registry = GeneratorRegistry::empty();
        assert_eq!(
            registry.get(ExpressionKind::Call).err(),
            Some(CompileError::MissingGenerator { kind: "call" })
        );
    }
}
