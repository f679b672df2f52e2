//! Expression code generation.
//!
//! An expression tree is lowered into a tree of closures ([`Fragment`]s).
//! The [`GeneratorRegistry`] maps each expression kind to a generator;
//! generators recurse through the [`GeneratorContext`] for operands and ask
//! the [`CallSiteBinder`] to bind function calls. Everything is resolved at
//! compile time: the fragments only read blocks and invoke already bound
//! functions.
//!
//! ```text
//! add(#0, 5)
//!   Call        -> binder: add(bigint,bigint):bigint -> null check -> checked add
//!     #0        -> is_null(0, p) ? NULL : get_long(0, p)
//!     5         -> 5
//! ```

pub mod binder;
pub mod compiler;
pub mod constant;
pub mod context;
pub mod fragment;
pub mod function_call;
pub mod input_reference;
pub mod registry;

pub use binder::{BoundCallSite, CallSite, CallSiteBinder, FunctionBinding};
pub use compiler::{CompiledAggregation, CompiledExpression, ExpressionCompiler};
pub use context::GeneratorContext;
pub use fragment::{fragment, Fragment, RowCursor, SessionAccessor};
pub use registry::{Generator, GeneratorRegistry};
