//! Call-site binding.
//!
//! A call site is identified structurally by its signature and argument
//! expressions, so recompiling a structurally equal tree reuses the binding.
//! Each site owns a write-once cell: the first bind resolves the signature
//! against the [`FunctionRegistry`] while holding the cell's lock, and every
//! later or concurrent bind of the same site observes that result. Binds of
//! different sites only contend on the map shard.

use crate::codegen::{fragment, Fragment, SessionAccessor};
use crate::error::{CompileError, CompileResult};
use crate::expression::RowExpression;
use crate::function::{BindingTarget, FunctionRegistry};
use crate::signature::Signature;
use crate::types::Value;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Structural identity of a call site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    signature: Signature,
    arguments: Vec<RowExpression>,
}

impl CallSite {
    pub fn new(signature: Signature, arguments: Vec<RowExpression>) -> Self {
        Self {
            signature,
            arguments,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn arguments(&self) -> &[RowExpression] {
        &self.arguments
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.signature.name())?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", argument)?;
        }
        write!(f, ")")
    }
}

/// Resolved implementation of a call site
#[derive(Debug, Clone)]
pub struct FunctionBinding {
    binding_id: u64,
    target: BindingTarget,
}

impl FunctionBinding {
    pub fn binding_id(&self) -> u64 {
        self.binding_id
    }

    pub fn target(&self) -> &BindingTarget {
        &self.target
    }
}

type BindingCell = Arc<Mutex<Option<FunctionBinding>>>;

pub struct CallSiteBinder {
    functions: Arc<FunctionRegistry>,
    bindings: DashMap<CallSite, BindingCell>,
    next_binding_id: AtomicU64,
    lookups: AtomicU64,
}

impl CallSiteBinder {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self {
            functions,
            bindings: DashMap::new(),
            next_binding_id: AtomicU64::new(1),
            lookups: AtomicU64::new(0),
        }
    }

    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Binding for `call_site`, resolving it on first use.
    ///
    /// A failed resolution is not cached; the next bind retries.
    pub fn resolve(&self, call_site: &CallSite) -> CompileResult<FunctionBinding> {
        // The shard guard from `get` must be released before `entry` takes it.
        let existing = self
            .bindings
            .get(call_site)
            .map(|cell| Arc::clone(cell.value()));
        let cell = match existing {
            Some(cell) => cell,
            None => Arc::clone(self.bindings.entry(call_site.clone()).or_default().value()),
        };

        let mut slot = cell.lock();
        if let Some(binding) = slot.as_ref() {
            log::trace!("call site {} reuses binding {}", call_site, binding.binding_id);
            return Ok(binding.clone());
        }

        self.lookups.fetch_add(1, Ordering::Relaxed);
        let target = match self.functions.resolve(call_site.signature()) {
            Ok(target) => target,
            Err(e) => {
                drop(slot);
                // Drop the empty cell so unresolvable call sites do not accumulate
                self.bindings
                    .remove_if(call_site, |_, entry| entry.lock().is_none());
                return Err(e);
            }
        };
        let binding = FunctionBinding {
            binding_id: self.next_binding_id.fetch_add(1, Ordering::Relaxed),
            target,
        };
        log::debug!(
            "bound call site {} to {:?} as binding {}",
            call_site,
            binding.target,
            binding.binding_id
        );
        *slot = Some(binding.clone());
        Ok(binding)
    }

    /// Bind a call site and package the binding with the already generated
    /// argument code.
    pub fn bind(
        &self,
        signature: &Signature,
        session_accessor: SessionAccessor,
        arguments: &[RowExpression],
        argument_code: Vec<Fragment>,
    ) -> CompileResult<BoundCallSite> {
        if argument_code.len() != signature.arity() {
            return Err(CompileError::ArityMismatch {
                signature: signature.clone(),
                expected: signature.arity(),
                actual: argument_code.len(),
            });
        }
        let call_site = CallSite::new(signature.clone(), arguments.to_vec());
        let binding = self.resolve(&call_site)?;
        Ok(BoundCallSite {
            call_site,
            binding,
            session_accessor,
            arguments: argument_code,
        })
    }

    /// Number of times the function table has been queried
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of call sites with a cache entry, bound or being bound
    pub fn call_site_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of call sites holding a binding
    pub fn bound_call_sites(&self) -> usize {
        self.bindings
            .iter()
            .filter(|entry| entry.value().lock().is_some())
            .count()
    }
}

impl fmt::Debug for CallSiteBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSiteBinder")
            .field("call_sites", &self.bindings.len())
            .field("lookups", &self.lookup_count())
            .finish()
    }
}

/// A binding packaged with the code that evaluates its arguments
pub struct BoundCallSite {
    call_site: CallSite,
    binding: FunctionBinding,
    session_accessor: SessionAccessor,
    arguments: Vec<Fragment>,
}

impl BoundCallSite {
    pub fn call_site(&self) -> &CallSite {
        &self.call_site
    }

    pub fn binding(&self) -> &FunctionBinding {
        &self.binding
    }

    /// Splice the bound function and its argument code into one fragment.
    ///
    /// Arguments run left to right. Unless the function is null tolerant, the
    /// first NULL argument ends the call with NULL: later arguments are not
    /// evaluated and the implementation is not invoked.
    pub fn into_fragment(self) -> CompileResult<Fragment> {
        let function = match self.binding.target {
            BindingTarget::Scalar(function) => function,
            BindingTarget::Aggregation(_) => {
                return Err(CompileError::AggregateInScalarContext {
                    signature: self.call_site.signature,
                })
            }
        };
        let arguments = self.arguments;
        let session_accessor = self.session_accessor;

        if function.is_null_tolerant() {
            return Ok(fragment(move |cursor| {
                let values = arguments
                    .iter()
                    .map(|argument| argument(cursor))
                    .collect::<Result<Vec<Value>, _>>()?;
                function.invoke(session_accessor.session(cursor), &values)
            }));
        }

        Ok(fragment(move |cursor| {
            let mut values = Vec::with_capacity(arguments.len());
            for argument in arguments.iter() {
                let value = argument(cursor)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                values.push(value);
            }
            function.invoke(session_accessor.session(cursor), &values)
        }))
    }
}

impl fmt::Debug for BoundCallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCallSite")
            .field("call_site", &self.call_site)
            .field("binding", &self.binding)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn add_bigint() -> Signature {
        Signature::new("add", Type::Bigint, vec![Type::Bigint, Type::Bigint])
    }

    fn add_site() -> CallSite {
        CallSite::new(
            add_bigint(),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(5)],
        )
    }

    #[test]
    fn test_resolve_is_cached_per_call_site() {
        let binder = CallSiteBinder::new(Arc::new(FunctionRegistry::new()));
        let first = binder.resolve(&add_site()).unwrap();
        let second = binder.resolve(&add_site()).unwrap();
        assert_eq!(first.binding_id(), second.binding_id());
        assert_eq!(binder.lookup_count(), 1);
        assert_eq!(binder.bound_call_sites(), 1);

        // same signature, different arguments: a different call site
        let other = CallSite::new(
            add_bigint(),
            vec![RowExpression::input(0, Type::Bigint), RowExpression::bigint(6)],
        );
        let third = binder.resolve(&other).unwrap();
        assert_ne!(first.binding_id(), third.binding_id());
        assert_eq!(binder.lookup_count(), 2);
    }

    #[test]
    fn test_failed_bind_is_not_cached() {
        let binder = CallSiteBinder::new(Arc::new(FunctionRegistry::new()));
        let missing = CallSite::new(Signature::new("nope", Type::Bigint, vec![]), vec![]);
        assert!(matches!(
            binder.resolve(&missing),
            Err(CompileError::FunctionNotFound { .. })
        ));
        assert!(binder.resolve(&missing).is_err());
        assert_eq!(binder.lookup_count(), 2);
        assert_eq!(binder.bound_call_sites(), 0);
        assert_eq!(binder.call_site_count(), 0);

        for i in 0..100 {
            let site = CallSite::new(
                Signature::new("nope", Type::Bigint, vec![Type::Bigint]),
                vec![RowExpression::bigint(i)],
            );
            assert!(binder.resolve(&site).is_err());
        }
        assert_eq!(binder.call_site_count(), 0);

        binder.resolve(&add_site()).unwrap();
        assert_eq!(binder.call_site_count(), 1);
    }

    #[test]
    fn test_bind_checks_argument_code() {
        let binder = CallSiteBinder::new(Arc::new(FunctionRegistry::new()));
        let result = binder.bind(
            &add_bigint(),
            SessionAccessor,
            add_site().arguments(),
            Vec::new(),
        );
        assert!(matches!(result, Err(CompileError::ArityMismatch { .. })));
    }

    #[test]
    fn test_aggregate_cannot_become_scalar_code() {
        let binder = CallSiteBinder::new(Arc::new(FunctionRegistry::new()));
        let count = Signature::new("count", Type::Bigint, vec![Type::Bigint]);
        let argument = fragment(|_| Ok(Value::Bigint(1)));
        let bound = binder
            .bind(
                &count,
                SessionAccessor,
                &[RowExpression::input(0, Type::Bigint)],
                vec![argument],
            )
            .unwrap();
        assert!(bound.binding().target().is_aggregation());
        assert!(matches!(
            bound.into_fragment(),
            Err(CompileError::AggregateInScalarContext { .. })
        ));
    }
}
