use crate::error::EvalResult;
use crate::session::Session;
use crate::signature::Signature;
use crate::types::Value;
use std::fmt;
use std::sync::Arc;

/// Executable body of a scalar function. Receives already evaluated
/// arguments in declaration order.
pub type ScalarImplementation =
    Arc<dyn Fn(&Session, &[Value]) -> EvalResult<Value> + Send + Sync>;

/// A scalar function bound to one signature
#[derive(Clone)]
pub struct ScalarFunction {
    signature: Signature,
    null_tolerant: bool,
    implementation: ScalarImplementation,
}

impl ScalarFunction {
    /// Function that yields NULL as soon as any argument is NULL.
    /// The implementation never sees a NULL argument.
    pub fn new<F>(signature: Signature, implementation: F) -> Self
    where
        F: Fn(&Session, &[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Self {
            signature,
            null_tolerant: false,
            implementation: Arc::new(implementation),
        }
    }

    /// Function that handles NULL arguments itself
    pub fn null_tolerant<F>(signature: Signature, implementation: F) -> Self
    where
        F: Fn(&Session, &[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Self {
            signature,
            null_tolerant: true,
            implementation: Arc::new(implementation),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn is_null_tolerant(&self) -> bool {
        self.null_tolerant
    }

    pub fn invoke(&self, session: &Session, arguments: &[Value]) -> EvalResult<Value> {
        (self.implementation)(session, arguments)
    }
}

impl fmt::Debug for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunction")
            .field("signature", &self.signature)
            .field("null_tolerant", &self.null_tolerant)
            .finish()
    }
}
