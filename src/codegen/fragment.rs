//! Executable code fragments.

use crate::error::EvalResult;
use crate::page::Page;
use crate::session::Session;
use crate::types::Value;
use std::sync::Arc;

/// The row a fragment is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct RowCursor<'a> {
    session: &'a Session,
    page: &'a Page,
    position: usize,
}

impl<'a> RowCursor<'a> {
    pub fn new(session: &'a Session, page: &'a Page, position: usize) -> Self {
        Self {
            session,
            page,
            position,
        }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    pub fn page(&self) -> &'a Page {
        self.page
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Generated code for one expression node. Yields `Value::Null` for SQL NULL.
///
/// Fragments are built once at compile time and then shared read-only by
/// every thread evaluating rows.
pub type Fragment = Arc<dyn Fn(&RowCursor<'_>) -> EvalResult<Value> + Send + Sync>;

pub fn fragment<F>(code: F) -> Fragment
where
    F: Fn(&RowCursor<'_>) -> EvalResult<Value> + Send + Sync + 'static,
{
    Arc::new(code)
}

/// Hands generated code the session of the row being evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionAccessor;

impl SessionAccessor {
    pub fn session<'a>(&self, cursor: &RowCursor<'a>) -> &'a Session {
        cursor.session()
    }
}
