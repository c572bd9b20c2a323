//! # Rehydration
//!
//! Turns parsed definitions into linked `Func` nodes.
//!
//! ```text
//! rehydrate_definition(name)
//!   ├─ memo hit ─────────────────────────────► existing node
//!   ├─ publish placeholder in the memo cache
//!   ├─ rehydrate_expression(body)
//!   │    ├─ free variables ─► bound var | uniform
//!   │    └─ call sites ─────► rehydrate_definition(callee) | image | error
//!   └─ on error ─────────────────────────────► roll back to checkpoint
//! ```
//!
//! Placeholders are published before their bodies are built, so a self- or
//! mutually-recursive reference resolves to the node under construction
//! instead of recursing forever.

mod definition;
mod expression;

use crate::accessor::EnvironmentAccessor;
use crate::memo::MemoCache;
use crate::primitives::MAX_CALL_DEPTH;
use crate::table::DefinitionTable;

/// One rehydration pass over a definition table and a memo cache.
///
/// Borrowed state only: the session owns the table and the cache and lends
/// them for the duration of one call.
pub struct Rehydrator<'s, A: EnvironmentAccessor> {
    accessor: &'s A,
    table: &'s DefinitionTable<A::Expr, A::Domain>,
    cache: &'s mut MemoCache,
    max_call_depth: usize,
    depth: usize,
}

impl<'s, A: EnvironmentAccessor> Rehydrator<'s, A> {
    /// Create a rehydrator with the default call depth limit.
    pub fn new(
        accessor: &'s A,
        table: &'s DefinitionTable<A::Expr, A::Domain>,
        cache: &'s mut MemoCache,
    ) -> Self {
        Self {
            accessor,
            table,
            cache,
            max_call_depth: MAX_CALL_DEPTH,
            depth: 0,
        }
    }

    /// Override the call depth limit.
    #[must_use]
    pub fn with_max_call_depth(mut self, limit: usize) -> Self {
        self.max_call_depth = limit;
        self
    }
}
