//! # Session Module
//!
//! A `Session` owns everything one rehydration run needs:
//! - the definition table, built once and read-only afterwards
//! - the memo cache, shared by every `rehydrate` call on this session
//!
//! Sessions never share caches. A failed `rehydrate` call rolls the cache
//! back to where it was before the call, so callers never observe a
//! partially linked graph.

use crate::accessor::EnvironmentAccessor;
use crate::func::Func;
use crate::memo::MemoCache;
use crate::primitives::MAX_CALL_DEPTH;
use crate::rehydrate::Rehydrator;
use crate::table::{DefinitionTable, DuplicatePolicy};
use crate::types::RehydrateError;
use serde::{Deserialize, Serialize};

/// Tunables for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Handling of definitions that share a name.
    pub duplicates: DuplicatePolicy,
    /// Maximum nesting of definition rehydration.
    pub max_call_depth: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::default(),
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

/// One rehydration session over a deserialized environment.
pub struct Session<'a, A: EnvironmentAccessor> {
    accessor: &'a A,
    table: DefinitionTable<A::Expr, A::Domain>,
    cache: MemoCache,
    options: SessionOptions,
}

impl<'a, A: EnvironmentAccessor> Session<'a, A> {
    /// Deserialize `blob` and build its definition table with default options.
    pub fn new(accessor: &'a A, blob: &str) -> Result<Self, RehydrateError> {
        Self::with_options(accessor, blob, SessionOptions::default())
    }

    /// Deserialize `blob` and build its definition table.
    pub fn with_options(
        accessor: &'a A,
        blob: &str,
        options: SessionOptions,
    ) -> Result<Self, RehydrateError> {
        let env = accessor.deserialize_env(blob)?;
        let table = DefinitionTable::build(accessor, &env, options.duplicates)?;
        tracing::debug!(definitions = table.len(), "definition table built");
        Ok(Self::from_table(accessor, table, options))
    }

    /// Start a session over an already built table.
    #[must_use]
    pub fn from_table(
        accessor: &'a A,
        table: DefinitionTable<A::Expr, A::Domain>,
        options: SessionOptions,
    ) -> Self {
        Self {
            accessor,
            table,
            cache: MemoCache::new(),
            options,
        }
    }

    /// Rehydrate `root` and everything it reaches.
    ///
    /// Names rehydrated by earlier calls on this session are reused, so the
    /// same name always yields the identical node.
    pub fn rehydrate(&mut self, root: &str) -> Result<Func, RehydrateError> {
        let result = Rehydrator::new(self.accessor, &self.table, &mut self.cache)
            .with_max_call_depth(self.options.max_call_depth)
            .rehydrate_definition(root);

        match result {
            Ok(func) => {
                tracing::info!(root = %root, cached = self.cache.len(), "rehydrated");
                Ok(func)
            }
            Err(e) => {
                tracing::warn!(
                    root = %root,
                    cached = self.cache.len(),
                    error = %e,
                    "rehydration failed"
                );
                Err(e)
            }
        }
    }

    /// The definition table.
    #[must_use]
    pub fn table(&self) -> &DefinitionTable<A::Expr, A::Domain> {
        &self.table
    }

    /// Every function materialized so far, in name order.
    pub fn funcs(&self) -> impl Iterator<Item = &Func> {
        self.cache.funcs()
    }

    /// The options this session runs with.
    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.options
    }
}

/// Rehydrate `root` from `blob` in a fresh session.
pub fn rehydrate<A: EnvironmentAccessor>(
    accessor: &A,
    blob: &str,
    root: &str,
) -> Result<Func, RehydrateError> {
    Session::new(accessor, blob)?.rehydrate(root)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::JsonAccessor;
    use serde_json::json;

    fn env() -> String {
        json!({ "definitions": [
            { "name": "ok", "return_type": "i32",
              "body": { "pure": { "op": "int", "value": 1 } } },
            { "name": "leaf", "return_type": "i32",
              "body": { "pure": { "op": "int", "value": 2 } } },
            { "name": "broken", "return_type": "i32",
              "body": { "pure": { "op": "add",
                  "lhs": { "op": "call", "name": "leaf", "kind": "func", "type": "i32" },
                  "rhs": { "op": "call", "name": "missing", "kind": "func", "type": "i32" } } } }
        ] })
        .to_string()
    }

    #[test]
    fn failed_call_leaves_no_new_nodes() {
        let acc = JsonAccessor::new();
        let mut session = Session::new(&acc, &env()).expect("session");

        session.rehydrate("ok").expect("ok");
        assert!(session.rehydrate("broken").is_err());

        let names: Vec<_> = session.funcs().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn session_reuses_nodes_across_calls() {
        let acc = JsonAccessor::new();
        let mut session = Session::new(&acc, &env()).expect("session");

        let first = session.rehydrate("leaf").expect("first");
        let second = session.rehydrate("leaf").expect("second");
        assert!(first.same_as(&second));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: SessionOptions =
            serde_json::from_str(r#"{ "duplicates": "reject" }"#).expect("options");
        assert_eq!(options.duplicates, DuplicatePolicy::Reject);
        assert_eq!(options.max_call_depth, MAX_CALL_DEPTH);
    }

    #[test]
    fn invalid_blob_fails_before_rehydration() {
        let acc = JsonAccessor::new();
        assert!(matches!(
            rehydrate(&acc, "{", "f"),
            Err(RehydrateError::Access(_))
        ));
    }
}
