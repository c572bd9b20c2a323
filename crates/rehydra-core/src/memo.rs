//! # Memo Cache
//!
//! Name → `Func` mapping for one session. A name is materialized at most
//! once; every later lookup returns the identical node.
//!
//! The cache owns the session's `FuncGraph`; new nodes are created in it.
//! Insertions are journaled so a failed rehydration can be rolled back to a
//! checkpoint, leaving no partially linked nodes behind in either the cache
//! or the graph.

use crate::func::{Func, FuncGraph};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Position in the insertion journal and the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    journal: usize,
    nodes: usize,
}

/// Session-scoped cache of rehydrated functions.
#[derive(Debug, Default)]
pub struct MemoCache {
    graph: Rc<FuncGraph>,
    entries: BTreeMap<String, Func>,
    journal: Vec<String>,
}

impl MemoCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph new nodes are created in.
    #[must_use]
    pub fn graph(&self) -> &Rc<FuncGraph> {
        &self.graph
    }

    /// Lookup a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Func> {
        self.entries.get(name)
    }

    /// Check if a name has been materialized (complete or not).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Publish a node under its own name.
    ///
    /// Returns the node already registered under that name, if any, and
    /// leaves it in place.
    pub fn insert(&mut self, func: Func) -> Option<Func> {
        if let Some(existing) = self.entries.get(func.name()) {
            return Some(existing.clone());
        }
        self.journal.push(func.name().to_string());
        self.entries.insert(func.name().to_string(), func);
        None
    }

    /// Number of cached functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All cached functions in name order.
    pub fn funcs(&self) -> impl Iterator<Item = &Func> {
        self.entries.values()
    }

    /// Mark the current journal position.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal: self.journal.len(),
            nodes: self.graph.len(),
        }
    }

    /// Forget every node created or inserted after `checkpoint`.
    ///
    /// Returns the number of cache entries removed.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> usize {
        let mut removed = 0;
        if checkpoint.journal < self.journal.len() {
            for name in self.journal.drain(checkpoint.journal..) {
                self.entries.remove(&name);
                removed += 1;
            }
        }
        self.graph.truncate(checkpoint.nodes);
        removed
    }
}

// =============================================================================
// TESTS
// =============================================================================
