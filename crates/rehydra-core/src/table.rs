//! # Definition Table
//!
//! Walks the deserialized environment's definition list once and unpacks
//! every entry into a `Definition`, keyed by name.
//!
//! - Purely syntactic: no cross-references are resolved here
//! - Rejects bodies that are neither pure nor reduction forms
//! - Duplicate names follow the configured `DuplicatePolicy`

use crate::accessor::EnvironmentAccessor;
use crate::types::{AccessError, Arg, Definition, RehydrateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What to do when two definitions share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The later definition replaces the earlier one (logged).
    #[default]
    Replace,
    /// Fail with `RehydrateError::DuplicateDefinition`.
    Reject,
}

/// Name → definition mapping, read-only once built.
#[derive(Debug, Clone)]
pub struct DefinitionTable<E, D> {
    definitions: BTreeMap<String, Definition<E, D>>,
}

impl<E, D> Default for DefinitionTable<E, D> {
    fn default() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }
}

impl<E, D> DefinitionTable<E, D> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from an environment's definition list.
    pub fn build<A>(
        accessor: &A,
        env: &A::Env,
        policy: DuplicatePolicy,
    ) -> Result<Self, RehydrateError>
    where
        A: EnvironmentAccessor<Expr = E, Domain = D>,
    {
        let mut table = Self::new();
        for def in accessor.iter(accessor.definitions(env)?) {
            let definition = parse_definition(accessor, &def)?;
            tracing::debug!(
                func = %definition.name,
                arity = definition.args.len(),
                reduce = definition.is_reduce(),
                "parsed definition"
            );
            table.insert(definition, policy)?;
        }
        Ok(table)
    }

    /// Insert a definition, applying `policy` on name collision.
    pub fn insert(
        &mut self,
        definition: Definition<E, D>,
        policy: DuplicatePolicy,
    ) -> Result<(), RehydrateError> {
        if self.definitions.contains_key(&definition.name) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(RehydrateError::DuplicateDefinition(definition.name));
                }
                DuplicatePolicy::Replace => {
                    tracing::warn!(
                        func = %definition.name,
                        "duplicate definition replaces an earlier one"
                    );
                }
            }
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Lookup a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Definition<E, D>> {
        self.definitions.get(name)
    }

    /// Check if a definition exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Definition<E, D>> {
        self.definitions.values()
    }
}

/// Unpack one serialized definition.
pub fn parse_definition<A: EnvironmentAccessor>(
    accessor: &A,
    def: &A::Def,
) -> Result<Definition<A::Expr, A::Domain>, RehydrateError> {
    let name = accessor.definition_name(def)?;
    let malformed = |reason: String| RehydrateError::MalformedDefinition {
        name: name.clone(),
        reason,
    };
    let from_access = |e: AccessError| malformed(e.message);

    let mut args = Vec::new();
    let mut seen = BTreeSet::new();
    for (arg_name, ty) in accessor.iter(accessor.definition_args(def).map_err(from_access)?) {
        if !seen.insert(arg_name.clone()) {
            return Err(malformed(format!("duplicate argument '{}'", arg_name)));
        }
        args.push(Arg::new(arg_name, ty));
    }

    let return_type = accessor
        .definition_return_type(def)
        .map_err(from_access)?;

    let body = accessor
        .definition_body(def)
        .map_err(from_access)?
        .ok_or_else(|| malformed("body is neither pure nor a reduction".to_string()))?;

    Ok(Definition {
        name,
        args,
        return_type,
        body,
    })
}

// =============================================================================
// TESTS
// =============================================================================
