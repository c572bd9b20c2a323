//! Definition rehydration: memo lookup, placeholder publication, body.

use super::Rehydrator;
use crate::accessor::EnvironmentAccessor;
use crate::func::Func;
use crate::types::{DefinitionBody, RehydrateError};
use std::collections::BTreeSet;

impl<A: EnvironmentAccessor> Rehydrator<'_, A> {
    /// Rehydrate the definition called `name`.
    ///
    /// Returns the memoized node if `name` was already materialized in this
    /// session, so every reference to a name yields the identical node.
    ///
    /// On failure every node created by this call is removed from the cache
    /// and its graph again, so a retry reports the same error.
    ///
    /// # Errors
    /// - `UnknownDefinition` if `name` is not in the table
    /// - `UnsupportedReduction` if its body is a reduction
    /// - `CallDepthExceeded` if the call chain is too deep
    /// - anything raised while rehydrating the body
    pub fn rehydrate_definition(&mut self, name: &str) -> Result<Func, RehydrateError> {
        if let Some(func) = self.cache.get(name) {
            tracing::trace!(func = %name, complete = func.is_complete(), "memo hit");
            return Ok(func.clone());
        }

        let table = self.table;
        let def = table
            .get(name)
            .ok_or_else(|| RehydrateError::UnknownDefinition(name.to_string()))?;

        let body = match &def.body {
            DefinitionBody::Pure(expr) => expr,
            DefinitionBody::Reduce { .. } => {
                return Err(RehydrateError::UnsupportedReduction(name.to_string()));
            }
        };

        if self.depth >= self.max_call_depth {
            return Err(RehydrateError::CallDepthExceeded {
                name: name.to_string(),
                limit: self.max_call_depth,
            });
        }

        tracing::debug!(func = %name, depth = self.depth, "rehydrating");

        let checkpoint = self.cache.checkpoint();
        let func = Func::placeholder(
            self.cache.graph(),
            def.name.clone(),
            def.args.clone(),
            def.return_type,
        );
        self.cache.insert(func.clone());

        let bound: BTreeSet<String> = def.args.iter().map(|arg| arg.name.clone()).collect();

        self.depth += 1;
        let result = self.rehydrate_expression(name, &bound, body);
        self.depth -= 1;

        match result {
            Ok(body) => {
                func.complete(body);
                Ok(func)
            }
            Err(e) => {
                let removed = self.cache.rollback(checkpoint);
                tracing::debug!(func = %name, removed, "rolled back");
                Err(e)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
