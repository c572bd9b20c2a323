//! Expression rehydration: dependency classification and tree rebuilding.

use super::Rehydrator;
use crate::accessor::{CallTarget, EnvironmentAccessor, ExprShape};
use crate::expr::{CallRef, Dependency, Expr, ExprNode, ImageRef};
use crate::func::FuncRef;
use crate::types::{AccessError, RehydrateError};
use std::collections::{BTreeMap, BTreeSet};

impl<A: EnvironmentAccessor> Rehydrator<'_, A> {
    /// Rehydrate one serialized expression belonging to function `owner`.
    ///
    /// Free variables named in `bound` become bound variables; all others are
    /// uniforms. Calls into user functions rehydrate the callee; calls into
    /// images are kept unresolved; calls into external functions fail.
    /// Expressions are not memoized.
    pub fn rehydrate_expression(
        &mut self,
        owner: &str,
        bound: &BTreeSet<String>,
        expr: &A::Expr,
    ) -> Result<Expr, RehydrateError> {
        let accessor = self.accessor;
        let ty = accessor.expression_type(expr)?;
        let mut deps = Vec::new();

        for (name, var_ty) in accessor.iter(accessor.free_variables(expr)?) {
            if bound.contains(&name) {
                tracing::trace!(func = %owner, var = %name, "bound variable");
                deps.push(Dependency::Var(name));
            } else {
                tracing::trace!(func = %owner, uniform = %name, ty = %var_ty, "uniform");
                deps.push(Dependency::Uniform { name, ty: var_ty });
            }
        }

        let mut calls = BTreeMap::new();
        for (name, target) in accessor.iter(accessor.call_sites(expr)?) {
            let call = match accessor.classify_call_target(&target)? {
                CallTarget::UserFunction => {
                    let callee = self.rehydrate_definition(&name)?;
                    tracing::trace!(func = %owner, callee = %name, "function reference");
                    CallRef::Func(FuncRef::link(&callee))
                }
                CallTarget::ExternalImage => {
                    tracing::warn!(
                        func = %owner,
                        image = %name,
                        "image reference left unresolved (dimensionality unknown)"
                    );
                    CallRef::Image(ImageRef {
                        name: name.clone(),
                        ty: accessor.call_target_type(&target)?,
                    })
                }
                CallTarget::ExternalFunction => {
                    return Err(RehydrateError::UnsupportedExternCall {
                        name,
                        caller: owner.to_string(),
                    });
                }
            };
            deps.push(call.to_dependency());
            calls.insert(name, call);
        }

        let root = self.rebuild(bound, &calls, expr)?;
        Ok(Expr::new(ty, root, deps))
    }

    /// Rebuild the operator tree, substituting classified references.
    fn rebuild(
        &self,
        bound: &BTreeSet<String>,
        calls: &BTreeMap<String, CallRef>,
        expr: &A::Expr,
    ) -> Result<ExprNode, RehydrateError> {
        let node = match self.accessor.expression_shape(expr)? {
            ExprShape::IntImm(v) => ExprNode::IntImm(v),
            ExprShape::FloatImm(v) => ExprNode::FloatImm(v),
            ExprShape::Var { name, ty } => {
                if bound.contains(&name) {
                    ExprNode::Var(name)
                } else {
                    ExprNode::Uniform { name, ty }
                }
            }
            ExprShape::Cast { ty, value } => ExprNode::Cast {
                ty,
                value: Box::new(self.rebuild(bound, calls, &value)?),
            },
            ExprShape::Unary { op, value } => ExprNode::Unary {
                op,
                value: Box::new(self.rebuild(bound, calls, &value)?),
            },
            ExprShape::Binary { op, lhs, rhs } => ExprNode::Binary {
                op,
                lhs: Box::new(self.rebuild(bound, calls, &lhs)?),
                rhs: Box::new(self.rebuild(bound, calls, &rhs)?),
            },
            ExprShape::Select {
                cond,
                then,
                otherwise,
            } => ExprNode::Select {
                cond: Box::new(self.rebuild(bound, calls, &cond)?),
                then: Box::new(self.rebuild(bound, calls, &then)?),
                otherwise: Box::new(self.rebuild(bound, calls, &otherwise)?),
            },
            ExprShape::Call { name, args } => {
                let target = calls.get(&name).cloned().ok_or_else(|| {
                    AccessError::new(format!("call to '{}' is not listed in call sites", name))
                })?;
                let args = args
                    .iter()
                    .map(|arg| self.rebuild(bound, calls, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                ExprNode::Call { target, args }
            }
        };
        Ok(node)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::expr::{CallRef, Dependency, ExprNode};
    use crate::formats::JsonAccessor;
    use crate::memo::MemoCache;
    use crate::rehydrate::Rehydrator;
    use crate::table::{DefinitionTable, DuplicatePolicy};
    use crate::types::{RehydrateError, Type};
    use serde_json::{Value, json};
    use std::collections::BTreeSet;

    fn table(defs: Vec<Value>) -> DefinitionTable<Value, Value> {
        DefinitionTable::build(
            &JsonAccessor::new(),
            &json!({ "definitions": defs }),
            DuplicatePolicy::Replace,
        )
        .expect("table")
    }

    fn bound(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn classifies_vars_by_argument_membership() {
        let acc = JsonAccessor::new();
        let table = table(vec![]);
        let mut cache = MemoCache::new();
        let mut r = Rehydrator::new(&acc, &table, &mut cache);

        let expr = json!({
            "op": "mul",
            "lhs": { "op": "var", "name": "x" },
            "rhs": { "op": "var", "name": "scale", "type": "f32" }
        });
        let out = r
            .rehydrate_expression("f", &bound(&["x"]), &expr)
            .expect("expr");

        assert_eq!(out.bound_vars().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(
            out.uniforms().collect::<Vec<_>>(),
            vec![("scale", Type::float(32))]
        );
        match out.root() {
            ExprNode::Binary { lhs, rhs, .. } => {
                assert!(matches!(lhs.as_ref(), ExprNode::Var(name) if name == "x"));
                assert!(matches!(rhs.as_ref(), ExprNode::Uniform { name, .. } if name == "scale"));
            }
            other => unreachable!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn image_calls_stay_unresolved() {
        let acc = JsonAccessor::new();
        let table = table(vec![]);
        let mut cache = MemoCache::new();
        let mut r = Rehydrator::new(&acc, &table, &mut cache);

        let expr = json!({
            "op": "call", "name": "input", "kind": "image", "type": "u8",
            "args": [ { "op": "var", "name": "x" }, { "op": "var", "name": "y" } ]
        });
        let out = r
            .rehydrate_expression("blur", &bound(&["x", "y"]), &expr)
            .expect("expr");

        let images: Vec<_> = out.images().map(|i| (i.name.as_str(), i.ty)).collect();
        assert_eq!(images, vec![("input", Type::uint(8))]);
        assert!(matches!(
            out.root(),
            ExprNode::Call { target: CallRef::Image(_), args } if args.len() == 2
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn extern_calls_fail() {
        let acc = JsonAccessor::new();
        let table = table(vec![]);
        let mut cache = MemoCache::new();
        let mut r = Rehydrator::new(&acc, &table, &mut cache);

        let expr = json!({ "op": "call", "name": "sinf", "kind": "extern", "type": "f32",
                           "args": [ { "op": "var", "name": "x" } ] });
        assert_eq!(
            r.rehydrate_expression("wave", &bound(&["x"]), &expr)
                .expect_err("extern"),
            RehydrateError::UnsupportedExternCall {
                name: "sinf".to_string(),
                caller: "wave".to_string(),
            }
        );
    }

    #[test]
    fn user_calls_become_function_dependencies() {
        let acc = JsonAccessor::new();
        let table = table(vec![json!({
            "name": "g",
            "args": [ { "name": "x", "type": "i32" } ],
            "return_type": "i32",
            "body": { "pure": { "op": "var", "name": "x" } }
        })]);
        let mut cache = MemoCache::new();
        let mut r = Rehydrator::new(&acc, &table, &mut cache);

        let expr = json!({ "op": "call", "name": "g", "kind": "func", "type": "i32",
                           "args": [ { "op": "var", "name": "y" } ] });
        let out = r
            .rehydrate_expression("f", &bound(&["y"]), &expr)
            .expect("expr");

        let kinds: Vec<_> = out
            .dependencies()
            .iter()
            .map(|d| (d.kind(), d.name().to_string()))
            .collect();
        assert_eq!(
            kinds,
            vec![("var", "y".to_string()), ("func", "g".to_string())]
        );
        assert!(matches!(&out.dependencies()[1], Dependency::Func(g) if !g.is_recursive()));
    }

    #[test]
    fn unknown_callee_is_reported_by_name() {
        let acc = JsonAccessor::new();
        let table = table(vec![]);
        let mut cache = MemoCache::new();
        let mut r = Rehydrator::new(&acc, &table, &mut cache);

        let expr = json!({ "op": "call", "name": "unknownFn", "kind": "func", "type": "i32" });
        assert_eq!(
            r.rehydrate_expression("h", &bound(&[]), &expr)
                .expect_err("unknown"),
            RehydrateError::UnknownDefinition("unknownFn".to_string())
        );
    }
}
