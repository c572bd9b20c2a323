//! # JSON Environment Format
//!
//! `JsonAccessor` exposes a JSON environment document through the
//! `EnvironmentAccessor` interface.
//!
//! ```json
//! { "definitions": [
//!     { "name": "g",
//!       "args": [ { "name": "x", "type": "i32" } ],
//!       "return_type": "i32",
//!       "body": { "pure": { "op": "add",
//!                           "lhs": { "op": "var", "name": "x" },
//!                           "rhs": { "op": "int", "value": 1 } } } }
//! ] }
//! ```
//!
//! Expressions are objects tagged by `"op"`. Variables default to `i32`.
//! Calls carry `"kind"` (`func`, `extern` or `image`) and their value
//! `"type"`. Any expression may carry an explicit `"type"`; without one the
//! type is derived from its structure.
//!
//! The document is parsed into a `serde_json::Value` once; handles are
//! sub-values of it.

use crate::accessor::{BinaryOp, CallTarget, EnvironmentAccessor, ExprShape, UnaryOp};
use crate::types::{AccessError, DefinitionBody, Type};
use serde_json::Value;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Type assumed for a variable without an explicit `"type"`.
const DEFAULT_VAR_TYPE: Type = Type::int(32);

// =============================================================================
// LIST HANDLE
// =============================================================================

/// Shared-slice list: `tail` is a cursor bump, never a copy.
#[derive(Debug, Clone)]
pub struct JsonList<T> {
    items: Rc<[T]>,
    start: usize,
}

impl<T> JsonList<T> {
    fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
            start: 0,
        }
    }

    /// Number of remaining elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len().saturating_sub(self.start)
    }
}

// =============================================================================
// ACCESSOR
// =============================================================================

/// Accessor over the JSON environment format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAccessor;

impl JsonAccessor {
    /// Create a new JSON accessor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Depth-first, left-to-right pre-order walk over an expression.
    fn visit<F>(&self, expr: &Value, f: &mut F) -> Result<(), AccessError>
    where
        F: FnMut(&Value, &ExprShape<Value>),
    {
        let shape = self.expression_shape(expr)?;
        f(expr, &shape);
        for child in shape.children() {
            self.visit(child, f)?;
        }
        Ok(())
    }
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn field<'v>(obj: &'v Value, key: &str) -> Result<&'v Value, AccessError> {
    obj.get(key)
        .ok_or_else(|| AccessError::new(format!("missing '{}' field", key)))
}

fn str_field(obj: &Value, key: &str) -> Result<String, AccessError> {
    field(obj, key)?
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AccessError::new(format!("'{}' must be a string", key)))
}

fn type_field(obj: &Value, key: &str) -> Result<Type, AccessError> {
    Ok(str_field(obj, key)?.parse()?)
}

fn array_field<'v>(obj: &'v Value, key: &str) -> Result<&'v Vec<Value>, AccessError> {
    field(obj, key)?
        .as_array()
        .ok_or_else(|| AccessError::new(format!("'{}' must be an array", key)))
}

fn binary_op(op: &str) -> Option<BinaryOp> {
    Some(match op {
        "add" => BinaryOp::Add,
        "sub" => BinaryOp::Sub,
        "mul" => BinaryOp::Mul,
        "div" => BinaryOp::Div,
        "mod" => BinaryOp::Mod,
        "min" => BinaryOp::Min,
        "max" => BinaryOp::Max,
        "eq" => BinaryOp::Eq,
        "ne" => BinaryOp::Ne,
        "lt" => BinaryOp::Lt,
        "le" => BinaryOp::Le,
        "gt" => BinaryOp::Gt,
        "ge" => BinaryOp::Ge,
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        _ => return None,
    })
}

impl EnvironmentAccessor for JsonAccessor {
    type Env = Value;
    type Def = Value;
    type Expr = Value;
    type Target = Value;
    type Domain = Value;
    type List<T: Clone> = JsonList<T>;

    fn deserialize_env(&self, blob: &str) -> Result<Value, AccessError> {
        let env: Value = serde_json::from_str(blob)
            .map_err(|e| AccessError::new(format!("invalid environment JSON: {}", e)))?;
        if !env.is_object() {
            return Err(AccessError::new("environment must be a JSON object"));
        }
        Ok(env)
    }

    fn definitions(&self, env: &Value) -> Result<JsonList<Value>, AccessError> {
        Ok(JsonList::from_vec(array_field(env, "definitions")?.clone()))
    }

    fn definition_name(&self, def: &Value) -> Result<String, AccessError> {
        str_field(def, "name")
    }

    fn definition_args(&self, def: &Value) -> Result<JsonList<(String, Type)>, AccessError> {
        let args = match def.get("args") {
            Some(args) => args
                .as_array()
                .ok_or_else(|| AccessError::new("'args' must be an array"))?
                .iter()
                .map(|arg| Ok((str_field(arg, "name")?, type_field(arg, "type")?)))
                .collect::<Result<Vec<_>, AccessError>>()?,
            None => Vec::new(),
        };
        Ok(JsonList::from_vec(args))
    }

    fn definition_return_type(&self, def: &Value) -> Result<Type, AccessError> {
        type_field(def, "return_type")
    }

    fn definition_body(
        &self,
        def: &Value,
    ) -> Result<Option<DefinitionBody<Value, Value>>, AccessError> {
        let body = field(def, "body")?;

        if let Some(expr) = body.get("pure") {
            return Ok(Some(DefinitionBody::Pure(expr.clone())));
        }

        if let Some(reduce) = body.get("reduce") {
            return Ok(Some(DefinitionBody::Reduce {
                init: field(reduce, "init")?.clone(),
                update_location: field(reduce, "update")?.clone(),
                update_func: str_field(reduce, "update_func")?,
                domain: reduce
                    .get("domain")
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
            }));
        }

        Ok(None)
    }

    fn expression_type(&self, expr: &Value) -> Result<Type, AccessError> {
        if expr.get("type").is_some() {
            return type_field(expr, "type");
        }

        match self.expression_shape(expr)? {
            ExprShape::IntImm(_) => Ok(Type::int(32)),
            ExprShape::FloatImm(_) => Ok(Type::float(32)),
            ExprShape::Var { ty, .. } | ExprShape::Cast { ty, .. } => Ok(ty),
            ExprShape::Unary {
                op: UnaryOp::Not, ..
            } => Ok(Type::bool()),
            ExprShape::Unary { value, .. } => self.expression_type(&value),
            ExprShape::Binary { op, lhs, .. } => {
                if op.yields_bool() {
                    Ok(Type::bool())
                } else {
                    self.expression_type(&lhs)
                }
            }
            ExprShape::Select { then, .. } => self.expression_type(&then),
            ExprShape::Call { name, .. } => Err(AccessError::new(format!(
                "call to '{}' is missing its 'type'",
                name
            ))),
        }
    }

    fn expression_shape(&self, expr: &Value) -> Result<ExprShape<Value>, AccessError> {
        let op = str_field(expr, "op")?;

        let shape = match op.as_str() {
            "int" => ExprShape::IntImm(
                field(expr, "value")?
                    .as_i64()
                    .ok_or_else(|| AccessError::new("'int' value must be an integer"))?,
            ),
            "float" => ExprShape::FloatImm(
                field(expr, "value")?
                    .as_f64()
                    .ok_or_else(|| AccessError::new("'float' value must be a number"))?,
            ),
            "var" => ExprShape::Var {
                name: str_field(expr, "name")?,
                ty: match expr.get("type") {
                    Some(_) => type_field(expr, "type")?,
                    None => DEFAULT_VAR_TYPE,
                },
            },
            "cast" => ExprShape::Cast {
                ty: type_field(expr, "type")?,
                value: field(expr, "value")?.clone(),
            },
            "neg" | "not" => ExprShape::Unary {
                op: if op == "neg" {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Not
                },
                value: field(expr, "value")?.clone(),
            },
            "select" => ExprShape::Select {
                cond: field(expr, "cond")?.clone(),
                then: field(expr, "then")?.clone(),
                otherwise: field(expr, "else")?.clone(),
            },
            "call" => ExprShape::Call {
                name: str_field(expr, "name")?,
                args: match expr.get("args") {
                    Some(_) => array_field(expr, "args")?.clone(),
                    None => Vec::new(),
                },
            },
            other => match binary_op(other) {
                Some(op) => ExprShape::Binary {
                    op,
                    lhs: field(expr, "lhs")?.clone(),
                    rhs: field(expr, "rhs")?.clone(),
                },
                None => {
                    return Err(AccessError::new(format!(
                        "unknown expression op: '{}'",
                        other
                    )));
                }
            },
        };

        Ok(shape)
    }

    fn free_variables(&self, expr: &Value) -> Result<JsonList<(String, Type)>, AccessError> {
        let mut seen = BTreeSet::new();
        let mut vars = Vec::new();
        self.visit(expr, &mut |_, shape| {
            if let ExprShape::Var { name, ty } = shape {
                if seen.insert(name.clone()) {
                    vars.push((name.clone(), *ty));
                }
            }
        })?;
        Ok(JsonList::from_vec(vars))
    }

    fn call_sites(&self, expr: &Value) -> Result<JsonList<(String, Value)>, AccessError> {
        let mut seen = BTreeSet::new();
        let mut calls = Vec::new();
        self.visit(expr, &mut |node, shape| {
            if let ExprShape::Call { name, .. } = shape {
                if seen.insert(name.clone()) {
                    calls.push((name.clone(), node.clone()));
                }
            }
        })?;
        Ok(JsonList::from_vec(calls))
    }

    fn classify_call_target(&self, target: &Value) -> Result<CallTarget, AccessError> {
        match str_field(target, "kind")?.as_str() {
            "func" => Ok(CallTarget::UserFunction),
            "extern" => Ok(CallTarget::ExternalFunction),
            "image" => Ok(CallTarget::ExternalImage),
            other => Err(AccessError::new(format!("unknown call kind: '{}'", other))),
        }
    }

    fn call_target_type(&self, target: &Value) -> Result<Type, AccessError> {
        type_field(target, "type")
    }

    fn head<T: Clone>(&self, list: &JsonList<T>) -> Option<T> {
        list.items.get(list.start).cloned()
    }

    fn tail<T: Clone>(&self, list: &JsonList<T>) -> JsonList<T> {
        JsonList {
            items: Rc::clone(&list.items),
            start: (list.start + 1).min(list.items.len()),
        }
    }

    fn is_empty<T: Clone>(&self, list: &JsonList<T>) -> bool {
        list.len() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================
