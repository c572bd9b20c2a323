//! # Accessor Layer
//!
//! The capability interface through which the engine reads a deserialized
//! environment. The engine never parses serialized bytes itself: it only asks
//! an `EnvironmentAccessor` for definitions, expression types, free variables,
//! call sites and call-target classifications, and walks the returned
//! sequences with the `head` / `tail` / `is_empty` list primitives.
//!
//! A reference implementation over JSON lives in `formats::json`.

use crate::types::{AccessError, DefinitionBody, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CALL TARGETS
// =============================================================================

/// Classification of a call site's target.
///
/// Matched exhaustively by the rehydrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CallTarget {
    /// Another definition in the same environment.
    UserFunction,
    /// A foreign function outside the environment.
    ExternalFunction,
    /// An externally supplied image buffer.
    ExternalImage,
}

// =============================================================================
// OPERATORS
// =============================================================================

/// Binary operators understood by the expression representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Comparisons and logical connectives produce `bool`.
    #[must_use]
    pub const fn yields_bool(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::And | Self::Or
        )
    }

    /// Operator spelling used when printing expressions.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Min => "min",
            Self::Max => "max",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// `min` and `max` print as calls rather than infix operators.
    #[must_use]
    pub const fn is_infix(self) -> bool {
        !matches!(self, Self::Min | Self::Max)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators understood by the expression representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Neg => "-",
            Self::Not => "!",
        })
    }
}

// =============================================================================
// EXPRESSION SHAPE
// =============================================================================

/// One level of an expression's structure, with child expressions left as
/// opaque accessor handles.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprShape<E> {
    IntImm(i64),
    FloatImm(f64),
    Var { name: String, ty: Type },
    Cast { ty: Type, value: E },
    Unary { op: UnaryOp, value: E },
    Binary { op: BinaryOp, lhs: E, rhs: E },
    Select { cond: E, then: E, otherwise: E },
    Call { name: String, args: Vec<E> },
}

impl<E> ExprShape<E> {
    /// Direct child expressions, left to right.
    #[must_use]
    pub fn children(&self) -> Vec<&E> {
        match self {
            Self::IntImm(_) | Self::FloatImm(_) | Self::Var { .. } => Vec::new(),
            Self::Cast { value, .. } | Self::Unary { value, .. } => vec![value],
            Self::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Select {
                cond,
                then,
                otherwise,
            } => vec![cond, then, otherwise],
            Self::Call { args, .. } => args.iter().collect(),
        }
    }
}

// =============================================================================
// ENVIRONMENTACCESSOR TRAIT
// =============================================================================

/// Read-only view of a deserialized environment.
///
/// All handles are opaque to the engine. Sequences are exposed as
/// `List<T>` values and consumed only through `head`, `tail` and `is_empty`
/// (or the `ListIter` adapter built on them).
pub trait EnvironmentAccessor {
    /// The deserialized environment.
    type Env;
    /// One serialized definition.
    type Def: Clone;
    /// One serialized expression.
    type Expr: Clone;
    /// The target record of one call site.
    type Target: Clone;
    /// The iteration domain of a reduction.
    type Domain: Clone;
    /// A sequence of `T`.
    type List<T: Clone>: Clone;

    /// Deserialize an environment from its serialized form.
    fn deserialize_env(&self, blob: &str) -> Result<Self::Env, AccessError>;

    /// Enumerate the environment's definitions.
    fn definitions(&self, env: &Self::Env) -> Result<Self::List<Self::Def>, AccessError>;

    /// Project a definition's name.
    fn definition_name(&self, def: &Self::Def) -> Result<String, AccessError>;

    /// Project a definition's `(name, type)` argument pairs, in order.
    fn definition_args(&self, def: &Self::Def)
    -> Result<Self::List<(String, Type)>, AccessError>;

    /// Project a definition's declared return type.
    fn definition_return_type(&self, def: &Self::Def) -> Result<Type, AccessError>;

    /// Project a definition's body.
    ///
    /// Returns `Ok(None)` when the body is neither a pure nor a reduction form.
    #[allow(clippy::type_complexity)]
    fn definition_body(
        &self,
        def: &Self::Def,
    ) -> Result<Option<DefinitionBody<Self::Expr, Self::Domain>>, AccessError>;

    /// The resolved type of an expression.
    fn expression_type(&self, expr: &Self::Expr) -> Result<Type, AccessError>;

    /// The top-level structure of an expression.
    fn expression_shape(&self, expr: &Self::Expr) -> Result<ExprShape<Self::Expr>, AccessError>;

    /// Distinct free variables of an expression, in first-occurrence order.
    fn free_variables(&self, expr: &Self::Expr)
    -> Result<Self::List<(String, Type)>, AccessError>;

    /// Distinct call sites of an expression, in first-occurrence order.
    fn call_sites(
        &self,
        expr: &Self::Expr,
    ) -> Result<Self::List<(String, Self::Target)>, AccessError>;

    /// Classify what a call site refers to.
    fn classify_call_target(&self, target: &Self::Target) -> Result<CallTarget, AccessError>;

    /// The value type produced by a call site.
    fn call_target_type(&self, target: &Self::Target) -> Result<Type, AccessError>;

    /// First element of a list, or `None` if it is empty.
    fn head<T: Clone>(&self, list: &Self::List<T>) -> Option<T>;

    /// The list without its first element. The tail of an empty list is empty.
    fn tail<T: Clone>(&self, list: &Self::List<T>) -> Self::List<T>;

    /// Check if a list has no elements.
    fn is_empty<T: Clone>(&self, list: &Self::List<T>) -> bool;

    /// Walk a list with the list primitives.
    fn iter<T: Clone>(&self, list: Self::List<T>) -> ListIter<'_, Self, T> {
        ListIter {
            accessor: self,
            list,
        }
    }
}

/// Iterator over an accessor list, driven by `head` / `tail` / `is_empty`.
pub struct ListIter<'a, A: EnvironmentAccessor + ?Sized, T: Clone> {
    accessor: &'a A,
    list: A::List<T>,
}

impl<A: EnvironmentAccessor + ?Sized, T: Clone> Iterator for ListIter<'_, A, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.accessor.is_empty(&self.list) {
            return None;
        }
        let item = self.accessor.head(&self.list)?;
        self.list = self.accessor.tail(&self.list);
        Some(item)
    }
}

// =============================================================================
// TESTS
// =============================================================================
