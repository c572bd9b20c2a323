//! # Rehydrated Expressions
//!
//! An `Expr` is the reconstructed body of one function: its resolved type,
//! the operator tree, and the ordered list of dependencies the body relies on
//! (bound variables, uniforms, other functions, external images).

use crate::accessor::{BinaryOp, UnaryOp};
use crate::func::FuncRef;
use crate::types::Type;
use std::fmt;

// =============================================================================
// REFERENCES OUT OF AN EXPRESSION
// =============================================================================

/// Reference to an external image buffer.
///
/// Dimensionality is not resolved; the reference is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Image name.
    pub name: String,
    /// Element type produced by the call.
    pub ty: Type,
}

/// Target of a call node.
#[derive(Debug, Clone)]
pub enum CallRef {
    /// Another rehydrated function.
    Func(FuncRef),
    /// An external image (unresolved).
    Image(ImageRef),
}

impl CallRef {
    /// Name of the call target.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Func(func) => func.name(),
            Self::Image(image) => &image.name,
        }
    }

    /// The dependency this call contributes to its expression.
    #[must_use]
    pub fn to_dependency(&self) -> Dependency {
        match self {
            Self::Func(func) => Dependency::Func(func.clone()),
            Self::Image(image) => Dependency::Image(image.clone()),
        }
    }
}

/// One classified dependency of an expression.
#[derive(Debug, Clone)]
pub enum Dependency {
    /// A formal argument of the enclosing function.
    Var(String),
    /// An externally supplied scalar not bound by any argument list.
    Uniform { name: String, ty: Type },
    /// Another function node.
    Func(FuncRef),
    /// An external image, dimensionality unresolved.
    Image(ImageRef),
}

impl Dependency {
    /// Name of the variable, uniform, function or image.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Var(name) | Self::Uniform { name, .. } => name,
            Self::Func(func) => func.name(),
            Self::Image(image) => &image.name,
        }
    }

    /// Short label of the dependency kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Var(_) => "var",
            Self::Uniform { .. } => "uniform",
            Self::Func(_) => "func",
            Self::Image(_) => "image",
        }
    }
}

// =============================================================================
// EXPRESSION TREE
// =============================================================================

/// Operator tree of a rehydrated expression.
#[derive(Debug, Clone)]
pub enum ExprNode {
    IntImm(i64),
    FloatImm(f64),
    /// Bound variable.
    Var(String),
    /// External scalar parameter.
    Uniform {
        name: String,
        ty: Type,
    },
    Cast {
        ty: Type,
        value: Box<ExprNode>,
    },
    Unary {
        op: UnaryOp,
        value: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    Select {
        cond: Box<ExprNode>,
        then: Box<ExprNode>,
        otherwise: Box<ExprNode>,
    },
    Call {
        target: CallRef,
        args: Vec<ExprNode>,
    },
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntImm(v) => write!(f, "{}", v),
            Self::FloatImm(v) => write!(f, "{:?}", v),
            Self::Var(name) | Self::Uniform { name, .. } => f.write_str(name),
            Self::Cast { ty, value } => write!(f, "{}({})", ty, value),
            Self::Unary { op, value } => write!(f, "{}{}", op, value),
            Self::Binary { op, lhs, rhs } if op.is_infix() => {
                write!(f, "({} {} {})", lhs, op, rhs)
            }
            Self::Binary { op, lhs, rhs } => write!(f, "{}({}, {})", op, lhs, rhs),
            Self::Select {
                cond,
                then,
                otherwise,
            } => write!(f, "select({}, {}, {})", cond, then, otherwise),
            Self::Call { target, args } => {
                write!(f, "{}(", target.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

// =============================================================================
// EXPR
// =============================================================================

/// A rehydrated expression: type, operator tree and dependencies.
#[derive(Debug, Clone)]
pub struct Expr {
    ty: Type,
    root: ExprNode,
    deps: Vec<Dependency>,
}

impl Expr {
    /// Assemble an expression from its parts.
    #[must_use]
    pub fn new(ty: Type, root: ExprNode, deps: Vec<Dependency>) -> Self {
        Self { ty, root, deps }
    }

    /// Resolved type.
    #[must_use]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Root of the operator tree.
    #[must_use]
    pub fn root(&self) -> &ExprNode {
        &self.root
    }

    /// Classified dependencies: variables first, then call targets.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.deps
    }

    /// Names of the bound variables this expression uses.
    pub fn bound_vars(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().filter_map(|dep| match dep {
            Dependency::Var(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Uniforms this expression uses, with their types.
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, Type)> {
        self.deps.iter().filter_map(|dep| match dep {
            Dependency::Uniform { name, ty } => Some((name.as_str(), *ty)),
            _ => None,
        })
    }

    /// Unresolved image references.
    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.deps.iter().filter_map(|dep| match dep {
            Dependency::Image(image) => Some(image),
            _ => None,
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

// =============================================================================
// TESTS
// =============================================================================
