//! # rehydra-core
//!
//! The environment rehydration engine - THE ENGINE.
//!
//! An external front end serializes a set of function definitions into a
//! flat environment description. This crate reconstructs the live graph:
//! every definition becomes a shared `Func` node whose body references its
//! bound arguments, external uniforms, unresolved images and the other
//! `Func` nodes it calls.
//!
//! ## Pipeline
//!
//! ```text
//! Session ─► DefinitionTable::build (once)
//!         └► Rehydrator::rehydrate_definition(root)
//!              └► rehydrate_expression ─► rehydrate_definition(callee) ...
//! ```
//!
//! ## Architectural Constraints
//!
//! - The serialized form is read only through `EnvironmentAccessor`
//! - Each name is materialized at most once per session (memo cache)
//! - Nodes are immutable once published; recursion resolves to placeholders
//! - Any error aborts the whole `rehydrate` call; no partial graphs
//! - Single-threaded and synchronous; no I/O

// =============================================================================
// MODULES
// =============================================================================

pub mod accessor;
pub mod expr;
pub mod formats;
pub mod func;
pub mod memo;
pub mod primitives;
pub mod rehydrate;
pub mod session;
pub mod table;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AccessError, Arg, Definition, DefinitionBody, ParseTypeError, RehydrateError, Type, TypeCode,
};

// =============================================================================
// RE-EXPORTS: Accessor Layer
// =============================================================================

pub use accessor::{BinaryOp, CallTarget, EnvironmentAccessor, ExprShape, ListIter, UnaryOp};
pub use formats::{JsonAccessor, JsonList};

// =============================================================================
// RE-EXPORTS: Rehydrated Graph
// =============================================================================

pub use expr::{CallRef, Dependency, Expr, ExprNode, ImageRef};
pub use func::{Func, FuncGraph, FuncRef};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use memo::{Checkpoint, MemoCache};
pub use rehydrate::Rehydrator;
pub use session::{Session, SessionOptions, rehydrate};
pub use table::{DefinitionTable, DuplicatePolicy, parse_definition};
