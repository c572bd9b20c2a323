//! # Function Nodes
//!
//! The rehydrated, shareable representation of one definition.
//!
//! Every node belongs to a `FuncGraph`, an append-only arena owned jointly by
//! the session's memo cache and by every `Func` handle. Holding any `Func`
//! keeps the whole graph alive, so every node reachable from it stays
//! resolvable, including targets of back-edges.
//!
//! References stored inside bodies (`FuncRef`) never own the graph: a
//! reference to a completed node holds the node itself, a reference to a
//! node still under construction (a self- or mutually-recursive call) is a
//! back-edge. Neither holds the arena strongly, so no `Rc` cycle forms.
//!
//! Construction is two-phase: a node is created with its signature, published
//! to the memo cache, and its body is set exactly once afterwards.

use crate::expr::{Dependency, Expr};
use crate::types::{Arg, Type};
use std::cell::{OnceCell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

// =============================================================================
// GRAPH
// =============================================================================

/// Storage behind a `Func` handle.
struct FuncNode {
    name: String,
    args: Vec<Arg>,
    return_type: Type,
    body: OnceCell<Expr>,
}

/// Arena owning every node materialized in one session.
#[derive(Default)]
pub struct FuncGraph {
    nodes: RefCell<Vec<Rc<FuncNode>>>,
}

impl FuncGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of nodes owned by the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Check if the graph owns no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Drop every node added after the first `len`.
    pub(crate) fn truncate(&self, len: usize) {
        let removed: Vec<Rc<FuncNode>> = {
            let mut nodes = self.nodes.borrow_mut();
            if len >= nodes.len() {
                return;
            }
            nodes.drain(len..).collect()
        };
        drop(removed);
    }
}

impl fmt::Debug for FuncGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncGraph")
            .field("nodes", &self.len())
            .finish()
    }
}

// =============================================================================
// FUNC
// =============================================================================

/// Shared handle to a rehydrated function.
#[derive(Clone)]
pub struct Func {
    graph: Rc<FuncGraph>,
    node: Rc<FuncNode>,
}

impl Func {
    /// Add a node whose body is not set yet to `graph`.
    pub(crate) fn placeholder(
        graph: &Rc<FuncGraph>,
        name: impl Into<String>,
        args: Vec<Arg>,
        return_type: Type,
    ) -> Self {
        let node = Rc::new(FuncNode {
            name: name.into(),
            args,
            return_type,
            body: OnceCell::new(),
        });
        graph.nodes.borrow_mut().push(Rc::clone(&node));
        Self {
            graph: Rc::clone(graph),
            node,
        }
    }

    /// Set the body. Only the first call has an effect.
    pub(crate) fn complete(&self, body: Expr) {
        if self.node.body.set(body).is_err() {
            tracing::warn!(func = %self.name(), "body already set; keeping the first one");
        }
    }

    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Formal arguments in declared order.
    #[must_use]
    pub fn args(&self) -> &[Arg] {
        &self.node.args
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> Type {
        self.node.return_type
    }

    /// The rehydrated body, or `None` while the node is under construction.
    ///
    /// Every node returned by a successful `Session::rehydrate` is complete.
    #[must_use]
    pub fn body(&self) -> Option<&Expr> {
        self.node.body.get()
    }

    /// Check if the body has been set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.node.body.get().is_some()
    }

    /// Identity comparison: both handles point at the same node.
    #[must_use]
    pub fn same_as(&self, other: &Func) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// The graph this node belongs to.
    #[must_use]
    pub fn graph(&self) -> &Rc<FuncGraph> {
        &self.graph
    }

    /// Functions this body calls, in dependency order.
    pub fn callees(&self) -> impl Iterator<Item = &FuncRef> {
        self.body()
            .into_iter()
            .flat_map(|body| body.dependencies())
            .filter_map(|dep| match dep {
                Dependency::Func(callee) => Some(callee),
                _ => None,
            })
    }

    /// This node and every node reachable from it, depth-first pre-order.
    ///
    /// Each node appears once.
    #[must_use]
    pub fn reachable(&self) -> Vec<Func> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.clone()];

        while let Some(func) = stack.pop() {
            if !seen.insert(func.name().to_string()) {
                continue;
            }
            let callees: Vec<Func> = func.callees().filter_map(FuncRef::resolve).collect();
            order.push(func);
            stack.extend(callees.into_iter().rev());
        }

        order
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bodies are omitted: they may refer back to this node.
        f.debug_struct("Func")
            .field("name", &self.node.name)
            .field("args", &self.node.args)
            .field("return_type", &self.node.return_type)
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        for (i, arg) in self.args().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&arg.name)?;
        }
        f.write_str(") = ")?;
        match self.body() {
            Some(body) => write!(f, "{}", body),
            None => f.write_str("<pending>"),
        }
    }
}

// =============================================================================
// REFERENCES
// =============================================================================

#[derive(Clone)]
enum Edge {
    Direct(Rc<FuncNode>),
    Recursive(Weak<FuncNode>),
}

/// A reference from an expression to another function node.
///
/// Resolves as long as any `Func` of the same graph is alive, which always
/// holds while the referencing node is reachable from a live handle.
#[derive(Clone)]
pub struct FuncRef {
    name: String,
    graph: Weak<FuncGraph>,
    edge: Edge,
}

impl FuncRef {
    /// Reference `func`, as a back-edge if it is not complete yet.
    #[must_use]
    pub fn link(func: &Func) -> Self {
        let edge = if func.is_complete() {
            Edge::Direct(Rc::clone(&func.node))
        } else {
            Edge::Recursive(Rc::downgrade(&func.node))
        };
        Self {
            name: func.name().to_string(),
            graph: Rc::downgrade(&func.graph),
            edge,
        }
    }

    /// Name of the referenced function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strong handle to the referenced node.
    ///
    /// `None` only once every handle into its graph has been dropped.
    #[must_use]
    pub fn resolve(&self) -> Option<Func> {
        let graph = self.graph.upgrade()?;
        let node = match &self.edge {
            Edge::Direct(node) => Rc::clone(node),
            Edge::Recursive(node) => node.upgrade()?,
        };
        Some(Func { graph, node })
    }

    /// Check if this is a back-edge to a node that was under construction.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        matches!(self.edge, Edge::Recursive(_))
    }
}

impl fmt::Debug for FuncRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncRef")
            .field("name", &self.name)
            .field("recursive", &self.is_recursive())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::BinaryOp;
    use crate::expr::{CallRef, ExprNode};

    fn leaf(graph: &Rc<FuncGraph>, name: &str) -> Func {
        let func = Func::placeholder(
            graph,
            name,
            vec![Arg::new("x", Type::int(32))],
            Type::int(32),
        );
        func.complete(Expr::new(
            Type::int(32),
            ExprNode::Var("x".to_string()),
            vec![Dependency::Var("x".to_string())],
        ));
        func
    }

    fn call(callee: &Func) -> ExprNode {
        ExprNode::Call {
            target: CallRef::Func(FuncRef::link(callee)),
            args: vec![ExprNode::IntImm(0)],
        }
    }

    #[test]
    fn placeholder_is_incomplete_until_body_set() {
        let graph = FuncGraph::new();
        let func = Func::placeholder(&graph, "f", vec![], Type::float(32));
        assert!(!func.is_complete());
        assert!(func.body().is_none());
        assert_eq!(func.to_string(), "f() = <pending>");
        assert_eq!(graph.len(), 1);

        func.complete(Expr::new(Type::float(32), ExprNode::FloatImm(1.5), vec![]));
        assert!(func.is_complete());
        assert_eq!(func.to_string(), "f() = 1.5");
    }

    #[test]
    fn second_body_is_ignored() {
        let graph = FuncGraph::new();
        let func = Func::placeholder(&graph, "f", vec![], Type::int(32));
        func.complete(Expr::new(Type::int(32), ExprNode::IntImm(1), vec![]));
        func.complete(Expr::new(Type::int(32), ExprNode::IntImm(2), vec![]));
        assert_eq!(func.to_string(), "f() = 1");
    }

    #[test]
    fn same_as_is_identity_not_equality() {
        let graph = FuncGraph::new();
        let a = leaf(&graph, "g");
        let b = leaf(&graph, "g");
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn link_picks_back_edge_for_pending_node() {
        let graph = FuncGraph::new();
        let pending = Func::placeholder(&graph, "f", vec![], Type::int(32));
        let link = FuncRef::link(&pending);
        assert!(link.is_recursive());
        assert_eq!(link.name(), "f");
        assert!(link.resolve().expect("alive").same_as(&pending));

        let done = FuncRef::link(&leaf(&graph, "g"));
        assert!(!done.is_recursive());
    }

    #[test]
    fn back_edge_resolves_through_any_handle() {
        let graph = FuncGraph::new();
        let even = Func::placeholder(&graph, "even", vec![], Type::int(32));
        let odd = Func::placeholder(&graph, "odd", vec![], Type::int(32));
        odd.complete(Expr::new(
            Type::int(32),
            call(&even),
            vec![Dependency::Func(FuncRef::link(&even))],
        ));
        even.complete(Expr::new(
            Type::int(32),
            call(&odd),
            vec![Dependency::Func(FuncRef::link(&odd))],
        ));
        drop(even);
        drop(graph);

        let back = odd.callees().next().expect("even");
        assert!(back.is_recursive());
        let even = back.resolve().expect("kept alive by odd");
        assert_eq!(even.to_string(), "even() = odd(0)");
        assert!(even.callees().next().and_then(FuncRef::resolve).expect("odd").same_as(&odd));
    }

    #[test]
    fn reference_outliving_its_graph_does_not_resolve() {
        let link = {
            let graph = FuncGraph::new();
            FuncRef::link(&Func::placeholder(&graph, "gone", vec![], Type::int(32)))
        };
        assert_eq!(link.name(), "gone");
        assert!(link.resolve().is_none());
    }

    #[test]
    fn truncate_drops_later_nodes() {
        let graph = FuncGraph::new();
        leaf(&graph, "a");
        let b = leaf(&graph, "b");
        let link = FuncRef::link(&b);
        drop(b);

        graph.truncate(1);
        assert_eq!(graph.len(), 1);
        assert!(link.resolve().is_some(), "direct edges own their node");

        graph.truncate(5);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn reachable_visits_each_node_once() {
        let graph = FuncGraph::new();
        let g = leaf(&graph, "g");
        let f = Func::placeholder(&graph, "f", vec![], Type::int(32));
        f.complete(Expr::new(
            Type::int(32),
            ExprNode::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(call(&g)),
                rhs: Box::new(call(&g)),
            },
            vec![Dependency::Func(FuncRef::link(&g))],
        ));

        let names: Vec<_> = f.reachable().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["f", "g"]);
        assert_eq!(f.to_string(), "f() = (g(0) + g(0))");
    }
}
