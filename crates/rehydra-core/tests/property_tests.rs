//! Property-based tests for rehydration invariants.
//!
//! Uses proptest to generate random environments and verify that memoized
//! identity and argument binding hold for all of them.

use proptest::prelude::*;
use rehydra_core::{Dependency, FuncRef, JsonAccessor, Session, rehydrate};
use serde_json::{Value, json};
use std::collections::BTreeSet;

const MAX_DEFS: usize = 8;

fn var(name: &str) -> Value {
    json!({ "op": "var", "name": name })
}

fn sum(mut terms: Vec<Value>) -> Value {
    let first = terms.remove(0);
    terms.into_iter().fold(first, |acc, term| {
        json!({ "op": "add", "lhs": acc, "rhs": term })
    })
}

fn def(name: &str, args: &[String], body: Value) -> Value {
    let args: Vec<Value> = args
        .iter()
        .map(|a| json!({ "name": a, "type": "i32" }))
        .collect();
    json!({ "name": name, "args": args, "return_type": "i32", "body": { "pure": body } })
}

/// An acyclic environment: `fN` may only call `fM` with `M > N`.
fn dag_env(count: usize, edges: &[bool]) -> String {
    let x = vec!["x".to_string()];
    let defs: Vec<Value> = (0..count)
        .map(|i| {
            let mut terms: Vec<Value> = ((i + 1)..count)
                .filter(|j| edges[i * MAX_DEFS + j])
                .map(|j| {
                    json!({ "op": "call", "name": format!("f{}", j), "kind": "func",
                            "type": "i32", "args": [ var("x") ] })
                })
                .collect();
            if terms.is_empty() {
                terms.push(var("x"));
            }
            def(&format!("f{}", i), &x, sum(terms))
        })
        .collect();
    json!({ "definitions": defs }).to_string()
}

proptest! {
    /// Property: within a session every name maps to exactly one node, and
    /// every reference to a name points at that node.
    #[test]
    fn prop_memoized_identity(
        count in 1usize..=MAX_DEFS,
        edges in prop::collection::vec(any::<bool>(), MAX_DEFS * MAX_DEFS),
        roots in prop::collection::vec(0usize..MAX_DEFS, 1..12),
    ) {
        let acc = JsonAccessor::new();
        let blob = dag_env(count, &edges);
        let mut session = Session::new(&acc, &blob).expect("session");

        for root in roots.iter().map(|r| format!("f{}", r % count)) {
            let first = session.rehydrate(&root).expect("rehydrate");
            let again = session.rehydrate(&root).expect("rehydrate again");
            prop_assert!(first.same_as(&again));
        }

        let funcs: Vec<_> = session.funcs().cloned().collect();
        for func in &funcs {
            prop_assert!(func.is_complete());
            for callee in func.callees() {
                if callee.is_recursive() {
                    return Err(TestCaseError::fail("back-edge in an acyclic graph"));
                }
                let target = callee.resolve().expect("callee alive");
                let cached = funcs
                    .iter()
                    .find(|f| f.name() == target.name())
                    .expect("callee is cached");
                prop_assert!(cached.same_as(&target));
            }
        }
    }

    /// Property: a free variable is bound iff it names a declared argument,
    /// and every free variable is classified exactly once.
    #[test]
    fn prop_argument_binding(
        args in prop::collection::btree_set("[a-e]", 0..4),
        vars in prop::collection::vec("[a-h]", 1..6),
    ) {
        let acc = JsonAccessor::new();
        let args: Vec<String> = args.into_iter().collect();
        let body = sum(vars.iter().map(|v| var(v)).collect());
        let blob = json!({ "definitions": [ def("f", &args, body) ] }).to_string();

        let f = rehydrate(&acc, &blob, "f").expect("rehydrate f");
        let body = f.body().expect("complete");

        let mut classified = BTreeSet::new();
        for dep in body.dependencies() {
            match dep {
                Dependency::Var(name) => prop_assert!(args.contains(name)),
                Dependency::Uniform { name, .. } => prop_assert!(!args.contains(name)),
                other => return Err(TestCaseError::fail(format!("unexpected {:?}", other))),
            }
            prop_assert!(classified.insert(dep.name().to_string()));
        }

        let expected: BTreeSet<String> = vars.into_iter().collect();
        prop_assert_eq!(classified, expected);
    }
}
