//! Third static check: rejects any circular dependency among streams.
//! `pre(self, ...)` is a deliberate self-reference (the whole point of
//! temporal recursion) and is excluded from the graph before the search
//! runs; every other cycle is a genuine modeling error and is reported
//! with its full path through the recursion stack.
//!
//! Hand-rolled DFS rather than `petgraph`'s built-in cycle detector: the
//! latter only confirms a cycle exists, it doesn't hand back the path
//! that forms it, and the diagnostic needs that path to be useful.

use crate::ast::{extract_dependencies, Decl, Program};
use crate::diagnostics::{Diagnostic, Diagnostics};
use std::collections::{BTreeSet, HashMap};

pub fn check(program: &Program) -> Diagnostics {
    let mut adjacency: HashMap<String, BTreeSet<String>> = HashMap::new();
    for decl in &program.decls {
        if let Decl::Stream(s) = decl {
            let deps: BTreeSet<String> = extract_dependencies(&s.expr)
                .into_iter()
                .map(|d| d.split('.').next().unwrap().to_string())
                .filter(|d| d != &s.name)
                .collect();
            adjacency.entry(s.name.clone()).or_default().extend(deps);
        }
    }

    let mut diagnostics = Diagnostics::new();
    let mut visited = BTreeSet::new();
    let mut stack: Vec<String> = Vec::new();
    let mut on_stack = BTreeSet::new();

    let mut nodes: Vec<String> = adjacency.keys().cloned().collect();
    nodes.sort();
    for node in nodes {
        if !visited.contains(&node) {
            visit(&node, &adjacency, &mut visited, &mut stack, &mut on_stack, &mut diagnostics);
        }
    }
    diagnostics
}

fn visit(
    node: &str,
    adjacency: &HashMap<String, BTreeSet<String>>,
    visited: &mut BTreeSet<String>,
    stack: &mut Vec<String>,
    on_stack: &mut BTreeSet<String>,
    diagnostics: &mut Diagnostics,
) {
    visited.insert(node.to_string());
    stack.push(node.to_string());
    on_stack.insert(node.to_string());

    if let Some(deps) = adjacency.get(node) {
        for dep in deps {
            if on_stack.contains(dep) {
                let start = stack.iter().position(|n| n == dep).unwrap();
                let mut path: Vec<String> = stack[start..].to_vec();
                path.push(dep.clone());
                diagnostics.push(Diagnostic::CircularDependency { path });
            } else if !visited.contains(dep) {
                visit(dep, adjacency, visited, stack, on_stack, diagnostics);
            }
        }
    }

    stack.pop();
    on_stack.remove(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr};

    #[test]
    fn detects_two_node_cycle() {
        let program = Program::new()
            .stream("a", Expr::ident("b"))
            .stream("b", Expr::ident("a"));
        let diagnostics = check(&program);
        assert!(diagnostics.has_blocking());
    }

    #[test]
    fn self_referential_pre_is_not_a_cycle() {
        let program = Program::new().stream(
            "counter",
            Expr::Binary(BinOp::Add, Box::new(Expr::Pre("counter".to_string(), Box::new(Expr::Int(0)))), Box::new(Expr::Int(1))),
        );
        assert!(check(&program).is_empty());
    }

    #[test]
    fn acyclic_diamond_is_clean() {
        let program = Program::new()
            .stream("left", Expr::ident("root"))
            .stream("right", Expr::ident("root"))
            .stream("bottom", Expr::Binary(BinOp::Add, Box::new(Expr::ident("left")), Box::new(Expr::ident("right"))));
        assert!(check(&program).is_empty());
    }
}
