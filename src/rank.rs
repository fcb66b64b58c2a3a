//! Rank assignment: `rank(n) = 1 + max(rank(dep) for dep in deps(n))`, or
//! `0` if `n` has no dependencies. Ranks are what make propagation
//! glitch-free — a node is only recomputed once all its dependencies at
//! a strictly lower rank have already settled for the tick.
//!
//! Built on `petgraph::algo::toposort` over the dependency graph, which
//! by this point has already passed the cycle check in `crate::analysis`
//! — a `toposort` failure here means that check missed something, so it
//! is treated as an internal-bug assertion rather than a reportable
//! diagnostic.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Computes ranks for a graph given as `name -> direct dependencies`.
/// Self-referential edges (`pre(self, ...)`) must already be stripped by
/// the caller, same as for `crate::analysis::cycle`.
pub fn assign_ranks(adjacency: &HashMap<String, Vec<String>>) -> HashMap<String, u32> {
    let mut graph = DiGraph::<String, ()>::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();

    let mut ensure_node = |graph: &mut DiGraph<String, ()>, indices: &mut HashMap<String, NodeIndex>, name: &str| -> NodeIndex {
        if let Some(idx) = indices.get(name) {
            *idx
        } else {
            let idx = graph.add_node(name.to_string());
            indices.insert(name.to_string(), idx);
            idx
        }
    };

    for (name, deps) in adjacency {
        let node_idx = ensure_node(&mut graph, &mut indices, name);
        for dep in deps {
            let dep_idx = ensure_node(&mut graph, &mut indices, dep);
            // Edge points dependency -> dependent so a topological order
            // visits every dependency before the nodes that rely on it.
            graph.add_edge(dep_idx, node_idx, ());
        }
    }

    let order = toposort(&graph, None).expect("cycle check should have already rejected this graph");

    let mut ranks: HashMap<String, u32> = HashMap::new();
    for idx in order {
        let name = graph[idx].clone();
        let deps = adjacency.get(&name).map(Vec::as_slice).unwrap_or(&[]);
        let rank = deps.iter().map(|d| ranks.get(d).copied().unwrap_or(0) + 1).max().unwrap_or(0);
        ranks.insert(name, rank);
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diamond_ranks_increase_with_depth() {
        let mut adjacency = HashMap::new();
        adjacency.insert("root".to_string(), vec![]);
        adjacency.insert("left".to_string(), vec!["root".to_string()]);
        adjacency.insert("right".to_string(), vec!["root".to_string()]);
        adjacency.insert("bottom".to_string(), vec!["left".to_string(), "right".to_string()]);
        let ranks = assign_ranks(&adjacency);
        assert_eq!(ranks["root"], 0);
        assert_eq!(ranks["left"], 1);
        assert_eq!(ranks["right"], 1);
        assert_eq!(ranks["bottom"], 2);
    }

    #[test]
    fn node_with_no_dependencies_is_rank_zero() {
        let mut adjacency = HashMap::new();
        adjacency.insert("a".to_string(), vec![]);
        let ranks = assign_ranks(&adjacency);
        assert_eq!(ranks["a"], 0);
    }
}
