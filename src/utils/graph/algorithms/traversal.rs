//! Depth-first traversals.

use crate::utils::graph::{NodeId, Successors};

/// Nodes reachable from `start` in depth-first pre-order.
///
/// Returns an empty vector if `start` is not a node of `graph`.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut order = Vec::new();
    let mut stack = vec![start];
    visited[start.index()] = true;

    while let Some(node) = stack.pop() {
        order.push(node);
        let successors: Vec<NodeId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited[succ.index()] {
                visited[succ.index()] = true;
                stack.push(succ);
            }
        }
    }

    order
}

/// Nodes reachable from `start` in depth-first post-order.
///
/// Every node appears after all of its DFS-tree descendants. Iterative, so deep
/// straight-line functions do not overflow the stack.
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);
    // (node, children already pushed)
    let mut stack = vec![(start, false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if visited[node.index()] {
            continue;
        }
        visited[node.index()] = true;
        stack.push((node, true));

        let successors: Vec<NodeId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited[succ.index()] {
                stack.push((succ, false));
            }
        }
    }

    order
}

/// Reverse post-order from `start`: predecessors before successors, ignoring back edges.
///
/// This is the seeding order of forward worklists.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}
