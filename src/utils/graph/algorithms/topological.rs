//! Kahn's topological sort.

use std::collections::VecDeque;

use crate::utils::graph::{NodeId, Predecessors, Successors};

/// Orders the nodes so that every edge `u -> v` has `u` before `v`.
///
/// Returns `None` if the graph contains a cycle.
pub fn topological_sort<G>(graph: &G) -> Option<Vec<NodeId>>
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let mut in_degree: Vec<usize> = graph
        .node_ids()
        .map(|node| graph.predecessors(node).count())
        .collect();

    let mut queue: VecDeque<NodeId> = graph
        .node_ids()
        .filter(|node| in_degree[node.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(node_count);

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for succ in graph.successors(node) {
            in_degree[succ.index()] -= 1;
            if in_degree[succ.index()] == 0 {
                queue.push_back(succ);
            }
        }
    }

    (order.len() == node_count).then_some(order)
}
