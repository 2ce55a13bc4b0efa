//! Tarjan's strongly connected components.
//!
//! In the call graph an SCC with more than one function, or a single function with
//! a self edge, is a recursion cycle.

use crate::utils::graph::{NodeId, Successors};

const UNVISITED: usize = usize::MAX;

/// Computes the strongly connected components of `graph`.
///
/// Components are emitted in reverse topological order of the condensation: a
/// component is emitted only after every component it can reach. For a call graph
/// that means callees come before their callers.
///
/// The search keeps its own frame stack, so long call chains do not overflow the
/// thread stack.
pub fn strongly_connected_components<G: Successors>(graph: &G) -> Vec<Vec<NodeId>> {
    let node_count = graph.node_count();
    let mut state = Tarjan {
        index: vec![UNVISITED; node_count],
        lowlink: vec![0; node_count],
        on_stack: vec![false; node_count],
        stack: Vec::new(),
        next_index: 0,
        sccs: Vec::new(),
    };

    for i in 0..node_count {
        if state.index[i] == UNVISITED {
            state.connect(graph, NodeId::new(i));
        }
    }

    state.sccs
}

struct Tarjan {
    index: Vec<usize>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    next_index: usize,
    sccs: Vec<Vec<NodeId>>,
}

impl Tarjan {
    /// Iterative depth-first search from `root`, with one frame per open node.
    fn connect<G: Successors>(&mut self, graph: &G, root: NodeId) {
        let mut frames = vec![self.visit(graph, root)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.node;
            if let Some(&w) = frame.successors.get(frame.next) {
                frame.next += 1;
                let wi = w.index();
                if self.index[wi] == UNVISITED {
                    let child = self.visit(graph, w);
                    frames.push(child);
                } else if self.on_stack[wi] {
                    self.lowlink[v.index()] = self.lowlink[v.index()].min(self.index[wi]);
                }
                continue;
            }

            frames.pop();
            if let Some(parent) = frames.last() {
                let pi = parent.node.index();
                self.lowlink[pi] = self.lowlink[pi].min(self.lowlink[v.index()]);
            }
            if self.lowlink[v.index()] == self.index[v.index()] {
                self.emit(v);
            }
        }
    }

    fn visit<G: Successors>(&mut self, graph: &G, v: NodeId) -> Frame {
        let vi = v.index();
        self.index[vi] = self.next_index;
        self.lowlink[vi] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[vi] = true;
        Frame {
            node: v,
            successors: graph.successors(v).collect(),
            next: 0,
        }
    }

    /// Pops the component rooted at `v` off the stack.
    fn emit(&mut self, v: NodeId) {
        let mut scc = Vec::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack[w.index()] = false;
            scc.push(w);
            if w == v {
                break;
            }
        }
        self.sccs.push(scc);
    }
}

struct Frame {
    node: NodeId,
    successors: Vec<NodeId>,
    next: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::DirectedGraph;

    #[test]
    fn test_acyclic_graph_has_singleton_components() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b, ()).unwrap();

        let sccs = strongly_connected_components(&graph);
        assert_eq!(sccs, vec![vec![b], vec![a]]);
    }

    #[test]
    fn test_cycle_is_one_component() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        let d = graph.add_node(());
        graph.add_edge(a, b, ()).unwrap();
        graph.add_edge(b, c, ()).unwrap();
        graph.add_edge(c, a, ()).unwrap();
        graph.add_edge(c, d, ()).unwrap();

        let sccs = strongly_connected_components(&graph);
        assert_eq!(sccs.len(), 2);
        assert_eq!(sccs[0], vec![d]);
        let mut cycle = sccs[1].clone();
        cycle.sort();
        assert_eq!(cycle, vec![a, b, c]);
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let nodes: Vec<NodeId> = (0..50_000).map(|_| graph.add_node(())).collect();
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1], ()).unwrap();
        }
        graph.add_edge(nodes[49_999], nodes[49_998], ()).unwrap();

        let sccs = strongly_connected_components(&graph);
        assert_eq!(sccs.len(), 49_999);
        let mut tail = sccs[0].clone();
        tail.sort();
        assert_eq!(tail, vec![nodes[49_998], nodes[49_999]]);
        assert_eq!(sccs[49_998], vec![nodes[0]]);
    }

    #[test]
    fn test_empty_graph() {
        let graph: DirectedGraph<(), ()> = DirectedGraph::new();
        assert!(strongly_connected_components(&graph).is_empty());
    }
}
