//! Adjacency-list directed multigraph.
//!
//! [`DirectedGraph`] is the storage underneath every graph in the crate: the
//! per-function [`ControlFlowGraph`](crate::analysis::ControlFlowGraph), the function-level
//! view of the [`CallGraph`](crate::analysis::CallGraph) and the
//! [`Icfg`](crate::analysis::Icfg). Nodes and edges carry typed payloads and are addressed by
//! dense [`NodeId`]/[`EdgeId`] handles. Nodes and edges are never removed, so handles stay
//! valid for the lifetime of the graph.

use crate::{
    utils::graph::{
        edge::EdgeId,
        node::NodeId,
        traits::{GraphBase, Predecessors, Successors},
    },
    Error, Result,
};

#[derive(Debug, Clone)]
struct EdgeData<E> {
    source: NodeId,
    target: NodeId,
    data: E,
}

/// A directed multigraph with node payloads `N` and edge payloads `E`.
///
/// Both adjacency directions are kept, so successor and predecessor queries are
/// proportional to the node's degree. Parallel edges and self loops are allowed.
///
/// The graph is built single-threaded and then shared immutably; it is `Send + Sync`
/// whenever `N` and `E` are.
///
/// # Examples
///
/// ```rust
/// use midend::utils::graph::DirectedGraph;
///
/// let mut graph: DirectedGraph<&str, u32> = DirectedGraph::new();
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(a, b, 1)?;
///
/// assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b]);
/// assert_eq!(graph.predecessors(b).collect::<Vec<_>>(), vec![a]);
/// # Ok::<(), midend::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    nodes: Vec<N>,
    edges: Vec<EdgeData<E>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Creates an empty graph with room for the given number of nodes and edges.
    #[must_use]
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        DirectedGraph {
            nodes: Vec::with_capacity(node_capacity),
            edges: Vec::with_capacity(edge_capacity),
            outgoing: Vec::with_capacity(node_capacity),
            incoming: Vec::with_capacity(node_capacity),
        }
    }

    /// Adds a node and returns its id. Ids are assigned sequentially from 0.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Adds an edge `source -> target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is not a node of this graph.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<EdgeId> {
        if !self.contains_node(source) {
            return Err(Error::GraphError(format!(
                "edge source {source} is not part of the graph ({} nodes)",
                self.nodes.len()
            )));
        }
        if !self.contains_node(target) {
            return Err(Error::GraphError(format!(
                "edge target {target} is not part of the graph ({} nodes)",
                self.nodes.len()
            )));
        }

        let id = EdgeId::new(self.edges.len());
        self.edges.push(EdgeData {
            source,
            target,
            data,
        });
        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);
        Ok(id)
    }

    /// Returns `true` if `node` was produced by this graph.
    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    /// The payload of `node`.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Iterates `(id, payload)` for every node in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, data)| (NodeId::new(index), data))
    }

    /// The payload of `edge`.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&E> {
        self.edges.get(edge.index()).map(|e| &e.data)
    }

    /// The `(source, target)` pair of `edge`.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edges.get(edge.index()).map(|e| (e.source, e.target))
    }

    /// Iterates `(id, source, target, payload)` for every edge in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, NodeId, NodeId, &E)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(index, e)| (EdgeId::new(index), e.source, e.target, &e.data))
    }

    /// Iterates `(id, target, payload)` for the outgoing edges of `node`.
    ///
    /// Unknown nodes yield nothing.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&id| {
                let e = &self.edges[id.index()];
                (id, e.target, &e.data)
            })
    }

    /// Iterates `(id, source, payload)` for the incoming edges of `node`.
    ///
    /// Unknown nodes yield nothing.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&id| {
                let e = &self.edges[id.index()];
                (id, e.source, &e.data)
            })
    }

    /// Targets of the outgoing edges of `node`, one per edge.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing_edges(node).map(|(_, target, _)| target)
    }

    /// Sources of the incoming edges of `node`, one per edge.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming_edges(node).map(|(_, source, _)| source)
    }

    /// Number of outgoing edges of `node`.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing.get(node.index()).map_or(0, Vec::len)
    }

    /// Number of incoming edges of `node`.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming.get(node.index()).map_or(0, Vec::len)
    }

    /// Nodes without incoming edges.
    pub fn entry_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId::new)
            .filter(|&n| self.in_degree(n) == 0)
    }

    /// Nodes without outgoing edges.
    pub fn exit_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId::new)
            .filter(|&n| self.out_degree(n) == 0)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<N, E> GraphBase for DirectedGraph<N, E> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N, E> Successors for DirectedGraph<N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::successors(self, node)
    }
}

impl<N, E> Predecessors for DirectedGraph<N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::predecessors(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> (DirectedGraph<&'static str, char>, [NodeId; 4]) {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        let d = graph.add_node("d");
        graph.add_edge(a, b, 'x').unwrap();
        graph.add_edge(a, c, 'y').unwrap();
        graph.add_edge(b, d, 'z').unwrap();
        graph.add_edge(c, d, 'w').unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_counts_and_payloads() {
        let (graph, [a, _, _, d]) = diamond();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.node(a), Some(&"a"));
        assert_eq!(graph.node(NodeId::new(99)), None);
        assert_eq!(graph.in_degree(d), 2);
        assert_eq!(graph.out_degree(d), 0);
    }

    #[test]
    fn test_adjacency_both_directions() {
        let (graph, [a, b, c, d]) = diamond();
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.predecessors(d).collect::<Vec<_>>(), vec![b, c]);

        let labels: Vec<char> = graph.incoming_edges(d).map(|(_, _, e)| *e).collect();
        assert_eq!(labels, vec!['z', 'w']);
    }

    #[test]
    fn test_entry_and_exit_nodes() {
        let (graph, [a, _, _, d]) = diamond();
        assert_eq!(graph.entry_nodes().collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.exit_nodes().collect::<Vec<_>>(), vec![d]);
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let mut graph: DirectedGraph<(), u8> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let first = graph.add_edge(a, b, 1).unwrap();
        let second = graph.add_edge(a, b, 2).unwrap();
        assert_ne!(first, second);
        assert_eq!(graph.out_degree(a), 2);
        assert_eq!(graph.edge_endpoints(second), Some((a, b)));
    }

    #[test]
    fn test_add_edge_rejects_unknown_node() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let result = graph.add_edge(a, NodeId::new(5), ());
        assert!(matches!(result, Err(Error::GraphError(_))));
        assert_eq!(graph.edge_count(), 0);
    }
}
