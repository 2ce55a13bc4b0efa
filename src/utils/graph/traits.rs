//! Read-only views over graph structures.
//!
//! The algorithms in [`algorithms`](crate::utils::graph::algorithms) are written against
//! these traits rather than a concrete graph, so the per-function CFG, the call graph and
//! the ICFG can all reuse the same traversal and SCC code.

use crate::utils::graph::NodeId;

/// Node enumeration shared by every graph view.
pub trait GraphBase {
    /// Number of nodes; valid ids are `0..node_count()`.
    fn node_count(&self) -> usize;

    /// All node ids in index order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency.
pub trait Successors: GraphBase {
    /// Targets of the outgoing edges of `node`, one entry per edge.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward adjacency.
pub trait Predecessors: GraphBase {
    /// Sources of the incoming edges of `node`, one entry per edge.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a distinguished start node.
pub trait RootedGraph: Successors + Predecessors {
    /// The start node.
    fn entry(&self) -> NodeId;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ring {
        size: usize,
    }

    impl GraphBase for Ring {
        fn node_count(&self) -> usize {
            self.size
        }

        fn node_ids(&self) -> impl Iterator<Item = NodeId> {
            (0..self.size).map(NodeId::new)
        }
    }

    impl Successors for Ring {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            std::iter::once(NodeId::new((node.index() + 1) % self.size))
        }
    }

    impl Predecessors for Ring {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            std::iter::once(NodeId::new((node.index() + self.size - 1) % self.size))
        }
    }

    impl RootedGraph for Ring {
        fn entry(&self) -> NodeId {
            NodeId::new(0)
        }
    }

    #[test]
    fn test_ring_views() {
        let ring = Ring { size: 3 };
        assert_eq!(ring.node_ids().count(), 3);
        assert_eq!(ring.successors(NodeId::new(2)).collect::<Vec<_>>(), vec![NodeId::new(0)]);
        assert_eq!(ring.predecessors(NodeId::new(0)).collect::<Vec<_>>(), vec![NodeId::new(2)]);
        assert_eq!(ring.entry(), NodeId::new(0));
    }
}
