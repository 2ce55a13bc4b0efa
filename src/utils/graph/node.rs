//! Node handles for [`DirectedGraph`](crate::utils::graph::DirectedGraph).

use std::fmt;

/// Dense, strongly-typed index of a node inside one graph.
///
/// Node ids are handed out sequentially by
/// [`DirectedGraph::add_node`](crate::utils::graph::DirectedGraph::add_node), so they double as
/// indices into per-node side tables (fact vectors, visited sets, ...). An id is only
/// meaningful for the graph that produced it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Wraps a raw index. Mostly useful in tests; graphs hand out their own ids.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// The raw 0-based index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}
