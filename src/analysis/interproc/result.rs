use std::collections::HashMap;

use crate::{
    analysis::icfg::{Icfg, IcfgNode},
    utils::graph::NodeId,
};

/// Per-node facts at the interprocedural fixpoint.
///
/// Immutable once produced by the solver; facts are addressable by ICFG node id or by
/// [`IcfgNode`].
#[derive(Debug, Clone)]
pub struct DataflowResult<F> {
    index: HashMap<IcfgNode, NodeId>,
    in_facts: Vec<F>,
    out_facts: Vec<F>,
    iterations: usize,
}

impl<F> DataflowResult<F> {
    pub(crate) fn new(icfg: &Icfg, in_facts: Vec<F>, out_facts: Vec<F>, iterations: usize) -> Self {
        DataflowResult {
            index: icfg.nodes().map(|(id, node)| (*node, id)).collect(),
            in_facts,
            out_facts,
            iterations,
        }
    }

    /// Fact flowing into `node`.
    #[must_use]
    pub fn in_fact(&self, node: NodeId) -> Option<&F> {
        self.in_facts.get(node.index())
    }

    /// Fact flowing out of `node`.
    #[must_use]
    pub fn out_fact(&self, node: NodeId) -> Option<&F> {
        self.out_facts.get(node.index())
    }

    /// Fact holding just before `node` executes, or `None` if `node` is not in the ICFG.
    #[must_use]
    pub fn fact_before(&self, node: IcfgNode) -> Option<&F> {
        self.index.get(&node).and_then(|&id| self.in_fact(id))
    }

    /// Fact holding just after `node` executes.
    #[must_use]
    pub fn fact_after(&self, node: IcfgNode) -> Option<&F> {
        self.index.get(&node).and_then(|&id| self.out_fact(id))
    }

    /// `(node, in, out)` for every node, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (IcfgNode, &F, &F)> + '_ {
        self.index
            .iter()
            .map(|(&node, &id)| (node, &self.in_facts[id.index()], &self.out_facts[id.index()]))
    }

    /// Number of nodes with facts.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.in_facts.len()
    }

    /// Node visits until the fixpoint was reached.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl<F: PartialEq> DataflowResult<F> {
    /// Returns `true` if both results hold the same facts at every node, regardless of how
    /// many iterations each took.
    #[must_use]
    pub fn same_facts(&self, other: &Self) -> bool {
        self.index == other.index
            && self.in_facts == other.in_facts
            && self.out_facts == other.out_facts
    }
}
