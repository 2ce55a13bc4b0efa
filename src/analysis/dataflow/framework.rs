//! Data flow analysis framework trait and direction.
//!
//! Any intraprocedural analysis implements [`DataFlowAnalysis`] to work with the
//! [`DataFlowSolver`](super::DataFlowSolver). The node and edge transfer functions defined
//! here are also what the interprocedural analyses reuse for statements that are not
//! call sites.

use crate::{
    analysis::{
        cfg::{CfgEdgeKind, CfgNode, ControlFlowGraph},
        dataflow::lattice::MeetSemiLattice,
    },
    ir::Function,
    utils::graph::NodeId,
};

/// Direction of data flow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Information flows forward, from entry to exit.
    ///
    /// Examples: constant propagation, reaching definitions.
    Forward,

    /// Information flows backward, from exit to entry.
    ///
    /// Examples: live variables, very busy expressions.
    Backward,
}

/// A data flow analysis over a per-function CFG.
///
/// Implementations provide the transfer functions and boundary conditions; the solver
/// handles iteration to a fixpoint.
///
/// For forward analyses: `out[n] = transfer(n, in[n])`, where `in[n]` is the meet of
/// `transfer_edge(p -> n, out[p])` over all predecessors `p`.
/// For backward analyses: `in[n] = transfer(n, out[n])`, where `out[n]` is the meet of
/// `transfer_edge(n -> s, in[s])` over all successors `s`.
///
/// # Example
///
/// ```rust,ignore
/// use midend::analysis::dataflow::{DataFlowAnalysis, Direction};
///
/// struct Reached;
///
/// impl DataFlowAnalysis for Reached {
///     type Fact = BitSet;
///     const DIRECTION: Direction = Direction::Forward;
///
///     fn boundary(&self, f: &Function) -> BitSet { BitSet::new(f.len()) }
///     fn initial(&self, f: &Function) -> BitSet { BitSet::new(f.len()) }
///     fn transfer(&self, f: &Function, node: CfgNode, input: &BitSet) -> BitSet {
///         let mut out = input.clone();
///         if let Some(pos) = node.stmt().and_then(|s| f.position(s)) {
///             out.insert(pos);
///         }
///         out
///     }
/// }
/// ```
pub trait DataFlowAnalysis {
    /// The lattice type for this analysis.
    type Fact: MeetSemiLattice;

    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// The fact at the function boundary: entry for forward analyses, exit for backward.
    fn boundary(&self, function: &Function) -> Self::Fact;

    /// The fact every other node starts from, normally the lattice top.
    fn initial(&self, function: &Function) -> Self::Fact;

    /// Applies the effect of `node` to `input`.
    fn transfer(&self, function: &Function, node: CfgNode, input: &Self::Fact) -> Self::Fact;

    /// Refines `fact` as it flows along the edge `source -> target` of kind `kind`.
    ///
    /// `fact` is the out-fact of `source` for forward analyses and the in-fact of `target`
    /// for backward ones. The default passes it through unchanged.
    fn transfer_edge(
        &self,
        function: &Function,
        source: CfgNode,
        target: CfgNode,
        kind: CfgEdgeKind,
        fact: &Self::Fact,
    ) -> Self::Fact {
        let _ = (function, source, target, kind);
        fact.clone()
    }
}

/// Results of a data flow analysis, indexed by CFG node.
#[derive(Debug, Clone)]
pub struct AnalysisResults<L> {
    /// Input state for each node (before its transfer function in program order).
    pub in_states: Vec<L>,
    /// Output state for each node.
    pub out_states: Vec<L>,
    /// Number of node visits until the fixpoint was reached.
    pub iterations: usize,
}

impl<L> AnalysisResults<L> {
    /// Creates new analysis results with the given states.
    #[must_use]
    pub fn new(in_states: Vec<L>, out_states: Vec<L>, iterations: usize) -> Self {
        Self {
            in_states,
            out_states,
            iterations,
        }
    }

    /// Returns the input state for a node, or `None` if the id is out of bounds.
    #[must_use]
    pub fn in_state(&self, node: NodeId) -> Option<&L> {
        self.in_states.get(node.index())
    }

    /// Returns the output state for a node, or `None` if the id is out of bounds.
    #[must_use]
    pub fn out_state(&self, node: NodeId) -> Option<&L> {
        self.out_states.get(node.index())
    }

    /// The fact holding just before `node` executes.
    #[must_use]
    pub fn fact_before(&self, cfg: &ControlFlowGraph, node: CfgNode) -> Option<&L> {
        cfg.node_id(node).and_then(|id| self.in_state(id))
    }

    /// The fact holding just after `node` executes.
    #[must_use]
    pub fn fact_after(&self, cfg: &ControlFlowGraph, node: CfgNode) -> Option<&L> {
        cfg.node_id(node).and_then(|id| self.out_state(id))
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.in_states.len()
    }
}
