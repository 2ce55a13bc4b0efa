//! The contract an interprocedural analysis implements.

use std::collections::BTreeSet;

use crate::{
    analysis::{
        callgraph::CallSite,
        cfg::CfgEdgeKind,
        dataflow::{Direction, MeetSemiLattice},
        icfg::{Icfg, IcfgEdge, IcfgNode},
    },
    ir::{FuncId, VarId},
    utils::graph::NodeId,
};

/// A monotone dataflow analysis over the [`Icfg`].
///
/// An implementation supplies the lattice (boundary fact, initial fact, meet) and one
/// transfer function per node and edge kind. Statements that are not call sites are
/// expected to reuse an intraprocedural [`DataFlowAnalysis`](crate::analysis::dataflow::DataFlowAnalysis)
/// so that per-statement semantics are shared. The effect of a call is modeled entirely by
/// its edges:
///
/// | Edge           | Typical effect                                              |
/// |----------------|-------------------------------------------------------------|
/// | `Normal`       | pass through, or refine on branch edges                     |
/// | `CallToReturn` | kill what the call invalidates, e.g. its result variable    |
/// | `Call`         | fresh callee fact binding formals to the actual arguments   |
/// | `Return`       | fresh caller fact binding the result to the returned values |
///
/// The provided [`transfer_node`](Self::transfer_node) and
/// [`transfer_edge`](Self::transfer_edge) dispatch to these hooks and are what the
/// [`InterproceduralSolver`](super::InterproceduralSolver) calls.
pub trait InterproceduralAnalysis {
    /// Lattice element attached to every ICFG node.
    type Fact: MeetSemiLattice;

    /// Direction of propagation. Only [`Direction::Forward`] can be solved.
    const DIRECTION: Direction;

    /// The fact entering the ICFG's entry node.
    fn new_boundary_fact(&self, entry: IcfgNode) -> Self::Fact;

    /// The fact every other node starts from, normally the lattice top.
    fn new_initial_fact(&self) -> Self::Fact;

    /// `target = target ∧ source`; returns `true` if `target` changed.
    ///
    /// Must be idempotent, commutative, associative and monotone.
    fn meet_into(&self, source: &Self::Fact, target: &mut Self::Fact) -> bool {
        target.meet_into(source)
    }

    /// Effect of a node that is not a call site.
    fn transfer_non_call(&self, node: IcfgNode, input: &Self::Fact) -> Self::Fact;

    /// Effect of the call site node itself. Defaults to a copy.
    fn transfer_call_site(&self, call_site: CallSite, input: &Self::Fact) -> Self::Fact {
        let _ = call_site;
        input.clone()
    }

    /// Fact flowing along an intraprocedural edge whose source is not a call site.
    fn transfer_normal_edge(
        &self,
        source: IcfgNode,
        target: IcfgNode,
        kind: CfgEdgeKind,
        fact: &Self::Fact,
    ) -> Self::Fact {
        let _ = (source, target, kind);
        fact.clone()
    }

    /// Fact flowing from a call site to one of its return sites, bypassing the callee.
    fn transfer_call_to_return_edge(
        &self,
        call_site: CallSite,
        return_site: IcfgNode,
        fact: &Self::Fact,
    ) -> Self::Fact;

    /// Fact entering `callee`, built from the out-fact of `call_site`.
    fn transfer_call_edge(&self, call_site: CallSite, callee: FuncId, fact: &Self::Fact)
        -> Self::Fact;

    /// Fact returning to `return_site`, built from the exit fact of `callee`.
    fn transfer_return_edge(
        &self,
        call_site: CallSite,
        callee: FuncId,
        return_vars: &BTreeSet<VarId>,
        return_site: IcfgNode,
        exit_fact: &Self::Fact,
    ) -> Self::Fact;

    /// Recomputes `output` from `input` for `node`. Returns `true` if `output` changed.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a node of `icfg`.
    fn transfer_node(
        &self,
        icfg: &Icfg,
        node: NodeId,
        input: &Self::Fact,
        output: &mut Self::Fact,
    ) -> bool {
        let fact = match icfg.call_site_at(node) {
            Some(call_site) => self.transfer_call_site(call_site, input),
            None => {
                let Some(&icfg_node) = icfg.node(node) else {
                    panic!("{node} is not an ICFG node");
                };
                self.transfer_non_call(icfg_node, input)
            }
        };
        if fact == *output {
            false
        } else {
            *output = fact;
            true
        }
    }

    /// The fact `edge` delivers to `target` given the out-fact of `source`.
    fn transfer_edge(
        &self,
        source: IcfgNode,
        target: IcfgNode,
        edge: &IcfgEdge,
        fact: &Self::Fact,
    ) -> Self::Fact {
        match edge {
            IcfgEdge::Normal { kind } => self.transfer_normal_edge(source, target, *kind, fact),
            IcfgEdge::CallToReturn { call_site } => {
                self.transfer_call_to_return_edge(*call_site, target, fact)
            }
            IcfgEdge::Call { call_site, callee } => {
                self.transfer_call_edge(*call_site, *callee, fact)
            }
            IcfgEdge::Return {
                call_site,
                callee,
                return_vars,
            } => self.transfer_return_edge(*call_site, *callee, return_vars, target, fact),
        }
    }
}
