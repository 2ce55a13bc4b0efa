//! Interprocedural dataflow analysis over the ICFG.
//!
//! # Architecture
//!
//! - [`InterproceduralAnalysis`]: the contract: lattice operations plus one transfer
//!   function per node kind and per [`IcfgEdge`](crate::analysis::icfg::IcfgEdge) kind,
//!   dispatched by exhaustive matching
//! - [`InterproceduralSolver`]: a sequential worklist fixpoint engine configured by
//!   [`SolverConfig`]
//! - [`DataflowResult`]: the immutable per-node facts it produces
//! - [`InterConstantPropagation`]: constant propagation wired through calls and returns
//!
//! Only forward analyses are solved; backward ones are rejected with
//! [`Error::UnsupportedDirection`](crate::Error::UnsupportedDirection).

mod constants;
mod framework;
mod result;
mod solver;

pub use constants::InterConstantPropagation;
pub use framework::InterproceduralAnalysis;
pub use result::DataflowResult;
pub use solver::{InterproceduralSolver, SolverConfig, WorklistOrder};

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{
        analysis::{
            callgraph::{CallGraphBuilder, CallSite},
            dataflow::Direction,
            icfg::{IcfgBuilder, IcfgNode},
        },
        ir::{FuncId, VarId},
        test::factories::{add_program, cfgs},
        utils::BitSet,
        Error,
    };

    /// Counts how many distinct nodes of each function may execute before a point.
    struct Visited {
        capacity: usize,
    }

    impl InterproceduralAnalysis for Visited {
        type Fact = BitSet;
        const DIRECTION: Direction = Direction::Forward;

        fn new_boundary_fact(&self, _entry: IcfgNode) -> BitSet {
            BitSet::new(self.capacity)
        }

        fn new_initial_fact(&self) -> BitSet {
            BitSet::new(self.capacity)
        }

        fn transfer_non_call(&self, node: IcfgNode, input: &BitSet) -> BitSet {
            let mut out = input.clone();
            out.insert(node.func.index());
            out
        }

        fn transfer_call_to_return_edge(&self, _: CallSite, _: IcfgNode, fact: &BitSet) -> BitSet {
            fact.clone()
        }

        fn transfer_call_edge(&self, _: CallSite, _: FuncId, fact: &BitSet) -> BitSet {
            fact.clone()
        }

        fn transfer_return_edge(
            &self,
            _: CallSite,
            _: FuncId,
            _: &BTreeSet<VarId>,
            _: IcfgNode,
            exit_fact: &BitSet,
        ) -> BitSet {
            exit_fact.clone()
        }
    }

    struct Backwards;

    impl InterproceduralAnalysis for Backwards {
        type Fact = BitSet;
        const DIRECTION: Direction = Direction::Backward;

        fn new_boundary_fact(&self, _entry: IcfgNode) -> BitSet {
            BitSet::new(1)
        }

        fn new_initial_fact(&self) -> BitSet {
            BitSet::new(1)
        }

        fn transfer_non_call(&self, _node: IcfgNode, input: &BitSet) -> BitSet {
            input.clone()
        }

        fn transfer_call_to_return_edge(&self, _: CallSite, _: IcfgNode, fact: &BitSet) -> BitSet {
            fact.clone()
        }

        fn transfer_call_edge(&self, _: CallSite, _: FuncId, fact: &BitSet) -> BitSet {
            fact.clone()
        }

        fn transfer_return_edge(
            &self,
            _: CallSite,
            _: FuncId,
            _: &BTreeSet<VarId>,
            _: IcfgNode,
            exit_fact: &BitSet,
        ) -> BitSet {
            exit_fact.clone()
        }
    }

    #[test]
    fn facts_flow_through_call_and_return() {
        let (program, ids) = add_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        let result = InterproceduralSolver::default()
            .solve(&Visited { capacity: 2 }, &icfg)
            .unwrap();

        let at_main_exit = result.fact_after(IcfgNode::exit(ids.main)).unwrap();
        assert!(at_main_exit.contains(ids.main.index()));
        assert!(at_main_exit.contains(ids.add.index()));
        assert_eq!(result.node_count(), icfg.node_count());
        assert!(result.iterations() >= icfg.node_count());
    }

    #[test]
    fn backward_analyses_are_rejected() {
        let (program, ids) = add_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        let err = InterproceduralSolver::default()
            .solve(&Backwards, &icfg)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedDirection(Direction::Backward)));
    }

    #[test]
    fn iteration_limit_is_reported() {
        let (program, ids) = add_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        let config = SolverConfig {
            max_iterations: Some(3),
            ..SolverConfig::default()
        };
        let err = InterproceduralSolver::new(config)
            .solve(&InterConstantPropagation::new(&program), &icfg)
            .unwrap_err();
        assert!(matches!(err, Error::IterationLimit(3)));
    }
}
