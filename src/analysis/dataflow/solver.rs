//! Worklist-based data flow solver.
//!
//! # Algorithm
//!
//! 1. Initialize every node with the initial value
//! 2. Set the boundary value at entry (forward) or exit (backward)
//! 3. Add all nodes to the worklist in reverse postorder (forward) or postorder (backward)
//! 4. While the worklist is non-empty:
//!    a. Remove a node from the worklist
//!    b. Compute its input by meeting edge-transferred values from predecessors/successors
//!    c. Apply the transfer function to get the output
//!    d. If the output changed, add affected nodes to the worklist
//!
//! # Complexity
//!
//! The total work is O(n * h) node visits where h is the lattice height.

use std::collections::VecDeque;

use crate::{
    analysis::{
        cfg::{CfgNode, ControlFlowGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::MeetSemiLattice,
        },
    },
    ir::Function,
    utils::graph::NodeId,
};

/// Worklist-based data flow solver for a single function.
///
/// # Usage
///
/// ```rust,ignore
/// use midend::analysis::dataflow::{ConstantPropagation, DataFlowSolver};
///
/// let results = DataFlowSolver::new(ConstantPropagation::new()).solve(&function, &cfg);
/// let before_return = results.fact_before(&cfg, CfgNode::Stmt(ret));
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    analysis: A,
    in_states: Vec<A::Fact>,
    out_states: Vec<A::Fact>,
    worklist: VecDeque<NodeId>,
    /// Whether each node is currently in the worklist (for deduplication).
    in_worklist: Vec<bool>,
    iterations: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a new solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            in_states: Vec::new(),
            out_states: Vec::new(),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
        }
    }

    /// The analysis being solved.
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Solves the data flow analysis to a fixpoint.
    ///
    /// # Panics
    ///
    /// Panics if `cfg` was not built for `function` or contains nodes that do not belong to
    /// it; both indicate a broken graph.
    pub fn solve(mut self, function: &Function, cfg: &ControlFlowGraph) -> AnalysisResults<A::Fact> {
        assert_eq!(
            cfg.func(),
            function.id(),
            "CFG of {} used to analyze {}",
            cfg.func(),
            function.id()
        );

        self.initialize(function, cfg);
        while let Some(node) = self.worklist.pop_front() {
            self.in_worklist[node.index()] = false;
            self.iterations += 1;

            let changed = match A::DIRECTION {
                Direction::Forward => self.process_forward(node, function, cfg),
                Direction::Backward => self.process_backward(node, function, cfg),
            };
            if changed {
                self.add_affected_to_worklist(node, cfg);
            }
        }

        tracing::trace!(
            function = %function.id(),
            iterations = self.iterations,
            "intraprocedural fixpoint reached"
        );
        AnalysisResults::new(self.in_states, self.out_states, self.iterations)
    }

    fn initialize(&mut self, function: &Function, cfg: &ControlFlowGraph) {
        let node_count = cfg.node_count();
        let initial = self.analysis.initial(function);
        let boundary = self.analysis.boundary(function);

        self.in_states = vec![initial.clone(); node_count];
        self.out_states = vec![initial; node_count];
        self.in_worklist = vec![false; node_count];

        match A::DIRECTION {
            Direction::Forward => self.in_states[cfg.entry().index()] = boundary,
            Direction::Backward => self.out_states[cfg.exit().index()] = boundary,
        }

        let rpo = cfg.reverse_postorder();
        let order: Vec<NodeId> = match A::DIRECTION {
            Direction::Forward => rpo.to_vec(),
            Direction::Backward => rpo.iter().rev().copied().collect(),
        };
        for node in order {
            self.enqueue(node);
        }
        // Nodes unreachable from entry are not in the postorder but still get visited once.
        for (node, _) in cfg.nodes() {
            self.enqueue(node);
        }
    }

    fn enqueue(&mut self, node: NodeId) {
        if !self.in_worklist[node.index()] {
            self.in_worklist[node.index()] = true;
            self.worklist.push_back(node);
        }
    }

    /// Returns `true` if the output state changed.
    fn process_forward(&mut self, node: NodeId, function: &Function, cfg: &ControlFlowGraph) -> bool {
        let target = cfg_node(cfg, node);
        if node != cfg.entry() {
            let mut input: Option<A::Fact> = None;
            for (pred, kind) in cfg.incoming_edges(node) {
                let fact = self.analysis.transfer_edge(
                    function,
                    cfg_node(cfg, pred),
                    target,
                    kind,
                    &self.out_states[pred.index()],
                );
                match input.as_mut() {
                    None => input = Some(fact),
                    Some(acc) => {
                        acc.meet_into(&fact);
                    }
                }
            }
            if let Some(input) = input {
                self.in_states[node.index()] = input;
            }
        }

        let output = self
            .analysis
            .transfer(function, target, &self.in_states[node.index()]);
        let changed = output != self.out_states[node.index()];
        self.out_states[node.index()] = output;
        changed
    }

    /// Returns `true` if the input state changed.
    fn process_backward(&mut self, node: NodeId, function: &Function, cfg: &ControlFlowGraph) -> bool {
        let source = cfg_node(cfg, node);
        if node != cfg.exit() {
            let mut output: Option<A::Fact> = None;
            for (succ, kind) in cfg.outgoing_edges(node) {
                let fact = self.analysis.transfer_edge(
                    function,
                    source,
                    cfg_node(cfg, succ),
                    kind,
                    &self.in_states[succ.index()],
                );
                match output.as_mut() {
                    None => output = Some(fact),
                    Some(acc) => {
                        acc.meet_into(&fact);
                    }
                }
            }
            if let Some(output) = output {
                self.out_states[node.index()] = output;
            }
        }

        let input = self
            .analysis
            .transfer(function, source, &self.out_states[node.index()]);
        let changed = input != self.in_states[node.index()];
        self.in_states[node.index()] = input;
        changed
    }

    fn add_affected_to_worklist(&mut self, node: NodeId, cfg: &ControlFlowGraph) {
        match A::DIRECTION {
            Direction::Forward => {
                for succ in cfg.successors(node) {
                    self.enqueue(succ);
                }
            }
            Direction::Backward => {
                for pred in cfg.predecessors(node) {
                    self.enqueue(pred);
                }
            }
        }
    }
}

fn cfg_node(cfg: &ControlFlowGraph, node: NodeId) -> CfgNode {
    cfg.node(node)
        .unwrap_or_else(|| panic!("{node} is not a node of the CFG of {}", cfg.func()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::cfg::CfgEdgeKind,
        ir::{ProgramBuilder, Type},
        utils::BitSet,
    };

    /// Collects the layout positions of every statement that may have executed.
    struct Executed;

    impl DataFlowAnalysis for Executed {
        type Fact = BitSet;
        const DIRECTION: Direction = Direction::Forward;

        fn boundary(&self, function: &Function) -> BitSet {
            BitSet::new(function.len())
        }

        fn initial(&self, function: &Function) -> BitSet {
            BitSet::new(function.len())
        }

        fn transfer(&self, function: &Function, node: CfgNode, input: &BitSet) -> BitSet {
            let mut out = input.clone();
            if let Some(pos) = node.stmt().and_then(|s| function.position(s)) {
                out.insert(pos);
            }
            out
        }
    }

    /// Like `Executed`, but never follows the taken side of a branch.
    struct FallThroughOnly;

    impl DataFlowAnalysis for FallThroughOnly {
        type Fact = BitSet;
        const DIRECTION: Direction = Direction::Forward;

        fn boundary(&self, function: &Function) -> BitSet {
            Executed.boundary(function)
        }

        fn initial(&self, function: &Function) -> BitSet {
            Executed.initial(function)
        }

        fn transfer(&self, function: &Function, node: CfgNode, input: &BitSet) -> BitSet {
            Executed.transfer(function, node, input)
        }

        fn transfer_edge(
            &self,
            _function: &Function,
            _source: CfgNode,
            _target: CfgNode,
            kind: CfgEdgeKind,
            fact: &BitSet,
        ) -> BitSet {
            if kind == CfgEdgeKind::True {
                BitSet::new(fact.capacity())
            } else {
                fact.clone()
            }
        }
    }

    fn diamond() -> crate::ir::Program {
        let mut builder = ProgramBuilder::new();
        let main = builder.declare("main", &["c"], Type::Int);
        let mut body = builder.body(main).unwrap();
        let c = body.param(0);
        let v = body.local("v");
        let taken = body.new_label();
        let join = body.new_label();
        body.branch(c, taken);
        body.assign(v, 1);
        body.jump(join);
        body.bind(taken);
        body.assign(v, 2);
        body.bind(join);
        body.ret(Some(v));
        body.finish().unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn forward_union_over_diamond() {
        let program = diamond();
        let function = program.function(program.function_by_name("main").unwrap()).unwrap();
        let cfg = ControlFlowGraph::build(function).unwrap();

        let results = DataFlowSolver::new(Executed).solve(function, &cfg);
        let at_exit = results.fact_before(&cfg, CfgNode::Exit).unwrap();
        assert_eq!(at_exit.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(results.iterations >= cfg.node_count());
    }

    #[test]
    fn edge_transfer_prunes_branch() {
        let program = diamond();
        let function = program.function(crate::ir::FuncId::new(0)).unwrap();
        let cfg = ControlFlowGraph::build(function).unwrap();

        let results = DataFlowSolver::new(FallThroughOnly).solve(function, &cfg);
        let taken = CfgNode::Stmt(function.layout()[3]);
        assert!(results.fact_before(&cfg, taken).unwrap().is_empty());
        assert_eq!(
            results.fact_after(&cfg, taken).unwrap().iter().collect::<Vec<_>>(),
            vec![3]
        );
    }
}
