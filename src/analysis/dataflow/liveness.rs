//! Live variable analysis.
//!
//! A variable is *live* at a program point if there exists a path from that point to a
//! use of the variable that doesn't pass through a definition of it.
//!
//! # Algorithm
//!
//! This is a backward data flow analysis over the statement-level CFG:
//!
//! - `OUT[n]` = ∪{IN[s] | s is a successor of n}
//! - `IN[n]` = USE[n] ∪ (OUT[n] - DEF[n])
//!
//! Nothing is live at exit; returned values are uses of the `return` statement.

use crate::{
    analysis::{
        cfg::{CfgNode, ControlFlowGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            solver::DataFlowSolver,
        },
    },
    ir::{Function, StmtId, VarId},
    utils::BitSet,
};

/// Live variable analysis.
///
/// # Example
///
/// ```rust,ignore
/// use midend::analysis::dataflow::LiveVariables;
///
/// let live = LiveVariables::analyze(&function, &cfg);
/// for var in live.live_out(stmt) {
///     println!("{} is live after {stmt}", function.var_name(var));
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveVariables;

impl LiveVariables {
    /// Creates the analysis.
    #[must_use]
    pub fn new() -> Self {
        LiveVariables
    }

    /// Runs the analysis on one function.
    #[must_use]
    pub fn analyze(function: &Function, cfg: &ControlFlowGraph) -> LivenessResult {
        let results = DataFlowSolver::new(LiveVariables).solve(function, cfg);
        LivenessResult {
            nodes: cfg.nodes().map(|(_, node)| node).collect(),
            results,
        }
    }
}

impl DataFlowAnalysis for LiveVariables {
    type Fact = BitSet;
    const DIRECTION: Direction = Direction::Backward;

    fn boundary(&self, function: &Function) -> BitSet {
        BitSet::new(function.var_count())
    }

    fn initial(&self, function: &Function) -> BitSet {
        BitSet::new(function.var_count())
    }

    fn transfer(&self, function: &Function, node: CfgNode, output: &BitSet) -> BitSet {
        let mut input = output.clone();
        let Some(stmt) = node.stmt().and_then(|id| function.stmt(id)) else {
            return input;
        };
        if let Some(def) = stmt.def() {
            input.remove(def.index());
        }
        for used in stmt.uses() {
            input.insert(used.index());
        }
        input
    }
}

/// Per-statement liveness of one function.
#[derive(Debug, Clone)]
pub struct LivenessResult {
    nodes: Vec<CfgNode>,
    results: AnalysisResults<BitSet>,
}

impl LivenessResult {
    fn position(&self, node: CfgNode) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    fn vars(set: Option<&BitSet>) -> Vec<VarId> {
        set.map(|set| set.iter().map(VarId::new).collect())
            .unwrap_or_default()
    }

    /// Variables live just before `stmt`.
    #[must_use]
    pub fn live_in(&self, stmt: StmtId) -> Vec<VarId> {
        Self::vars(
            self.position(CfgNode::Stmt(stmt))
                .and_then(|i| self.results.in_states.get(i)),
        )
    }

    /// Variables live just after `stmt`.
    #[must_use]
    pub fn live_out(&self, stmt: StmtId) -> Vec<VarId> {
        Self::vars(
            self.position(CfgNode::Stmt(stmt))
                .and_then(|i| self.results.out_states.get(i)),
        )
    }

    /// Variables live at function entry, i.e. read before being written on some path.
    #[must_use]
    pub fn live_at_entry(&self) -> Vec<VarId> {
        Self::vars(
            self.position(CfgNode::Entry)
                .and_then(|i| self.results.out_states.get(i)),
        )
    }

    /// Returns `true` if the value written by `stmt` (if any) is never read.
    #[must_use]
    pub fn is_dead_def(&self, function: &Function, stmt: StmtId) -> bool {
        function
            .stmt(stmt)
            .and_then(|s| s.def())
            .is_some_and(|def| !self.live_out(stmt).contains(&def))
    }

    /// Node visits until the fixpoint was reached.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.results.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{BinaryOp, Expr, ProgramBuilder, Type},
        test::factories::pick_program,
    };

    #[test]
    fn straight_line_liveness() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &["p"], Type::Int);
        let mut body = builder.body(f).unwrap();
        let p = body.param(0);
        let a = body.local("a");
        let b = body.local("b");
        let s0 = body.assign(a, Expr::binary(BinaryOp::Add, p, 1));
        let s1 = body.assign(b, 3);
        let s2 = body.ret(Some(a));
        body.finish().unwrap();
        let program = builder.build().unwrap();

        let function = program.function(f).unwrap();
        let cfg = ControlFlowGraph::build(function).unwrap();
        let live = LiveVariables::analyze(function, &cfg);

        assert_eq!(live.live_in(s0), vec![p]);
        assert_eq!(live.live_out(s0), vec![a]);
        assert_eq!(live.live_in(s2), vec![a]);
        assert!(live.live_out(s2).is_empty());
        assert!(live.is_dead_def(function, s1));
        assert!(!live.is_dead_def(function, s0));
        assert_eq!(live.live_at_entry(), vec![p]);
    }

    #[test]
    fn liveness_merges_branches() {
        let (program, ids) = pick_program();
        let function = program.function(ids.pick).unwrap();
        let cfg = ControlFlowGraph::build(function).unwrap();
        let live = LiveVariables::analyze(function, &cfg);

        let c = function.var_by_name("c").unwrap();
        let branch = function.layout()[0];
        assert_eq!(live.live_in(branch), vec![c]);
        assert!(live.live_out(branch).is_empty());
    }
}
