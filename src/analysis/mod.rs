//! Program analysis infrastructure for the IR.
//!
//! This module builds on the generic graph infrastructure in [`crate::utils::graph`] to
//! provide the graphs and solvers of the middle-end.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Per-function statement-level control flow graphs
//! - [`callgraph`] - Call sites, callees and the reachable-function set
//! - [`icfg`] - The interprocedural CFG stitched from CFGs and the call graph
//! - [`dataflow`] - Lattices, the intraprocedural solver and its analyses
//! - [`interproc`] - The interprocedural analysis contract, worklist solver and
//!   interprocedural constant propagation
//!
//! Construction runs in dependency order: call graph, CFGs of the reachable functions,
//! ICFG, then any number of interprocedural analyses over the same ICFG.
//!
//! # Usage
//!
//! ```rust
//! use std::{collections::HashMap, sync::Arc};
//!
//! use midend::analysis::{self, ControlFlowGraph, InterConstantPropagation};
//! use midend::ir::{Operand, ProgramBuilder, Type};
//!
//! let mut builder = ProgramBuilder::new();
//! let main = builder.declare("main", &[], Type::Int);
//! let id = builder.declare("id", &["x"], Type::Int);
//!
//! let mut body = builder.body(main)?;
//! let a = body.local("a");
//! body.call(Some(a), id, vec![Operand::Const(7)]);
//! body.ret(Some(a));
//! body.finish()?;
//!
//! let mut body = builder.body(id)?;
//! let x = body.param(0);
//! body.ret(Some(x));
//! body.finish()?;
//! let program = builder.build()?;
//!
//! let cg = analysis::build_call_graph(&program, main);
//! let mut cfgs = HashMap::new();
//! for &func in cg.reachable_functions() {
//!     let function = program.function(func).expect("reachable functions exist");
//!     cfgs.insert(func, Arc::new(ControlFlowGraph::build(function)?));
//! }
//! let icfg = analysis::build_icfg(&program, &cfgs, &cg)?;
//! let result = analysis::solve(&InterConstantPropagation::new(&program), &icfg)?;
//! assert!(result.iterations() > 0);
//! # Ok::<(), midend::Error>(())
//! ```

pub mod callgraph;
pub mod cfg;
pub mod dataflow;
pub mod icfg;
pub mod interproc;

// Re-export primary types at module level
pub use callgraph::{
    AnalysisScope, CallGraph, CallGraphBuilder, CallGraphEdge, CallGraphStats, CallSite,
};
pub use cfg::{CfgEdgeKind, CfgNode, CfgProvider, ControlFlowGraph};
pub use dataflow::Direction;
pub use icfg::{Icfg, IcfgBuilder, IcfgEdge, IcfgEdgeKind, IcfgNode};
pub use interproc::{
    DataflowResult, InterConstantPropagation, InterproceduralAnalysis, InterproceduralSolver,
    SolverConfig, WorklistOrder,
};

use crate::{ir::FuncId, ir::Program, Result};

/// Builds the call graph of everything reachable from `entry`.
#[must_use]
pub fn build_call_graph(program: &Program, entry: FuncId) -> CallGraph {
    CallGraphBuilder::new(program).build(entry)
}

/// Builds the ICFG of the functions `cg` marks reachable.
///
/// Functions whose CFG `cfgs` cannot supply are left out, as are call edges into them.
///
/// # Errors
///
/// Returns an error if the underlying graph refuses an edge.
pub fn build_icfg(program: &Program, cfgs: &dyn CfgProvider, cg: &CallGraph) -> Result<Icfg> {
    IcfgBuilder::new(program, cfgs).build(cg)
}

/// Runs `analysis` to a fixpoint over `icfg` with the default solver configuration.
///
/// # Errors
///
/// Returns [`crate::Error::UnsupportedDirection`] for backward analyses.
pub fn solve<A: InterproceduralAnalysis>(
    analysis: &A,
    icfg: &Icfg,
) -> Result<DataflowResult<A::Fact>> {
    InterproceduralSolver::default().solve(analysis, icfg)
}
