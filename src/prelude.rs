//! # midend Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! of the crate. Import it to get quick access to the IR, the graphs, the solvers and
//! the analysis driver.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all midend operations
pub use crate::Error;

/// The result type used throughout midend
pub use crate::Result;

// ================================================================================================
// Intermediate Representation
// ================================================================================================

pub use crate::ir::{
    BinaryOp, CallStmt, Expr, FuncId, Function, Operand, Program, ProgramBuilder, Stmt, StmtId,
    Type, UnaryOp, VarId,
};

// ================================================================================================
// Graphs
// ================================================================================================

pub use crate::analysis::{
    AnalysisScope, CallGraph, CallGraphBuilder, CallSite, CfgEdgeKind, CfgNode, CfgProvider,
    ControlFlowGraph, Icfg, IcfgBuilder, IcfgEdge, IcfgEdgeKind, IcfgNode,
};

pub use crate::utils::graph::NodeId;

// ================================================================================================
// Dataflow
// ================================================================================================

pub use crate::analysis::dataflow::{
    ConstFact, ConstValue, ConstantPropagation, DataFlowAnalysis, DataFlowSolver, Direction,
    Lattice, LiveVariables, MeetSemiLattice,
};

pub use crate::analysis::{
    DataflowResult, InterConstantPropagation, InterproceduralAnalysis, InterproceduralSolver,
    SolverConfig, WorklistOrder,
};

// ================================================================================================
// Analysis Driver
// ================================================================================================

pub use crate::compiler::{
    Analysis, AnalysisConfig, AnalysisContext, AnalysisKind, AnalysisRegistry,
    AnalysisScheduler, EventKind, EventLog,
};
