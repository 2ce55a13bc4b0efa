//! Intraprocedural data flow analysis.
//!
//! A generic framework for computing properties that propagate along the edges of a
//! per-function [`ControlFlowGraph`](crate::analysis::ControlFlowGraph), in either
//! direction, using a worklist solver.
//!
//! # Architecture
//!
//! - **Lattice**: the domain of abstract values and its meet
//! - **Analysis**: node and edge transfer functions plus boundary conditions
//! - **Solver**: iterative fixpoint computation over one function
//!
//! The transfer functions of these analyses are reused unchanged by the interprocedural
//! analyses for every statement that is not a call site.
//!
//! # Analyses Provided
//!
//! - [`ConstantPropagation`]: constants with branch narrowing
//! - [`LiveVariables`]: backward liveness over variable bit sets

mod constants;
mod framework;
mod lattice;
mod liveness;
mod solver;

pub use constants::{eval_expr, eval_operand, ConstFact, ConstValue, ConstantPropagation};
pub use framework::{AnalysisResults, DataFlowAnalysis, Direction};
pub use lattice::{Lattice, MeetSemiLattice};
pub use liveness::{LiveVariables, LivenessResult};
pub use solver::DataFlowSolver;
