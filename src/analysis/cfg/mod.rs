//! Per-function control flow graphs.
//!
//! # Architecture
//!
//! [`ControlFlowGraph`] is built directly from a [`Function`](crate::ir::Function)'s layout
//! on top of [`DirectedGraph`](crate::utils::graph::DirectedGraph): one node per statement
//! plus synthetic entry and exit nodes, with each edge tagged by a [`CfgEdgeKind`].
//!
//! # Edge Types
//!
//! - **Normal**: fall-through, `goto`, and falling off the end of the body into `Exit`
//! - **True / False**: the two sides of a conditional branch
//! - **Return**: a `return` statement reaching `Exit`
//!
//! # Availability
//!
//! The interprocedural builders never build CFGs themselves. They ask a [`CfgProvider`],
//! and a function whose CFG the provider cannot supply is treated as unavailable.

mod edge;
mod graph;

use std::{collections::HashMap, sync::Arc};

pub use edge::{CfgEdgeKind, CfgNode};
pub use graph::ControlFlowGraph;

use crate::ir::FuncId;

/// Source of per-function CFGs.
pub trait CfgProvider {
    /// The CFG of `func`, or `None` if it is unavailable.
    fn cfg(&self, func: FuncId) -> Option<Arc<ControlFlowGraph>>;
}

impl CfgProvider for HashMap<FuncId, Arc<ControlFlowGraph>> {
    fn cfg(&self, func: FuncId) -> Option<Arc<ControlFlowGraph>> {
        self.get(&func).cloned()
    }
}
