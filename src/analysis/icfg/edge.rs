//! ICFG nodes and the four edge kinds.

use std::{collections::BTreeSet, fmt};

use strum::{AsRefStr, Display, EnumIter};

use crate::{
    analysis::{
        callgraph::CallSite,
        cfg::{CfgEdgeKind, CfgNode},
    },
    ir::{FuncId, StmtId, VarId},
};

/// A node of the ICFG: a CFG node qualified by its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IcfgNode {
    /// Owning function
    pub func: FuncId,
    /// Node within the function's CFG
    pub node: CfgNode,
}

impl IcfgNode {
    /// The entry node of `func`.
    #[must_use]
    pub const fn entry(func: FuncId) -> Self {
        IcfgNode {
            func,
            node: CfgNode::Entry,
        }
    }

    /// The exit node of `func`.
    #[must_use]
    pub const fn exit(func: FuncId) -> Self {
        IcfgNode {
            func,
            node: CfgNode::Exit,
        }
    }

    /// The node of statement `stmt` in `func`.
    #[must_use]
    pub const fn stmt(func: FuncId, stmt: StmtId) -> Self {
        IcfgNode {
            func,
            node: CfgNode::Stmt(stmt),
        }
    }
}

impl fmt::Display for IcfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.func, self.node)
    }
}

/// Discriminant of [`IcfgEdge`], for counting and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum IcfgEdgeKind {
    /// See [`IcfgEdge::Normal`]
    Normal,
    /// See [`IcfgEdge::CallToReturn`]
    CallToReturn,
    /// See [`IcfgEdge::Call`]
    Call,
    /// See [`IcfgEdge::Return`]
    Return,
}

/// An ICFG edge.
///
/// Analyses match on this exhaustively; there is no catch-all kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcfgEdge {
    /// Intraprocedural edge whose source is not a call site.
    Normal {
        /// The underlying CFG edge kind (branch side, return, ...)
        kind: CfgEdgeKind,
    },
    /// Call site to one of its local return sites, bypassing the callee.
    CallToReturn {
        /// The call being bypassed
        call_site: CallSite,
    },
    /// Call site to the callee's entry.
    Call {
        /// The call
        call_site: CallSite,
        /// Its target
        callee: FuncId,
    },
    /// Callee exit to a return site of `call_site`.
    Return {
        /// The call being returned from
        call_site: CallSite,
        /// The returning function
        callee: FuncId,
        /// Variables of `callee` holding its return value across all `return` statements
        return_vars: BTreeSet<VarId>,
    },
}

impl IcfgEdge {
    /// The edge's discriminant.
    #[must_use]
    pub fn kind(&self) -> IcfgEdgeKind {
        match self {
            IcfgEdge::Normal { .. } => IcfgEdgeKind::Normal,
            IcfgEdge::CallToReturn { .. } => IcfgEdgeKind::CallToReturn,
            IcfgEdge::Call { .. } => IcfgEdgeKind::Call,
            IcfgEdge::Return { .. } => IcfgEdgeKind::Return,
        }
    }

    /// The call site involved, for the three call-related kinds.
    #[must_use]
    pub fn call_site(&self) -> Option<CallSite> {
        match self {
            IcfgEdge::Normal { .. } => None,
            IcfgEdge::CallToReturn { call_site }
            | IcfgEdge::Call { call_site, .. }
            | IcfgEdge::Return { call_site, .. } => Some(*call_site),
        }
    }

    /// Returns `true` for edges crossing a function boundary.
    #[must_use]
    pub fn is_interprocedural(&self) -> bool {
        matches!(self, IcfgEdge::Call { .. } | IcfgEdge::Return { .. })
    }
}
