//! Node and edge tags of the per-function CFG.

use std::fmt;

use strum::{AsRefStr, Display};

use crate::ir::StmtId;

/// A node of a per-function control flow graph.
///
/// Besides one node per statement, every CFG has a synthetic `Entry` and `Exit`. All
/// `return` statements and the fall-off-the-end path meet at `Exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CfgNode {
    /// Synthetic function entry
    Entry,
    /// Synthetic function exit
    Exit,
    /// A statement of the function body
    Stmt(StmtId),
}

impl CfgNode {
    /// The statement handle, for statement nodes.
    #[must_use]
    pub const fn stmt(self) -> Option<StmtId> {
        match self {
            CfgNode::Stmt(id) => Some(id),
            CfgNode::Entry | CfgNode::Exit => None,
        }
    }
}

impl fmt::Display for CfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgNode::Entry => f.write_str("entry"),
            CfgNode::Exit => f.write_str("exit"),
            CfgNode::Stmt(id) => write!(f, "{id}"),
        }
    }
}

/// How control moves along a CFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CfgEdgeKind {
    /// Fall-through or unconditional jump. Also used for falling off the end into `Exit`.
    Normal,
    /// Taken side of a branch (`cond != 0`)
    True,
    /// Not-taken side of a branch (`cond == 0`)
    False,
    /// A `return` statement reaching `Exit`
    Return,
}

impl CfgEdgeKind {
    /// Returns `true` for the two sides of a branch.
    #[must_use]
    pub const fn is_conditional(self) -> bool {
        matches!(self, CfgEdgeKind::True | CfgEdgeKind::False)
    }
}
