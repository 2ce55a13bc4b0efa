//! Call sites and call-graph edges.

use std::fmt;

use crate::ir::{FuncId, StmtId};

/// A call statement, identified by its containing function and statement handle.
///
/// Every call site belongs to exactly one function and, since calls are direct, resolves
/// to exactly one callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallSite {
    /// Function containing the call
    pub caller: FuncId,
    /// The call statement
    pub stmt: StmtId,
}

impl CallSite {
    /// Creates a call site.
    #[must_use]
    pub const fn new(caller: FuncId, stmt: StmtId) -> Self {
        CallSite { caller, stmt }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.caller, self.stmt)
    }
}

/// A resolved call: `call_site -> callee`. Unique per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallGraphEdge {
    /// The calling statement
    pub call_site: CallSite,
    /// The statically known target
    pub callee: FuncId,
}
