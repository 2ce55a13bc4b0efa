//! Static call graph construction.
//!
//! # Architecture
//!
//! Every call in the IR names its callee directly, so the call graph is exact for the
//! functions it covers: one [`CallGraphEdge`] per [`CallSite`]. The
//! [`CallGraphBuilder`] discovers functions with a FIFO worklist starting from the entry
//! function; under [`AnalysisScope::Reachable`] functions that are never called are left
//! out of the graph.
//!
//! # Components
//!
//! - [`CallGraph`]: reachable set, call-site/callee indices and a function-level graph
//! - [`CallGraphBuilder`]: worklist traversal from an entry function
//! - [`CallSite`] / [`CallGraphEdge`]: identities of calls and resolved edges
//!
//! # Example
//!
//! ```rust,ignore
//! let cg = CallGraphBuilder::new(&program).build(main);
//!
//! for site in cg.call_sites_in(main) {
//!     println!("{site} calls {}", cg.callee_of(*site).unwrap());
//! }
//! for func in cg.bottom_up_order() {
//!     // callees before callers
//! }
//! ```

mod builder;
mod graph;
mod site;

pub use builder::{AnalysisScope, CallGraphBuilder};
pub use graph::{CallGraph, CallGraphStats};
pub use site::{CallGraphEdge, CallSite};
