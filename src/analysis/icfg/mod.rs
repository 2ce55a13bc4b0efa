//! Interprocedural control flow graph.
//!
//! # Architecture
//!
//! The [`Icfg`] holds a copy of every available CFG of the call graph's reachable
//! functions, with each node qualified by its function ([`IcfgNode`]). Call sites are then
//! stitched to their callees with three extra kinds of edges:
//!
//! ```text
//!   caller: ... -> [call site] --CallToReturn--> [return site] -> ...
//!                     |                              ^
//!                   Call                           Return
//!                     v                              |
//!   callee:        [entry] -> ... -> [exit] ---------+
//! ```
//!
//! The intraprocedural edge out of a call site always becomes a `CallToReturn` edge, so
//! every call site has exactly one `CallToReturn` edge per local successor, plus one
//! `Call` edge when the callee's CFG is available. `Return` edges carry the set of
//! variables the callee returns across all of its `return` statements.
//!
//! # Unavailable CFGs
//!
//! A function without a CFG is absent from the ICFG, and calls to it keep only their
//! `CallToReturn` edges. [`IcfgBuilder`] reports both cases as events.

mod builder;
mod edge;
mod graph;

pub use builder::IcfgBuilder;
pub use edge::{IcfgEdge, IcfgEdgeKind, IcfgNode};
pub use graph::Icfg;
