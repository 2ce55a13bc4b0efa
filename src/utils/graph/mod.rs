//! Directed graph storage and algorithms shared by the CFG, call graph and ICFG.
//!
//! # Architecture
//!
//! - [`DirectedGraph`] owns node and edge payloads in dense vectors
//! - [`NodeId`] / [`EdgeId`] are the handles into it
//! - [`GraphBase`], [`Successors`], [`Predecessors`] and [`RootedGraph`] are the read-only
//!   views the [`algorithms`] are written against

pub mod algorithms;
mod directed;
mod edge;
mod node;
mod traits;

pub use directed::DirectedGraph;
pub use edge::EdgeId;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
