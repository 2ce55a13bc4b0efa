//! Graph algorithms over the [`traits`](crate::utils::graph::traits) views.
//!
//! - [`postorder`] / [`reverse_postorder`] seed the dataflow worklists
//! - [`strongly_connected_components`] finds recursive call cycles
//! - [`topological_sort`] orders acyclic call graphs

mod scc;
mod topological;
mod traversal;

pub use scc::strongly_connected_components;
pub use topological::topological_sort;
pub use traversal::{dfs, postorder, reverse_postorder};
