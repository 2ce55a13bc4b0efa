//! Analysis driver around the interprocedural core.
//!
//! This module provides the layer between the IR and the analyses:
//!
//! - [`crate::ir`]: programs, functions and statements
//! - [`crate::analysis`]: CFGs, call graph, ICFG, dataflow solvers
//! - [`compiler`](self): context, analysis registry, plan scheduling, diagnostics
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Analysis Driver                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  AnalysisContext             Explicit state of one run           │
//! │    ├─ Program + config                                           │
//! │    ├─ CFG cache              (DashMap, built on rayon)           │
//! │    ├─ CallGraph / Icfg       (built once, shared behind Arc)     │
//! │    ├─ ResultStore            (SkipMap, typed lookups)            │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  AnalysisRegistry            Identifier -> factory closure       │
//! │    └─ AnalysisKind           callgraph, icfg, constprop,         │
//! │                              liveness, inter-constprop           │
//! │                                                                  │
//! │  AnalysisScheduler           Runs a plan in order                │
//! │    ├─ requirement checks     (MissingDependency)                 │
//! │    ├─ start/finish events                                        │
//! │    └─ dumps                  callgraph.dot, icfg.dot, icfg.txt   │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod context;
mod dump;
mod events;
mod registry;
mod scheduler;
mod store;

pub use config::AnalysisConfig;
pub use context::AnalysisContext;
pub use dump::{write_dumps, CALLGRAPH_DOT, ICFG_DOT, ICFG_EDGES};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use registry::{Analysis, AnalysisFactory, AnalysisKind, AnalysisRegistry};
pub use scheduler::AnalysisScheduler;
pub use store::ResultStore;
