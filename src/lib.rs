// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # midend
//!
//! The interprocedural core of a compiler middle-end: call graph construction, an
//! interprocedural control flow graph (ICFG) spanning all reachable functions, and a
//! generic worklist solver that runs dataflow analyses over it.
//!
//! ## Features
//!
//! - **Arena IR** - Statements addressed by generation-checked handles, so jump targets
//!   survive insertion and removal
//! - **Call graph** - Worklist discovery of reachable functions and call-site edges
//! - **ICFG** - Per-statement graph with `Normal`, `CallToReturn`, `Call` and `Return` edges
//! - **Dataflow** - Lattice contract, intraprocedural solver, constant propagation and
//!   liveness
//! - **Interprocedural solver** - Forward worklist fixpoint with configurable ordering
//! - **Driver** - Explicit analysis context, a name-keyed analysis registry, and a
//!   scheduler that runs per-function analyses in parallel
//!
//! ## Quick Start
//!
//! ```rust
//! use midend::prelude::*;
//!
//! let mut builder = ProgramBuilder::new();
//! let main = builder.declare("main", &[], Type::Int);
//! let add = builder.declare("add", &["x", "y"], Type::Int);
//!
//! let mut body = builder.body(main)?;
//! let a = body.local("a");
//! body.call(Some(a), add, vec![Operand::Const(2), Operand::Const(3)]);
//! let ret = body.ret(Some(a));
//! body.finish()?;
//!
//! let mut body = builder.body(add)?;
//! let (x, y) = (body.param(0), body.param(1));
//! body.ret_expr(Expr::binary(BinaryOp::Add, x, y));
//! body.finish()?;
//!
//! let ctx = AnalysisContext::new(builder.build()?, AnalysisConfig::default())?;
//! AnalysisScheduler::default().run(&ctx)?;
//!
//! let result = ctx
//!     .results
//!     .get::<DataflowResult<ConstFact>>("inter-constprop")?
//!     .expect("published by the default plan");
//! let fact = result.fact_before(IcfgNode::stmt(main, ret)).expect("reachable");
//! assert_eq!(fact.get(a), ConstValue::Const(5));
//! # Ok::<(), midend::Error>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`ir`] - Programs, functions, statements and the program builder
//! - [`analysis`] - CFGs, call graph, ICFG, intra- and interprocedural dataflow
//! - [`compiler`] - Analysis context, registry, scheduler, events and dumps
//! - [`utils`] - Graph infrastructure, bit sets and DOT output
//! - [`prelude`] - Common re-exports
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`] with detailed [`Error`] information.
//! Solver invariant violations, such as an edge naming a node outside its graph, panic.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use midend::prelude::*;
///
/// let config = AnalysisConfig::default().with_order(WorklistOrder::Lifo);
/// assert_eq!(config.entry, "main");
/// ```
pub mod prelude;

pub mod analysis;
pub mod compiler;
pub mod ir;
pub mod utils;

/// `midend` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`]. This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `midend` Error type
///
/// The main error type for all operations in this crate. Provides detailed error
/// information for IR validation, graph construction, analysis scheduling and solving.
pub use error::Error;
