//! Configuration for an analysis run.

use std::path::PathBuf;

use crate::analysis::{AnalysisScope, SolverConfig, WorklistOrder};

/// Configuration for an analysis run.
///
/// Controls which functions are analyzed, how the interprocedural solver iterates, whether
/// per-function work runs in parallel, and where debugging dumps go.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Name of the entry function (default: `"main"`).
    pub entry: String,

    /// Functions covered by the call graph and CFG cache (default: reachable only).
    pub scope: AnalysisScope,

    /// Interprocedural solver settings (default: FIFO, unbounded).
    pub solver: SolverConfig,

    /// Build CFGs and run intraprocedural analyses on the rayon pool (default: true).
    pub parallel: bool,

    /// Directory for call graph and ICFG dumps; `None` disables dumping.
    pub dump_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry: "main".to_string(),
            scope: AnalysisScope::Reachable,
            solver: SolverConfig::default(),
            parallel: true,
            dump_dir: None,
        }
    }
}

impl AnalysisConfig {
    /// Sets the entry function name.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Sets the analysis scope.
    #[must_use]
    pub fn with_scope(mut self, scope: AnalysisScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the worklist order of the interprocedural solver.
    #[must_use]
    pub fn with_order(mut self, order: WorklistOrder) -> Self {
        self.solver.order = order;
        self
    }

    /// Bounds the number of node visits of the interprocedural solver.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.solver.max_iterations = Some(max_iterations);
        self
    }

    /// Runs all per-function work on the calling thread.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enables dumps into `dir`.
    #[must_use]
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }
}
