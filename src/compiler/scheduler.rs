//! Plan scheduler for orchestrating analysis execution.
//!
//! The [`AnalysisScheduler`] runs a plan (an ordered list of analysis identifiers) against
//! an [`AnalysisContext`]. Each analysis is instantiated from the registry, its declared
//! requirements are checked against the result store, and its start and completion are
//! recorded as events. Dumps are written once the plan has finished.

use std::time::Instant;

use crate::{
    compiler::{
        context::AnalysisContext,
        dump::write_dumps,
        events::EventKind,
        registry::{AnalysisKind, AnalysisRegistry},
    },
    Error, Result,
};

/// Runs analysis plans.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = AnalysisContext::new(program, AnalysisConfig::default())?;
/// let scheduler = AnalysisScheduler::default();
/// scheduler.run(&ctx)?;
/// let consts = ctx.results.get::<DataflowResult<ConstFact>>("inter-constprop")?;
/// ```
#[derive(Debug)]
pub struct AnalysisScheduler {
    registry: AnalysisRegistry,
    plan: Vec<String>,
}

impl Default for AnalysisScheduler {
    fn default() -> Self {
        Self::new(AnalysisRegistry::with_builtins())
    }
}

impl AnalysisScheduler {
    /// Creates a scheduler running [`AnalysisKind::default_plan`] from `registry`.
    #[must_use]
    pub fn new(registry: AnalysisRegistry) -> Self {
        Self {
            registry,
            plan: AnalysisKind::default_plan(),
        }
    }

    /// Replaces the plan.
    #[must_use]
    pub fn with_plan<I, S>(mut self, plan: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plan = plan.into_iter().map(Into::into).collect();
        self
    }

    /// The identifiers run by [`run`](Self::run), in order.
    #[must_use]
    pub fn plan(&self) -> &[String] {
        &self.plan
    }

    /// The registry analyses are instantiated from.
    #[must_use]
    pub fn registry(&self) -> &AnalysisRegistry {
        &self.registry
    }

    /// Runs every analysis of the plan in order, then writes dumps if a dump directory is
    /// configured.
    ///
    /// Returns the number of analyses run.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAnalysis`] / [`Error::IdentifierMismatch`] from the registry
    /// - [`Error::MissingDependency`] if an analysis runs before a result it requires
    /// - any error returned by an analysis or by dumping
    pub fn run(&self, ctx: &AnalysisContext) -> Result<usize> {
        let started = Instant::now();

        for id in &self.plan {
            let analysis = self.registry.create(id)?;
            if let Some(missing) = analysis
                .requires()
                .iter()
                .find(|required| !ctx.results.contains(required))
            {
                ctx.events
                    .record(EventKind::Error)
                    .analysis(id.as_str())
                    .message(format!("{id} requires {missing}, which has not been run"));
                return Err(Error::MissingDependency {
                    analysis: id.clone(),
                    requires: (*missing).to_string(),
                });
            }

            ctx.events
                .record(EventKind::AnalysisStarted)
                .analysis(id.as_str());
            let analysis_started = Instant::now();
            analysis.run(ctx)?;
            ctx.events
                .record(EventKind::AnalysisCompleted)
                .analysis(id.as_str())
                .message(format!(
                    "{id} completed in {:.2?}",
                    analysis_started.elapsed()
                ));
        }

        if let Some(dir) = &ctx.config.dump_dir {
            write_dumps(ctx, dir)?;
        }

        tracing::info!(
            analyses = self.plan.len(),
            elapsed = ?started.elapsed(),
            summary = %ctx.events.summary(),
            "analysis plan finished"
        );
        Ok(self.plan.len())
    }
}
