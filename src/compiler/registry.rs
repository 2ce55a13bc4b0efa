//! Analyses addressable by identifier.
//!
//! The [`AnalysisRegistry`] maps identifiers to factory closures, so a plan can name its
//! analyses as strings and have them instantiated late. The built-in analyses are
//! enumerated by [`AnalysisKind`].

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    analysis::{
        dataflow::{ConstFact, ConstantPropagation, LiveVariables},
        DataflowResult, Icfg, InterConstantPropagation, InterproceduralSolver,
    },
    compiler::{context::AnalysisContext, events::EventKind},
    Error, Result,
};

/// A unit of work the scheduler can run against an [`AnalysisContext`].
///
/// An analysis publishes its result into
/// [`AnalysisContext::results`](AnalysisContext::results) under its identifier.
pub trait Analysis: Send + Sync {
    /// Identifier the result is published under.
    fn id(&self) -> &str;

    /// Identifiers whose results must be published before this analysis runs.
    fn requires(&self) -> &[&'static str] {
        &[]
    }

    /// Runs the analysis and publishes its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the analysis cannot produce a sound result.
    fn run(&self, ctx: &AnalysisContext) -> Result<()>;
}

/// Creates a fresh analysis instance.
pub type AnalysisFactory = Box<dyn Fn() -> Box<dyn Analysis> + Send + Sync>;

/// The built-in analyses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    IntoStaticStr,
    EnumString,
    EnumIter,
)]
pub enum AnalysisKind {
    /// Publishes the call graph ([`CallGraph`](crate::analysis::CallGraph))
    #[strum(serialize = "callgraph")]
    CallGraph,
    /// Builds missing CFGs and publishes the ICFG ([`Icfg`])
    #[strum(serialize = "icfg")]
    Icfg,
    /// Intraprocedural constant propagation per function
    #[strum(serialize = "constprop")]
    ConstProp,
    /// Intraprocedural liveness per function
    #[strum(serialize = "liveness")]
    Liveness,
    /// Interprocedural constant propagation ([`DataflowResult<ConstFact>`])
    #[strum(serialize = "inter-constprop")]
    InterConstProp,
}

impl AnalysisKind {
    /// The identifier this analysis is registered and published under.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// A fresh instance of the analysis.
    #[must_use]
    pub fn create(self) -> Box<dyn Analysis> {
        match self {
            AnalysisKind::CallGraph => Box::new(CallGraphAnalysis),
            AnalysisKind::Icfg => Box::new(IcfgAnalysis),
            AnalysisKind::ConstProp => Box::new(ConstPropAnalysis),
            AnalysisKind::Liveness => Box::new(LivenessAnalysis),
            AnalysisKind::InterConstProp => Box::new(InterConstPropAnalysis),
        }
    }

    /// Built-in identifiers in dependency order.
    #[must_use]
    pub fn default_plan() -> Vec<String> {
        AnalysisKind::iter().map(|kind| kind.id().to_string()).collect()
    }
}

struct CallGraphAnalysis;

impl Analysis for CallGraphAnalysis {
    fn id(&self) -> &str {
        AnalysisKind::CallGraph.id()
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<()> {
        ctx.results.insert_arc(self.id(), ctx.call_graph());
        Ok(())
    }
}

struct IcfgAnalysis;

impl Analysis for IcfgAnalysis {
    fn id(&self) -> &str {
        AnalysisKind::Icfg.id()
    }

    fn requires(&self) -> &[&'static str] {
        &["callgraph"]
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<()> {
        ctx.build_cfgs()?;
        ctx.results.insert_arc(self.id(), ctx.icfg()?);
        Ok(())
    }
}

struct ConstPropAnalysis;

impl Analysis for ConstPropAnalysis {
    fn id(&self) -> &str {
        AnalysisKind::ConstProp.id()
    }

    fn requires(&self) -> &[&'static str] {
        &["callgraph"]
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<()> {
        ctx.build_cfgs()?;
        let results = ctx.run_intraprocedural(ConstantPropagation::analyze);
        ctx.results.insert(self.id(), results);
        Ok(())
    }
}

struct LivenessAnalysis;

impl Analysis for LivenessAnalysis {
    fn id(&self) -> &str {
        AnalysisKind::Liveness.id()
    }

    fn requires(&self) -> &[&'static str] {
        &["callgraph"]
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<()> {
        ctx.build_cfgs()?;
        let results = ctx.run_intraprocedural(LiveVariables::analyze);
        ctx.results.insert(self.id(), results);
        Ok(())
    }
}

struct InterConstPropAnalysis;

impl Analysis for InterConstPropAnalysis {
    fn id(&self) -> &str {
        AnalysisKind::InterConstProp.id()
    }

    fn requires(&self) -> &[&'static str] {
        &["icfg"]
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<()> {
        let icfg = ctx
            .results
            .get::<Icfg>(AnalysisKind::Icfg.id())?
            .ok_or_else(|| Error::MissingDependency {
                analysis: self.id().to_string(),
                requires: AnalysisKind::Icfg.id().to_string(),
            })?;

        let analysis = InterConstantPropagation::new(ctx.program());
        let result: DataflowResult<ConstFact> =
            InterproceduralSolver::new(ctx.config.solver).solve(&analysis, &icfg)?;
        ctx.events
            .record(EventKind::FixpointReached)
            .analysis(self.id())
            .message(format!(
                "{} nodes after {} iterations",
                result.node_count(),
                result.iterations()
            ));
        ctx.results.insert(self.id(), result);
        Ok(())
    }
}

/// Identifier to factory map.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = AnalysisRegistry::with_builtins();
/// registry.register("my-analysis", || Box::new(MyAnalysis));
/// let analysis = registry.create("my-analysis")?;
/// ```
pub struct AnalysisRegistry {
    factories: BTreeMap<String, AnalysisFactory>,
}

impl AnalysisRegistry {
    /// A registry without any analyses.
    #[must_use]
    pub fn new() -> Self {
        AnalysisRegistry {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with every [`AnalysisKind`].
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in AnalysisKind::iter() {
            registry.register(kind.id(), move || kind.create());
        }
        registry
    }

    /// Registers `factory` under `id`, replacing any previous registration.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Analysis> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Instantiates the analysis registered under `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAnalysis`] if nothing is registered under `id`
    /// - [`Error::IdentifierMismatch`] if the instance declares a different identifier
    pub fn create(&self, id: &str) -> Result<Box<dyn Analysis>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| Error::UnknownAnalysis(id.to_string()))?;
        let analysis = factory();
        if analysis.id() != id {
            return Err(Error::IdentifierMismatch {
                registered: id.to_string(),
                declared: analysis.id().to_string(),
            });
        }
        Ok(analysis)
    }

    /// Returns `true` if something is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in lexicographic order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Requirements of every registered analysis, for plan validation.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`create`](Self::create).
    pub fn requirements(&self) -> Result<HashMap<String, Vec<&'static str>>> {
        self.factories
            .keys()
            .map(|id| Ok((id.clone(), self.create(id)?.requires().to_vec())))
            .collect()
    }
}

impl Default for AnalysisRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for AnalysisRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
