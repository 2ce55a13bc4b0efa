//! The explicit context object of an analysis run.
//!
//! [`AnalysisContext`] owns everything an analysis needs: the program, the configuration,
//! the per-function CFG cache, the published call graph and ICFG, the result store and the
//! event log. It is passed by reference into every builder and analysis; there is no global
//! state, so several contexts can be analyzed side by side.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use dashmap::{DashMap, DashSet};
use rayon::prelude::*;

use crate::{
    analysis::{
        CallGraph, CallGraphBuilder, CfgProvider, ControlFlowGraph, Icfg, IcfgBuilder,
    },
    compiler::{
        config::AnalysisConfig,
        events::{EventKind, EventLog},
        store::ResultStore,
    },
    ir::{FuncId, Function, Program},
    Error, Result,
};

/// Shared state of one analysis run.
///
/// CFGs are cached in a `DashMap` so they can be built on the rayon pool. The call graph and
/// ICFG are each built once, on first use, and then shared read-only behind `Arc`.
pub struct AnalysisContext {
    program: Arc<Program>,

    entry: FuncId,

    /// Run configuration.
    pub config: AnalysisConfig,

    /// Per-function CFGs. A function without an entry is treated as unavailable.
    cfgs: DashMap<FuncId, Arc<ControlFlowGraph>>,

    /// Functions whose CFG was removed; never rebuilt by `build_cfgs`.
    withheld: DashSet<FuncId>,

    call_graph: OnceLock<Arc<CallGraph>>,

    icfg: OnceLock<Arc<Icfg>>,

    /// Held across the whole ICFG build so concurrent callers build and report once.
    icfg_build: Mutex<()>,

    /// Results published by analyses, by identifier.
    pub results: ResultStore,

    /// Events recorded during the run.
    pub events: EventLog,
}

impl AnalysisContext {
    /// Creates a context for `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFunction`] if the configured entry function does not exist.
    pub fn new(program: impl Into<Arc<Program>>, config: AnalysisConfig) -> Result<Self> {
        let program = program.into();
        let entry = program
            .function_by_name(&config.entry)
            .ok_or_else(|| Error::UnknownFunction(config.entry.clone()))?;

        Ok(Self {
            program,
            entry,
            config,
            cfgs: DashMap::new(),
            withheld: DashSet::new(),
            call_graph: OnceLock::new(),
            icfg: OnceLock::new(),
            icfg_build: Mutex::new(()),
            results: ResultStore::new(),
            events: EventLog::new(),
        })
    }

    /// The analyzed program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The entry function.
    #[must_use]
    pub fn entry(&self) -> FuncId {
        self.entry
    }

    /// The call graph, built from the entry function on first use.
    pub fn call_graph(&self) -> Arc<CallGraph> {
        Arc::clone(self.call_graph.get_or_init(|| {
            let cg = CallGraphBuilder::new(&self.program)
                .with_scope(self.config.scope)
                .build(self.entry);
            let stats = cg.stats();
            self.events.record(EventKind::CallGraphBuilt).message(format!(
                "call graph: {} functions, {} call sites, {} edges",
                stats.function_count, stats.call_site_count, stats.edge_count
            ));
            Arc::new(cg)
        }))
    }

    /// Builds and caches the CFG of every function in scope that is neither cached nor
    /// withheld.
    ///
    /// Returns the number of CFGs built.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`ControlFlowGraph::build`].
    pub fn build_cfgs(&self) -> Result<usize> {
        let call_graph = self.call_graph();
        let pending: Vec<&Function> = call_graph
            .reachable_functions()
            .iter()
            .filter(|&&func| !self.cfgs.contains_key(&func) && !self.withheld.contains(&func))
            .filter_map(|&func| self.program.function(func))
            .collect();

        let build = |function: &Function| -> Result<()> {
            let cfg = ControlFlowGraph::build(function)?;
            self.events
                .record(EventKind::CfgBuilt)
                .function(function.id())
                .message(format!(
                    "{}: {} nodes, {} edges",
                    function.name(),
                    cfg.node_count(),
                    cfg.edge_count()
                ));
            self.cfgs.insert(function.id(), Arc::new(cfg));
            Ok(())
        };

        if self.config.parallel {
            pending.par_iter().try_for_each(|function| build(*function))?;
        } else {
            pending.iter().try_for_each(|function| build(*function))?;
        }
        Ok(pending.len())
    }

    /// Caches a CFG, replacing any previous one for the same function.
    pub fn insert_cfg(&self, cfg: ControlFlowGraph) {
        self.withheld.remove(&cfg.func());
        self.cfgs.insert(cfg.func(), Arc::new(cfg));
    }

    /// Withholds the CFG of `func`, making it unavailable to later builders until a CFG is
    /// inserted again.
    pub fn remove_cfg(&self, func: FuncId) -> Option<Arc<ControlFlowGraph>> {
        self.withheld.insert(func);
        self.cfgs.remove(&func).map(|(_, cfg)| cfg)
    }

    /// Number of cached CFGs.
    #[must_use]
    pub fn cfg_count(&self) -> usize {
        self.cfgs.len()
    }

    /// The ICFG over the call graph and the cached CFGs, built on first use.
    ///
    /// Concurrent first callers wait for a single build, so omissions are reported once.
    ///
    /// CFGs are not built implicitly; call [`build_cfgs`](Self::build_cfgs) first. Functions
    /// without a cached CFG are omitted and reported in [`events`](Self::events).
    ///
    /// # Errors
    ///
    /// Returns an error if the ICFG cannot be assembled from the cached CFGs.
    pub fn icfg(&self) -> Result<Arc<Icfg>> {
        if let Some(icfg) = self.icfg.get() {
            return Ok(Arc::clone(icfg));
        }

        let _guard = self
            .icfg_build
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(icfg) = self.icfg.get() {
            return Ok(Arc::clone(icfg));
        }
        let call_graph = self.call_graph();
        let icfg = IcfgBuilder::new(&self.program, self)
            .with_events(&self.events)
            .build(&call_graph)?;
        Ok(Arc::clone(self.icfg.get_or_init(|| Arc::new(icfg))))
    }

    /// Drops the published call graph and ICFG so the next access rebuilds them.
    pub fn invalidate_graphs(&mut self) {
        self.call_graph.take();
        self.icfg.take();
    }

    /// Runs `analyze` on every function with a cached CFG, in parallel when configured.
    ///
    /// Each call owns its facts; only the program and CFG are shared.
    pub fn run_intraprocedural<T, F>(&self, analyze: F) -> BTreeMap<FuncId, T>
    where
        T: Send,
        F: Fn(&Function, &ControlFlowGraph) -> T + Sync,
    {
        let work: Vec<(&Function, Arc<ControlFlowGraph>)> = self
            .call_graph()
            .reachable_functions()
            .iter()
            .filter_map(|&func| Some((self.program.function(func)?, self.cfg(func)?)))
            .collect();

        if self.config.parallel {
            work.into_par_iter()
                .map(|(function, cfg)| (function.id(), analyze(function, &cfg)))
                .collect()
        } else {
            work.into_iter()
                .map(|(function, cfg)| (function.id(), analyze(function, &cfg)))
                .collect()
        }
    }
}

impl CfgProvider for AnalysisContext {
    fn cfg(&self, func: FuncId) -> Option<Arc<ControlFlowGraph>> {
        self.cfgs.get(&func).map(|cfg| Arc::clone(cfg.value()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use super::*;
    use crate::{
        analysis::{dataflow::LiveVariables, AnalysisScope, IcfgEdgeKind},
        test::factories::{add_program, pick_program},
    };

    #[test]
    fn unknown_entry_is_rejected() {
        let (program, _) = add_program();
        let config = AnalysisConfig::default().with_entry("start");
        assert!(matches!(
            AnalysisContext::new(program, config),
            Err(Error::UnknownFunction(name)) if name == "start"
        ));
    }

    #[test]
    fn cfgs_follow_scope() {
        let (program, _) = pick_program();
        let ctx = AnalysisContext::new(program.clone(), AnalysisConfig::default()).unwrap();
        assert_eq!(ctx.build_cfgs().unwrap(), 2);
        assert_eq!(ctx.build_cfgs().unwrap(), 0);

        let config = AnalysisConfig::default()
            .with_scope(AnalysisScope::All)
            .sequential();
        let ctx = AnalysisContext::new(program, config).unwrap();
        assert_eq!(ctx.build_cfgs().unwrap(), 3);
        assert_eq!(ctx.events.count_kind(EventKind::CfgBuilt), 3);
    }

    #[test]
    fn graphs_are_published_once() {
        let (program, _) = add_program();
        let ctx = AnalysisContext::new(program, AnalysisConfig::default()).unwrap();
        ctx.build_cfgs().unwrap();

        let first = ctx.icfg().unwrap();
        let second = ctx.icfg().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&ctx.call_graph(), &ctx.call_graph()));
        assert_eq!(ctx.events.count_kind(EventKind::CallGraphBuilt), 1);
        assert_eq!(ctx.events.count_kind(EventKind::IcfgBuilt), 1);
    }

    #[test]
    fn withheld_cfg_is_omitted_from_icfg() {
        let (program, ids) = add_program();
        let mut ctx = AnalysisContext::new(program, AnalysisConfig::default()).unwrap();
        ctx.build_cfgs().unwrap();
        assert_eq!(ctx.icfg().unwrap().count_kind(IcfgEdgeKind::Call), 1);

        assert!(ctx.remove_cfg(ids.add).is_some());
        assert_eq!(ctx.build_cfgs().unwrap(), 0);
        ctx.invalidate_graphs();
        let icfg = ctx.icfg().unwrap();
        assert!(!icfg.contains_function(ids.add));
        assert_eq!(ctx.events.omissions().count(), 2);
    }

    #[test]
    fn concurrent_icfg_requests_build_once() {
        for _ in 0..50 {
            let (program, ids) = add_program();
            let ctx = AnalysisContext::new(program, AnalysisConfig::default()).unwrap();
            ctx.build_cfgs().unwrap();
            ctx.remove_cfg(ids.add);

            let barrier = Barrier::new(8);
            let icfgs: Vec<Arc<Icfg>> = thread::scope(|scope| {
                let handles: Vec<_> = (0..8)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            ctx.icfg().unwrap()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            assert!(icfgs.iter().all(|icfg| Arc::ptr_eq(icfg, &icfgs[0])));
            assert_eq!(ctx.events.count_kind(EventKind::IcfgBuilt), 1);
            assert_eq!(ctx.events.count_kind(EventKind::CfgUnavailable), 1);
            assert_eq!(ctx.events.count_kind(EventKind::CallEdgesOmitted), 1);
        }
    }

    #[test]
    fn intraprocedural_runs_per_function() {
        let (program, ids) = pick_program();
        let ctx = AnalysisContext::new(program, AnalysisConfig::default()).unwrap();
        ctx.build_cfgs().unwrap();

        let live = ctx.run_intraprocedural(LiveVariables::analyze);
        assert_eq!(live.len(), 2);
        assert!(live.contains_key(&ids.main));
        assert!(live.contains_key(&ids.pick));
        assert!(!live.contains_key(&ids.dead));
    }
}
