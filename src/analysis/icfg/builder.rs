//! Stitching per-function CFGs into an ICFG.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    analysis::{
        callgraph::CallGraph,
        cfg::{CfgEdgeKind, CfgNode, CfgProvider, ControlFlowGraph},
        icfg::{Icfg, IcfgEdge, IcfgNode},
    },
    compiler::{EventKind, EventLog},
    ir::{FuncId, Program, Stmt, StmtId, VarId},
    utils::graph::NodeId,
    Error, Result,
};

/// Builds an [`Icfg`] from a [`CallGraph`] and per-function CFGs.
///
/// CFGs are obtained from a [`CfgProvider`]. A reachable function without a CFG is left out
/// of the graph together with the call and return edges of every call site targeting it.
/// Each such omission is recorded once, as [`EventKind::CfgUnavailable`] for the function
/// and [`EventKind::CallEdgesOmitted`] for the call site, and the build carries on.
pub struct IcfgBuilder<'a> {
    program: &'a Program,
    cfgs: &'a dyn CfgProvider,
    events: Option<&'a EventLog>,
}

impl<'a> IcfgBuilder<'a> {
    /// Creates a builder reading CFGs from `cfgs`.
    #[must_use]
    pub fn new(program: &'a Program, cfgs: &'a dyn CfgProvider) -> Self {
        IcfgBuilder {
            program,
            cfgs,
            events: None,
        }
    }

    /// Records omissions in `events` in addition to logging them.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    fn omission(&self, kind: EventKind, func: FuncId, message: String) -> OmissionRecord<'_> {
        OmissionRecord {
            log: self.events,
            kind,
            func,
            stmt: None,
            message,
        }
    }

    /// Builds the ICFG for every reachable function of `cg`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if a CFG refers to statements the program does not
    /// contain. Unavailable CFGs are not errors.
    pub fn build(&self, cg: &CallGraph) -> Result<Icfg> {
        let mut icfg = Icfg::new();
        let mut available: HashMap<FuncId, Arc<ControlFlowGraph>> = HashMap::new();

        for &func in cg.reachable_functions() {
            match self.cfgs.cfg(func) {
                Some(cfg) => {
                    let function = self.program.function(func).ok_or_else(|| {
                        Error::GraphError(format!("{func} is not part of the program"))
                    })?;
                    icfg.add_function(&cfg, |stmt| {
                        function.stmt(stmt).is_some_and(Stmt::is_call)
                    });
                    available.insert(func, cfg);
                }
                None => {
                    self.omission(
                        EventKind::CfgUnavailable,
                        func,
                        format!(
                            "{}: CFG unavailable, function left out of the ICFG",
                            self.program.function_name(func)
                        ),
                    )
                    .emit();
                }
            }
        }

        if let Some(&entry) = cg.entry_functions().first() {
            if let Some(node) = icfg.entry_of(entry) {
                icfg.set_entry(node);
            }
        }

        let mut return_vars_cache: HashMap<FuncId, BTreeSet<VarId>> = HashMap::new();

        for &func in cg.reachable_functions() {
            let Some(cfg) = available.get(&func) else {
                continue;
            };

            for (source, target, kind) in cfg.edges() {
                let (src, dst) = (self.qualify(cfg, source)?, self.qualify(cfg, target)?);
                let edge = match icfg.node_id(src).and_then(|id| icfg.call_site_at(id)) {
                    Some(call_site) => IcfgEdge::CallToReturn { call_site },
                    None => IcfgEdge::Normal { kind },
                };
                icfg.connect(src, dst, edge)?;
            }

            for &call_site in cg.call_sites_in(func) {
                let Some(callee) = cg.callee_of(call_site) else {
                    tracing::warn!(%call_site, "call site without resolved callee");
                    continue;
                };
                let Some(callee_cfg) = available.get(&callee) else {
                    let mut record = self.omission(
                        EventKind::CallEdgesOmitted,
                        func,
                        format!(
                            "{}: call to {} has no call/return edges, callee CFG unavailable",
                            self.program.function_name(func),
                            self.program.function_name(callee)
                        ),
                    );
                    record.stmt = Some(call_site.stmt);
                    record.emit();
                    continue;
                };

                let site_node = IcfgNode::stmt(func, call_site.stmt);
                icfg.connect(
                    site_node,
                    IcfgNode::entry(callee),
                    IcfgEdge::Call { call_site, callee },
                )?;

                let return_vars = match return_vars_cache.get(&callee) {
                    Some(vars) => vars.clone(),
                    None => {
                        let vars = self.return_vars(callee, callee_cfg);
                        return_vars_cache.insert(callee, vars.clone());
                        vars
                    }
                };

                let site_id = cfg.node_id(CfgNode::Stmt(call_site.stmt)).ok_or_else(|| {
                    Error::GraphError(format!("{call_site} is not a node of its CFG"))
                })?;
                for return_site in cfg.successors(site_id) {
                    let return_site = self.qualify(cfg, return_site)?;
                    icfg.connect(
                        IcfgNode::exit(callee),
                        return_site,
                        IcfgEdge::Return {
                            call_site,
                            callee,
                            return_vars: return_vars.clone(),
                        },
                    )?;
                }
            }
        }

        if let Some(events) = self.events {
            events.record(EventKind::IcfgBuilt).message(format!(
                "ICFG: {} functions, {} nodes, {} edges",
                icfg.functions().len(),
                icfg.node_count(),
                icfg.edge_count()
            ));
        }
        tracing::debug!(
            functions = icfg.functions().len(),
            nodes = icfg.node_count(),
            edges = icfg.edge_count(),
            "icfg built"
        );
        Ok(icfg)
    }

    fn qualify(&self, cfg: &ControlFlowGraph, node: NodeId) -> Result<IcfgNode> {
        cfg.node(node)
            .map(|node| IcfgNode {
                func: cfg.func(),
                node,
            })
            .ok_or_else(|| Error::GraphError(format!("{node} is not a node of {}", cfg.func())))
    }

    /// Variables returned by `callee`, collected from the genuine `return` edges into its
    /// exit. Falling off the end contributes nothing, nor does `return;`.
    fn return_vars(&self, callee: FuncId, cfg: &ControlFlowGraph) -> BTreeSet<VarId> {
        let Some(function) = self.program.function(callee) else {
            return BTreeSet::new();
        };
        cfg.incoming_edges(cfg.exit())
            .filter(|&(_, kind)| kind == CfgEdgeKind::Return)
            .filter_map(|(source, _)| cfg.node(source).and_then(CfgNode::stmt))
            .filter_map(|stmt| match function.stmt(stmt) {
                Some(Stmt::Return { value }) => *value,
                _ => None,
            })
            .collect()
    }
}

struct OmissionRecord<'a> {
    log: Option<&'a EventLog>,
    kind: EventKind,
    func: FuncId,
    stmt: Option<StmtId>,
    message: String,
}

impl OmissionRecord<'_> {
    fn emit(self) {
        match (self.log, self.stmt) {
            (Some(log), Some(stmt)) => {
                log.record(self.kind)
                    .at(self.func, stmt)
                    .analysis("icfg")
                    .message(self.message);
            }
            (Some(log), None) => {
                log.record(self.kind)
                    .function(self.func)
                    .analysis("icfg")
                    .message(self.message);
            }
            (None, _) => tracing::warn!(kind = %self.kind, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{
        analysis::{callgraph::CallGraphBuilder, icfg::IcfgEdgeKind},
        test::factories::{add_program, cfgs, pick_program, recursive_program},
    };

    #[test]
    fn add_program_edges() {
        let (program, ids) = add_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        assert_eq!(icfg.functions().len(), 2);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Call), 1);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::CallToReturn), 1);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Return), 1);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Normal), 5);
        assert_eq!(icfg.entry(), icfg.entry_of(ids.main));

        let t0 = program.function(ids.add).unwrap().var_by_name("t0").unwrap();
        let (src, dst, edge) = icfg.edges_of_kind(IcfgEdgeKind::Return).next().unwrap();
        assert_eq!(icfg.node(src), Some(&IcfgNode::exit(ids.add)));
        let site = program.function(ids.main).unwrap().layout()[0];
        let ret = program.function(ids.main).unwrap().layout()[1];
        assert_eq!(icfg.node(dst), Some(&IcfgNode::stmt(ids.main, ret)));
        match edge {
            IcfgEdge::Return {
                call_site,
                callee,
                return_vars,
            } => {
                assert_eq!(call_site.stmt, site);
                assert_eq!(*callee, ids.add);
                assert_eq!(return_vars, &BTreeSet::from([t0]));
            }
            other => panic!("expected a return edge, got {other:?}"),
        }
    }

    #[test]
    fn call_site_node_has_no_normal_successor() {
        let (program, ids) = add_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        let site = program.function(ids.main).unwrap().layout()[0];
        let node = icfg.node_id(IcfgNode::stmt(ids.main, site)).unwrap();
        let kinds: Vec<_> = icfg
            .outgoing_edges(node)
            .map(|(_, edge)| edge.kind())
            .collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&IcfgEdgeKind::Call));
        assert!(kinds.contains(&IcfgEdgeKind::CallToReturn));
    }

    #[test]
    fn multiple_returns_share_return_vars() {
        let (program, ids) = pick_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        assert!(!icfg.contains_function(ids.dead));
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Call), 3);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::CallToReturn), 3);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Return), 3);

        let pick = program.function(ids.pick).unwrap();
        let expected = BTreeSet::from([
            pick.var_by_name("x").unwrap(),
            pick.var_by_name("y").unwrap(),
        ]);
        for (_, _, edge) in icfg.edges_of_kind(IcfgEdgeKind::Return) {
            let IcfgEdge::Return { return_vars, .. } = edge else {
                panic!("expected a return edge");
            };
            assert_eq!(return_vars, &expected);
        }
    }

    #[test]
    fn recursive_call_links_back_to_own_entry() {
        let (program, ids) = recursive_program();
        let cfgs = cfgs(&program);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        let fact_entry = icfg.entry_of(ids.fact).unwrap();
        let callers: BTreeSet<_> = icfg
            .incoming_edges(fact_entry)
            .filter_map(|(_, edge)| edge.call_site())
            .map(|site| site.caller)
            .collect();
        assert_eq!(callers, BTreeSet::from([ids.main, ids.fact]));
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Return), 2);
    }

    #[test]
    fn missing_callee_cfg_is_omitted_and_reported() {
        let (program, ids) = add_program();
        let mut cfgs = cfgs(&program);
        cfgs.remove(&ids.add);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let events = EventLog::new();
        let icfg = IcfgBuilder::new(&program, &cfgs)
            .with_events(&events)
            .build(&cg)
            .unwrap();

        assert!(icfg.contains_function(ids.main));
        assert!(!icfg.contains_function(ids.add));
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Call), 0);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Return), 0);
        assert_eq!(icfg.count_kind(IcfgEdgeKind::CallToReturn), 1);

        assert_eq!(events.omissions().count(), 2);
        assert_eq!(events.count_kind(EventKind::CfgUnavailable), 1);
        assert_eq!(events.count_kind(EventKind::CallEdgesOmitted), 1);
        let omitted = events
            .filter_kind(EventKind::CallEdgesOmitted)
            .next()
            .unwrap();
        assert_eq!(omitted.function, Some(ids.main));
        assert_eq!(
            omitted.location,
            Some(program.function(ids.main).unwrap().layout()[0])
        );
        assert!(events.has(EventKind::IcfgBuilt));
    }

    #[test]
    fn missing_entry_cfg_leaves_no_entry() {
        let (program, ids) = add_program();
        let mut cfgs = cfgs(&program);
        cfgs.remove(&ids.main);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        assert_eq!(icfg.entry(), None);
        assert!(icfg.contains_function(ids.add));
        assert_eq!(icfg.count_kind(IcfgEdgeKind::Call), 0);
    }
}
