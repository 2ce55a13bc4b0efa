//! The interprocedural control flow graph.

use std::{collections::HashMap, fmt::Write};

use crate::{
    analysis::{
        callgraph::CallSite,
        cfg::{CfgEdgeKind, ControlFlowGraph},
        icfg::{IcfgEdge, IcfgEdgeKind, IcfgNode},
    },
    ir::{FuncId, Program, StmtId},
    utils::{
        graph::{DirectedGraph, EdgeId, GraphBase, NodeId, Predecessors, Successors},
        DotWriter,
    },
    Error, Result,
};

/// Statement-level graph spanning every function whose CFG was available, joined at call
/// sites.
///
/// The node set is the union of the included functions' CFG nodes. Edges are
/// [`IcfgEdge`]s. Once built the ICFG is immutable and shared read-only.
#[derive(Debug, Default)]
pub struct Icfg {
    graph: DirectedGraph<IcfgNode, IcfgEdge>,
    index: HashMap<IcfgNode, NodeId>,
    functions: Vec<FuncId>,
    call_sites: HashMap<NodeId, CallSite>,
    entry: Option<NodeId>,
}

impl Icfg {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds every node of `cfg`. Statement nodes for which `is_call` holds are recorded as
    /// call sites.
    pub(crate) fn add_function(
        &mut self,
        cfg: &ControlFlowGraph,
        is_call: impl Fn(StmtId) -> bool,
    ) {
        let func = cfg.func();
        for (_, node) in cfg.nodes() {
            let icfg_node = IcfgNode { func, node };
            let id = self.graph.add_node(icfg_node);
            self.index.insert(icfg_node, id);
            if let Some(stmt) = node.stmt() {
                if is_call(stmt) {
                    self.call_sites.insert(id, CallSite::new(func, stmt));
                }
            }
        }
        self.functions.push(func);
    }

    pub(crate) fn set_entry(&mut self, node: NodeId) {
        self.entry = Some(node);
    }

    /// Connects two existing nodes.
    pub(crate) fn connect(
        &mut self,
        source: IcfgNode,
        target: IcfgNode,
        edge: IcfgEdge,
    ) -> Result<EdgeId> {
        let src = self
            .node_id(source)
            .ok_or_else(|| Error::GraphError(format!("{source} is not an ICFG node")))?;
        let dst = self
            .node_id(target)
            .ok_or_else(|| Error::GraphError(format!("{target} is not an ICFG node")))?;
        self.graph.add_edge(src, dst, edge)
    }

    /// The entry node of the entry function, if that function's CFG was available.
    #[must_use]
    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    /// Functions included in the graph, in insertion order.
    #[must_use]
    pub fn functions(&self) -> &[FuncId] {
        &self.functions
    }

    /// Returns `true` if `func`'s CFG is part of the graph.
    #[must_use]
    pub fn contains_function(&self, func: FuncId) -> bool {
        self.functions.contains(&func)
    }

    /// The node behind `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&IcfgNode> {
        self.graph.node(id)
    }

    /// The id of `node`, if present.
    #[must_use]
    pub fn node_id(&self, node: IcfgNode) -> Option<NodeId> {
        self.index.get(&node).copied()
    }

    /// Entry node id of `func`.
    #[must_use]
    pub fn entry_of(&self, func: FuncId) -> Option<NodeId> {
        self.node_id(IcfgNode::entry(func))
    }

    /// Exit node id of `func`.
    #[must_use]
    pub fn exit_of(&self, func: FuncId) -> Option<NodeId> {
        self.node_id(IcfgNode::exit(func))
    }

    /// The call site at `id`, if the node is a call statement.
    #[must_use]
    pub fn call_site_at(&self, id: NodeId) -> Option<CallSite> {
        self.call_sites.get(&id).copied()
    }

    /// `(id, node)` pairs in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &IcfgNode)> {
        self.graph.nodes()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Successors of `id` over every edge kind.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(id)
    }

    /// Predecessors of `id` over every edge kind.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(id)
    }

    /// `(source, edge)` for each edge into `id`.
    pub fn incoming_edges(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &IcfgEdge)> {
        self.graph
            .incoming_edges(id)
            .map(|(_, source, edge)| (source, edge))
    }

    /// `(target, edge)` for each edge out of `id`.
    pub fn outgoing_edges(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &IcfgEdge)> {
        self.graph
            .outgoing_edges(id)
            .map(|(_, target, edge)| (target, edge))
    }

    /// `(source, target, edge)` for every edge in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &IcfgEdge)> {
        self.graph
            .edges()
            .map(|(_, source, target, edge)| (source, target, edge))
    }

    /// Edges of one kind.
    pub fn edges_of_kind(
        &self,
        kind: IcfgEdgeKind,
    ) -> impl Iterator<Item = (NodeId, NodeId, &IcfgEdge)> {
        self.edges().filter(move |(_, _, edge)| edge.kind() == kind)
    }

    /// Number of edges of one kind.
    #[must_use]
    pub fn count_kind(&self, kind: IcfgEdgeKind) -> usize {
        self.edges_of_kind(kind).count()
    }

    fn describe(&self, program: &Program, id: NodeId) -> String {
        self.node(id).map_or_else(
            || id.to_string(),
            |n| format!("{}:{}", program.function_name(n.func), n.node),
        )
    }

    fn describe_edge(&self, program: &Program, edge: &IcfgEdge) -> String {
        match edge {
            IcfgEdge::Normal { kind } => kind.to_string(),
            IcfgEdge::CallToReturn { call_site } => {
                format!("call-to-return {}", program.function_name(call_site.caller))
            }
            IcfgEdge::Call { callee, .. } => format!("call {}", program.function_name(*callee)),
            IcfgEdge::Return {
                callee,
                return_vars,
                ..
            } => {
                let names: Vec<String> = match program.function(*callee) {
                    Some(f) => return_vars.iter().map(|&v| f.var_name(v)).collect(),
                    None => return_vars.iter().map(ToString::to_string).collect(),
                };
                format!("return {{{}}}", names.join(", "))
            }
        }
    }

    /// One line per edge: `Kind source -> target [details]`, in insertion order.
    #[must_use]
    pub fn edge_listing(&self, program: &Program) -> String {
        let mut out = String::new();
        for (source, target, edge) in self.edges() {
            let _ = write!(
                out,
                "{} {} -> {}",
                edge.kind(),
                self.describe(program, source),
                self.describe(program, target)
            );
            match edge {
                IcfgEdge::Normal { kind } if *kind != CfgEdgeKind::Normal => {
                    let _ = write!(out, " [{kind}]");
                }
                IcfgEdge::Return { .. } => {
                    let _ = write!(out, " [{}]", self.describe_edge(program, edge));
                }
                _ => {}
            }
            out.push('\n');
        }
        out
    }

    /// Renders the ICFG in DOT, one cluster per function. Call and return edges are dashed.
    #[must_use]
    pub fn to_dot(&self, program: &Program) -> String {
        let mut dot = DotWriter::new("ICFG", "ICFG");

        for &func in &self.functions {
            dot.begin_cluster(&func.to_string(), &program.function_name(func));
            for (id, node) in self.nodes().filter(|(_, n)| n.func == func) {
                let label = match node.node.stmt() {
                    Some(stmt) => format!("{stmt}: {}", program.render_stmt(func, stmt)),
                    None => node.node.to_string(),
                };
                dot.node(&format!("n{}", id.index()), &label, &[]);
            }
            dot.end_cluster();
        }

        for (source, target, edge) in self.edges() {
            let style = if edge.is_interprocedural() { "dashed" } else { "solid" };
            let label = match edge {
                IcfgEdge::Normal { kind: CfgEdgeKind::Normal } => String::new(),
                other => self.describe_edge(program, other),
            };
            dot.edge(
                &format!("n{}", source.index()),
                &format!("n{}", target.index()),
                &label,
                &[("style", style)],
            );
        }

        dot.finish()
    }
}

impl GraphBase for Icfg {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.graph.node_count()).map(NodeId::new)
    }
}

impl Successors for Icfg {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for Icfg {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}
