//! Statement-level control flow graph of one function.

use std::{
    collections::HashMap,
    sync::OnceLock,
};

use crate::{
    analysis::cfg::{CfgEdgeKind, CfgNode},
    ir::{FuncId, Function, Program, Stmt},
    utils::{
        graph::{
            algorithms, DirectedGraph, GraphBase, NodeId, Predecessors, RootedGraph, Successors,
        },
        DotWriter,
    },
    Result,
};

/// Control flow graph of a single function, one node per statement.
///
/// The graph always contains [`CfgNode::Entry`] and [`CfgNode::Exit`]. Edges are tagged
/// with a [`CfgEdgeKind`]; `Return` edges into `Exit` come from `return` statements only,
/// so consumers can tell genuine returns apart from falling off the end.
///
/// Built once and shared behind an `Arc`; the reverse post-order is computed lazily.
#[derive(Debug)]
pub struct ControlFlowGraph {
    func: FuncId,
    graph: DirectedGraph<CfgNode, CfgEdgeKind>,
    index: HashMap<CfgNode, NodeId>,
    entry: NodeId,
    exit: NodeId,
    rpo: OnceLock<Vec<NodeId>>,
}

impl ControlFlowGraph {
    /// Builds the CFG of `function`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) if a branch or jump targets a
    /// statement that is not in the function layout.
    pub fn build(function: &Function) -> Result<Self> {
        let layout = function.layout();
        let mut graph = DirectedGraph::with_capacity(layout.len() + 2, layout.len() + 2);
        let mut index = HashMap::with_capacity(layout.len() + 2);

        let entry = graph.add_node(CfgNode::Entry);
        index.insert(CfgNode::Entry, entry);
        let mut stmt_nodes = Vec::with_capacity(layout.len());
        for &id in layout {
            let node = graph.add_node(CfgNode::Stmt(id));
            index.insert(CfgNode::Stmt(id), node);
            stmt_nodes.push(node);
        }
        let exit = graph.add_node(CfgNode::Exit);
        index.insert(CfgNode::Exit, exit);

        graph.add_edge(
            entry,
            stmt_nodes.first().copied().unwrap_or(exit),
            CfgEdgeKind::Normal,
        )?;

        for (pos, &id) in layout.iter().enumerate() {
            let node = stmt_nodes[pos];
            let next = stmt_nodes.get(pos + 1).copied().unwrap_or(exit);
            let stmt = function
                .stmt(id)
                .ok_or_else(|| malformed_error!("{}: stale statement {} in layout", function.name(), id))?;

            let resolve = |target| {
                index.get(&CfgNode::Stmt(target)).copied().ok_or_else(|| {
                    malformed_error!("{}: {} targets unknown statement {}", function.name(), id, target)
                })
            };

            match stmt {
                Stmt::Branch { target, .. } => {
                    let taken = resolve(*target)?;
                    graph.add_edge(node, taken, CfgEdgeKind::True)?;
                    graph.add_edge(node, next, CfgEdgeKind::False)?;
                }
                Stmt::Jump { target } => {
                    let taken = resolve(*target)?;
                    graph.add_edge(node, taken, CfgEdgeKind::Normal)?;
                }
                Stmt::Return { .. } => {
                    graph.add_edge(node, exit, CfgEdgeKind::Return)?;
                }
                Stmt::Assign { .. } | Stmt::Call(_) | Stmt::Nop => {
                    graph.add_edge(node, next, CfgEdgeKind::Normal)?;
                }
            }
        }

        Ok(ControlFlowGraph {
            func: function.id(),
            graph,
            index,
            entry,
            exit,
            rpo: OnceLock::new(),
        })
    }

    /// The function this CFG belongs to.
    #[must_use]
    pub const fn func(&self) -> FuncId {
        self.func
    }

    /// The synthetic entry node.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// The synthetic exit node.
    #[must_use]
    pub const fn exit(&self) -> NodeId {
        self.exit
    }

    /// The tag of `node`.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<CfgNode> {
        self.graph.node(node).copied()
    }

    /// The graph node for `node`, if the function has it.
    #[must_use]
    pub fn node_id(&self, node: CfgNode) -> Option<NodeId> {
        self.index.get(&node).copied()
    }

    /// `(id, tag)` for every node, entry first.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, CfgNode)> + '_ {
        self.graph.nodes().map(|(id, node)| (id, *node))
    }

    /// Number of nodes, including `Entry` and `Exit`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Successor nodes of `node`, one per edge.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(node)
    }

    /// Predecessor nodes of `node`, one per edge.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(node)
    }

    /// `(target, kind)` for each outgoing edge of `node`.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, CfgEdgeKind)> + '_ {
        self.graph
            .outgoing_edges(node)
            .map(|(_, target, kind)| (target, *kind))
    }

    /// `(source, kind)` for each incoming edge of `node`.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, CfgEdgeKind)> + '_ {
        self.graph
            .incoming_edges(node)
            .map(|(_, source, kind)| (source, *kind))
    }

    /// `(source, target, kind)` for every edge.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, CfgEdgeKind)> + '_ {
        self.graph
            .edges()
            .map(|(_, source, target, kind)| (source, target, *kind))
    }

    /// Reverse post-order from `Entry`. Unreachable statements are not included.
    pub fn reverse_postorder(&self) -> &[NodeId] {
        self.rpo
            .get_or_init(|| algorithms::reverse_postorder(&self.graph, self.entry))
    }

    /// Renders the CFG in DOT, labelling statements through `program`.
    #[must_use]
    pub fn to_dot(&self, program: &Program) -> String {
        let name = program.function_name(self.func);
        let mut dot = DotWriter::new("CFG", &format!("CFG: {name}"));

        for (id, node) in self.nodes() {
            let label = match node {
                CfgNode::Stmt(stmt) => format!("{stmt}: {}", program.render_stmt(self.func, stmt)),
                other => other.to_string(),
            };
            let shape = if node.stmt().is_some() { "box" } else { "ellipse" };
            dot.node(&format!("n{}", id.index()), &label, &[("shape", shape)]);
        }
        for (source, target, kind) in self.edges() {
            let label = if kind == CfgEdgeKind::Normal { "" } else { kind.as_ref() };
            dot.edge(
                &format!("n{}", source.index()),
                &format!("n{}", target.index()),
                label,
                &[],
            );
        }

        dot.finish()
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.graph.node_count()).map(NodeId::new)
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for ControlFlowGraph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{BinaryOp, Expr, ProgramBuilder, Type},
        test::factories,
    };

    fn kinds_out(cfg: &ControlFlowGraph, node: CfgNode) -> Vec<(CfgNode, CfgEdgeKind)> {
        let id = cfg.node_id(node).unwrap();
        cfg.outgoing_edges(id)
            .map(|(target, kind)| (cfg.node(target).unwrap(), kind))
            .collect()
    }

    #[test]
    fn test_empty_function_connects_entry_to_exit() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &[], Type::Void);
        let program = builder.build().unwrap();

        let cfg = ControlFlowGraph::build(program.function(f).unwrap()).unwrap();
        assert_eq!(cfg.node_count(), 2);
        assert_eq!(kinds_out(&cfg, CfgNode::Entry), vec![(CfgNode::Exit, CfgEdgeKind::Normal)]);
    }

    #[test]
    fn test_straight_line_with_return() {
        let (program, ids) = factories::add_program();
        let add = program.function(ids.add).unwrap();
        let cfg = ControlFlowGraph::build(add).unwrap();

        let [assign, ret] = [add.layout()[0], add.layout()[1]];
        assert_eq!(cfg.node_count(), 4);
        assert_eq!(
            kinds_out(&cfg, CfgNode::Entry),
            vec![(CfgNode::Stmt(assign), CfgEdgeKind::Normal)]
        );
        assert_eq!(
            kinds_out(&cfg, CfgNode::Stmt(ret)),
            vec![(CfgNode::Exit, CfgEdgeKind::Return)]
        );
        assert_eq!(cfg.reverse_postorder().first(), Some(&cfg.entry()));
        assert_eq!(cfg.reverse_postorder().last(), Some(&cfg.exit()));
    }

    #[test]
    fn test_branch_edges_and_fall_off_end() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &["c"], Type::Void);
        let mut body = builder.body(f).unwrap();
        let c = body.param(0);
        let skip = body.new_label();
        let branch = body.branch(c, skip);
        let assign = body.assign(c, Expr::binary(BinaryOp::Add, c, 1));
        body.bind(skip);
        let tail = body.nop();
        body.finish().unwrap();
        let program = builder.build().unwrap();

        let cfg = ControlFlowGraph::build(program.function(f).unwrap()).unwrap();
        assert_eq!(
            kinds_out(&cfg, CfgNode::Stmt(branch)),
            vec![
                (CfgNode::Stmt(tail), CfgEdgeKind::True),
                (CfgNode::Stmt(assign), CfgEdgeKind::False),
            ]
        );
        // falling off the end is not a genuine return
        assert_eq!(
            kinds_out(&cfg, CfgNode::Stmt(tail)),
            vec![(CfgNode::Exit, CfgEdgeKind::Normal)]
        );
    }

    #[test]
    fn test_removed_jump_target_is_retargeted() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &[], Type::Void);
        let mut body = builder.body(f).unwrap();
        let doomed = body.new_label();
        let jump = body.jump(doomed);
        body.bind(doomed);
        let nop = body.nop();
        let ret = body.ret(None);
        body.finish().unwrap();
        let mut program = builder.build().unwrap();

        program.function_mut(f).unwrap().remove_stmt(nop).unwrap();
        let cfg = ControlFlowGraph::build(program.function(f).unwrap()).unwrap();
        assert_eq!(cfg.node_count(), 4);
        assert_eq!(
            kinds_out(&cfg, CfgNode::Stmt(jump)),
            vec![(CfgNode::Stmt(ret), CfgEdgeKind::Normal)]
        );
    }

    #[test]
    fn test_stale_jump_target_is_malformed() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &[], Type::Void);
        let mut body = builder.body(f).unwrap();
        let jump = body.nop();
        let victim = body.nop();
        body.ret(None);
        body.finish().unwrap();
        let mut program = builder.build().unwrap();

        let function = program.function_mut(f).unwrap();
        function.remove_stmt(victim).unwrap();
        *function.stmt_mut(jump).unwrap() = Stmt::Jump { target: victim };

        let result = ControlFlowGraph::build(program.function(f).unwrap());
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));
    }

    #[test]
    fn test_dot_output_names_callee() {
        let (program, ids) = factories::add_program();
        let cfg = ControlFlowGraph::build(program.function(ids.main).unwrap()).unwrap();
        let dot = cfg.to_dot(&program);
        assert!(dot.contains("CFG: main"));
        assert!(dot.contains("a = add(2, 3)"));
        assert!(dot.contains("label=\"return\""));
    }
}
