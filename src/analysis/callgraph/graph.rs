//! The call graph data structure.

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    sync::OnceLock,
};

use crate::{
    analysis::callgraph::{CallGraphEdge, CallSite},
    ir::{FuncId, Program},
    utils::{
        graph::{algorithms, DirectedGraph, NodeId},
        DotWriter,
    },
};

/// Call relationships between the functions reachable from the entry functions.
///
/// The graph only grows: functions become reachable and call sites get registered, but
/// nothing is ever removed. `call_site -> callee` is a function (each call site has one
/// static target) and the two inverse indices, callee to call sites and function to
/// contained call sites, are updated together with it on every insertion.
///
/// A function-level [`DirectedGraph`] mirrors the edges for SCC and ordering queries;
/// those derived views are cached until the next mutation.
#[derive(Debug, Default)]
pub struct CallGraph {
    entry_functions: Vec<FuncId>,
    reachable: Vec<FuncId>,
    reachable_set: HashSet<FuncId>,
    edges: Vec<CallGraphEdge>,
    call_site_to_callee: HashMap<CallSite, FuncId>,
    callee_to_call_sites: HashMap<FuncId, Vec<CallSite>>,
    call_sites_in: HashMap<FuncId, Vec<CallSite>>,
    graph: DirectedGraph<FuncId, CallSite>,
    func_to_node: HashMap<FuncId, NodeId>,
    sccs: OnceLock<Vec<Vec<FuncId>>>,
}

impl CallGraph {
    /// Creates an empty call graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate(&mut self) {
        self.sccs = OnceLock::new();
    }

    /// Marks `func` as an entry function (and reachable).
    pub fn add_entry_function(&mut self, func: FuncId) {
        self.add_reachable(func);
        if !self.entry_functions.contains(&func) {
            self.entry_functions.push(func);
        }
    }

    /// Marks `func` reachable. Returns `true` if it was not reachable before.
    pub fn add_reachable(&mut self, func: FuncId) -> bool {
        if !self.reachable_set.insert(func) {
            return false;
        }
        self.reachable.push(func);
        let node = self.graph.add_node(func);
        self.func_to_node.insert(func, node);
        self.invalidate();
        true
    }

    /// Registers `site` as contained in its caller. Idempotent; returns `true` if new.
    pub fn add_call_site(&mut self, site: CallSite) -> bool {
        let sites = self.call_sites_in.entry(site.caller).or_default();
        if sites.contains(&site) {
            return false;
        }
        sites.push(site);
        true
    }

    /// Adds or merges the edge `site -> callee`, marking both ends reachable.
    ///
    /// Returns `true` if the edge is new.
    ///
    /// # Panics
    ///
    /// Panics if `site` is already resolved to a different callee; call sites have exactly
    /// one static target, so this means the caller is inconsistent.
    ///
    /// Also panics if a function's node is missing from the underlying graph, which would
    /// mean the function-to-node index has diverged from it.
    pub fn add_edge(&mut self, site: CallSite, callee: FuncId) -> bool {
        self.add_reachable(site.caller);
        self.add_reachable(callee);
        self.add_call_site(site);

        match self.call_site_to_callee.entry(site) {
            Entry::Occupied(existing) => {
                assert_eq!(
                    *existing.get(),
                    callee,
                    "call site {site} already resolves to {}",
                    existing.get()
                );
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(callee);
            }
        }

        self.callee_to_call_sites
            .entry(callee)
            .or_default()
            .push(site);
        self.edges.push(CallGraphEdge {
            call_site: site,
            callee,
        });

        let (from, to) = (self.func_to_node[&site.caller], self.func_to_node[&callee]);
        if let Err(err) = self.graph.add_edge(from, to, site) {
            panic!("call graph index out of sync with its node table: {err}");
        }
        self.invalidate();
        true
    }

    /// Entry functions in the order they were added.
    #[must_use]
    pub fn entry_functions(&self) -> &[FuncId] {
        &self.entry_functions
    }

    /// Reachable functions in discovery order.
    #[must_use]
    pub fn reachable_functions(&self) -> &[FuncId] {
        &self.reachable
    }

    /// Returns `true` if `func` is reachable.
    #[must_use]
    pub fn is_reachable(&self, func: FuncId) -> bool {
        self.reachable_set.contains(&func)
    }

    /// All edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[CallGraphEdge] {
        &self.edges
    }

    /// The callee of `site`.
    #[must_use]
    pub fn callee_of(&self, site: CallSite) -> Option<FuncId> {
        self.call_site_to_callee.get(&site).copied()
    }

    /// Call sites targeting `callee`.
    #[must_use]
    pub fn call_sites_to(&self, callee: FuncId) -> &[CallSite] {
        self.callee_to_call_sites
            .get(&callee)
            .map_or(&[], Vec::as_slice)
    }

    /// Call sites contained in `func`.
    #[must_use]
    pub fn call_sites_in(&self, func: FuncId) -> &[CallSite] {
        self.call_sites_in.get(&func).map_or(&[], Vec::as_slice)
    }

    /// Distinct functions called from `func`, in first-call order.
    #[must_use]
    pub fn callees(&self, func: FuncId) -> Vec<FuncId> {
        let mut seen = HashSet::new();
        self.call_sites_in(func)
            .iter()
            .filter_map(|&site| self.callee_of(site))
            .filter(|callee| seen.insert(*callee))
            .collect()
    }

    /// Distinct functions calling `func`.
    #[must_use]
    pub fn callers(&self, func: FuncId) -> Vec<FuncId> {
        let mut seen = HashSet::new();
        self.call_sites_to(func)
            .iter()
            .map(|site| site.caller)
            .filter(|caller| seen.insert(*caller))
            .collect()
    }

    /// Reachable functions without outgoing calls.
    #[must_use]
    pub fn leaf_functions(&self) -> Vec<FuncId> {
        self.reachable
            .iter()
            .copied()
            .filter(|&f| self.call_sites_in(f).is_empty())
            .collect()
    }

    /// Strongly connected components, callees before callers.
    pub fn sccs(&self) -> &[Vec<FuncId>] {
        self.sccs.get_or_init(|| {
            algorithms::strongly_connected_components(&self.graph)
                .into_iter()
                .map(|scc| {
                    scc.into_iter()
                        .filter_map(|node| self.graph.node(node).copied())
                        .collect()
                })
                .collect()
        })
    }

    /// Reachable functions ordered so that callees precede callers where possible.
    ///
    /// Members of a recursion cycle are adjacent, in no particular order among
    /// themselves.
    #[must_use]
    pub fn bottom_up_order(&self) -> Vec<FuncId> {
        self.sccs().iter().flatten().copied().collect()
    }

    /// Functions in a recursion cycle, including direct self-recursion.
    #[must_use]
    pub fn recursive_functions(&self) -> Vec<FuncId> {
        let mut result = Vec::new();
        for scc in self.sccs() {
            let recursive = scc.len() > 1
                || scc
                    .first()
                    .is_some_and(|&f| self.callees(f).contains(&f));
            if recursive {
                result.extend(scc.iter().copied());
            }
        }
        result
    }

    /// Returns `true` if any reachable function is recursive.
    #[must_use]
    pub fn has_recursion(&self) -> bool {
        !self.recursive_functions().is_empty()
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> CallGraphStats {
        CallGraphStats {
            function_count: self.reachable.len(),
            edge_count: self.edges.len(),
            call_site_count: self.call_sites_in.values().map(Vec::len).sum(),
            entry_functions: self.entry_functions.len(),
            leaf_functions: self.leaf_functions().len(),
            scc_count: self.sccs().len(),
            recursive_functions: self.recursive_functions().len(),
        }
    }

    /// Renders the call graph in DOT. Entry functions are drawn filled; edges are labelled
    /// with their call statement.
    #[must_use]
    pub fn to_dot(&self, program: &Program) -> String {
        let mut dot = DotWriter::new("CallGraph", "Call graph");
        for &func in &self.reachable {
            let name = program.function_name(func);
            if self.entry_functions.contains(&func) {
                dot.node(
                    &func.to_string(),
                    &name,
                    &[("style", "filled"), ("fillcolor", "lightgreen")],
                );
            } else {
                dot.node(&func.to_string(), &name, &[]);
            }
        }
        for edge in &self.edges {
            dot.edge(
                &edge.call_site.caller.to_string(),
                &edge.callee.to_string(),
                &edge.call_site.stmt.to_string(),
                &[],
            );
        }
        dot.finish()
    }
}

/// Size and shape of a [`CallGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallGraphStats {
    /// Reachable functions.
    pub function_count: usize,
    /// Call-graph edges (one per resolved call site).
    pub edge_count: usize,
    /// Registered call sites.
    pub call_site_count: usize,
    /// Entry functions.
    pub entry_functions: usize,
    /// Reachable functions without calls.
    pub leaf_functions: usize,
    /// Strongly connected components.
    pub scc_count: usize,
    /// Functions taking part in recursion.
    pub recursive_functions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StmtArena;

    fn stmt_ids(n: usize) -> Vec<crate::ir::StmtId> {
        let mut arena = StmtArena::new();
        (0..n).map(|_| arena.insert(crate::ir::Stmt::Nop)).collect()
    }

    #[test]
    fn test_inverse_indices_stay_consistent() {
        let s = stmt_ids(3);
        let (main, f, g) = (FuncId::new(0), FuncId::new(1), FuncId::new(2));
        let mut cg = CallGraph::new();
        cg.add_entry_function(main);

        let first = CallSite::new(main, s[0]);
        let second = CallSite::new(main, s[1]);
        let inner = CallSite::new(f, s[2]);
        assert!(cg.add_edge(first, f));
        assert!(cg.add_edge(second, f));
        assert!(cg.add_edge(inner, g));
        assert!(!cg.add_edge(first, f));

        assert_eq!(cg.edges().len(), 3);
        assert_eq!(cg.graph.edge_count(), cg.edges().len());
        for edge in cg.edges() {
            assert_eq!(cg.callee_of(edge.call_site), Some(edge.callee));
            assert!(cg.call_sites_to(edge.callee).contains(&edge.call_site));
            assert!(cg.call_sites_in(edge.call_site.caller).contains(&edge.call_site));
        }
        assert_eq!(cg.call_sites_to(f), &[first, second]);
        assert_eq!(cg.callees(main), vec![f]);
        assert_eq!(cg.callers(f), vec![main]);
        assert_eq!(cg.leaf_functions(), vec![g]);
        assert_eq!(cg.reachable_functions(), &[main, f, g]);
    }

    #[test]
    #[should_panic(expected = "already resolves")]
    fn test_call_site_has_one_callee() {
        let s = stmt_ids(1);
        let mut cg = CallGraph::new();
        let site = CallSite::new(FuncId::new(0), s[0]);
        cg.add_edge(site, FuncId::new(1));
        cg.add_edge(site, FuncId::new(2));
    }

    #[test]
    fn test_recursion_queries() {
        let s = stmt_ids(3);
        let (main, a, b) = (FuncId::new(0), FuncId::new(1), FuncId::new(2));
        let mut cg = CallGraph::new();
        cg.add_entry_function(main);
        cg.add_edge(CallSite::new(main, s[0]), a);
        assert!(!cg.has_recursion());

        cg.add_edge(CallSite::new(a, s[1]), b);
        cg.add_edge(CallSite::new(b, s[2]), a);
        assert!(cg.has_recursion());

        let mut recursive = cg.recursive_functions();
        recursive.sort();
        assert_eq!(recursive, vec![a, b]);
        assert_eq!(cg.bottom_up_order().last(), Some(&main));

        let stats = cg.stats();
        assert_eq!(stats.function_count, 3);
        assert_eq!(stats.scc_count, 2);
        assert_eq!(stats.recursive_functions, 2);
        assert_eq!(stats.leaf_functions, 0);
    }

    #[test]
    fn test_long_call_chain_summarizes() {
        let n = 20_000;
        let s = stmt_ids(n);
        let funcs: Vec<FuncId> = (0..=n).map(FuncId::new).collect();
        let mut cg = CallGraph::new();
        cg.add_entry_function(funcs[0]);
        for (i, pair) in funcs.windows(2).enumerate() {
            assert!(cg.add_edge(CallSite::new(pair[0], s[i]), pair[1]));
        }
        assert_eq!(cg.graph.edge_count(), n);

        let stats = cg.stats();
        assert_eq!(stats.function_count, n + 1);
        assert_eq!(stats.scc_count, n + 1);
        assert_eq!(stats.recursive_functions, 0);
        assert_eq!(cg.bottom_up_order().first(), Some(&funcs[n]));
        assert_eq!(cg.bottom_up_order().last(), Some(&funcs[0]));
    }
}
