//! Worklist construction of the call graph from an entry function.

use std::collections::VecDeque;

use strum::{Display, EnumString};

use crate::{
    analysis::callgraph::{CallGraph, CallSite},
    ir::{FuncId, Program},
};

/// Which functions an analysis run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AnalysisScope {
    /// Only functions transitively callable from the entry function
    #[default]
    Reachable,
    /// Every function in the program
    All,
}

/// Builds a [`CallGraph`] by traversing static call edges from an entry function.
///
/// # Examples
///
/// ```rust
/// use midend::analysis::CallGraphBuilder;
/// use midend::ir::{Operand, ProgramBuilder, Type};
///
/// let mut builder = ProgramBuilder::new();
/// let main = builder.declare("main", &[], Type::Int);
/// let helper = builder.declare("helper", &[], Type::Void);
/// let unused = builder.declare("unused", &[], Type::Void);
/// let mut body = builder.body(main)?;
/// body.call(None, helper, vec![]);
/// body.ret(None);
/// body.finish()?;
/// let program = builder.build()?;
///
/// let cg = CallGraphBuilder::new(&program).build(main);
/// assert!(cg.is_reachable(helper));
/// assert!(!cg.is_reachable(unused));
/// # Ok::<(), midend::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CallGraphBuilder<'p> {
    program: &'p Program,
    scope: AnalysisScope,
}

impl<'p> CallGraphBuilder<'p> {
    /// Creates a builder with [`AnalysisScope::Reachable`].
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        CallGraphBuilder {
            program,
            scope: AnalysisScope::Reachable,
        }
    }

    /// Sets the scope. With [`AnalysisScope::All`] every function is seeded as reachable.
    #[must_use]
    pub fn with_scope(mut self, scope: AnalysisScope) -> Self {
        self.scope = scope;
        self
    }

    /// Builds the call graph rooted at `entry`.
    ///
    /// Every function is queued at most once, when it first becomes reachable, so the
    /// worklist drains after at most one visit per function. A function is rescanned
    /// only if something queues it again, and re-registering its call sites is a no-op.
    #[must_use]
    pub fn build(&self, entry: FuncId) -> CallGraph {
        let mut cg = CallGraph::new();
        let mut worklist = VecDeque::new();

        cg.add_entry_function(entry);
        worklist.push_back(entry);

        if self.scope == AnalysisScope::All {
            for func in self.program.function_ids() {
                if cg.add_reachable(func) {
                    worklist.push_back(func);
                }
            }
        }

        while let Some(func) = worklist.pop_front() {
            let Some(function) = self.program.function(func) else {
                tracing::warn!(%func, "call graph references a function outside the program");
                continue;
            };

            for (stmt, call) in function.call_sites() {
                let site = CallSite::new(func, stmt);
                cg.add_call_site(site);

                if !cg.is_reachable(call.callee) {
                    tracing::debug!(
                        caller = function.name(),
                        callee = %self.program.function_name(call.callee),
                        "function reachable"
                    );
                    worklist.push_back(call.callee);
                }
                cg.add_edge(site, call.callee);
            }
        }

        tracing::debug!(
            entry = %self.program.function_name(entry),
            functions = cg.reachable_functions().len(),
            edges = cg.edges().len(),
            "call graph built"
        );
        cg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories;

    #[test]
    fn test_add_program_reachability() {
        let (program, ids) = factories::add_program();
        let cg = CallGraphBuilder::new(&program).build(ids.main);

        assert_eq!(cg.reachable_functions(), &[ids.main, ids.add]);
        assert_eq!(cg.entry_functions(), &[ids.main]);
        assert_eq!(cg.edges().len(), 1);
        assert_eq!(cg.edges()[0].callee, ids.add);
        assert!(cg.call_sites_in(ids.add).is_empty());
    }

    #[test]
    fn test_uncalled_function_is_absent() {
        let (program, ids) = factories::pick_program();
        let cg = CallGraphBuilder::new(&program).build(ids.main);

        assert!(cg.is_reachable(ids.pick));
        assert!(!cg.is_reachable(ids.dead));
        assert_eq!(cg.call_sites_to(ids.pick).len(), 3);
        assert_eq!(cg.callees(ids.main), vec![ids.pick]);
    }

    #[test]
    fn test_scope_all_includes_uncalled_functions() {
        let (program, ids) = factories::pick_program();
        let cg = CallGraphBuilder::new(&program)
            .with_scope(AnalysisScope::All)
            .build(ids.main);

        assert!(cg.is_reachable(ids.dead));
        assert_eq!(cg.entry_functions(), &[ids.main]);
        assert_eq!(cg.call_sites_to(ids.pick).len(), 4);
    }

    #[test]
    fn test_recursive_call_processed_once() {
        let (program, ids) = factories::recursive_program();
        let cg = CallGraphBuilder::new(&program).build(ids.main);

        assert_eq!(cg.reachable_functions().len(), 2);
        assert_eq!(cg.call_sites_in(ids.fact).len(), 1);
        assert_eq!(cg.edges().len(), 2);
        assert_eq!(cg.recursive_functions(), vec![ids.fact]);
    }

    #[test]
    fn test_reachable_set_is_transitive_closure() {
        let (program, ids) = factories::pick_program();
        let from_dead = CallGraphBuilder::new(&program).build(ids.dead);

        assert_eq!(from_dead.reachable_functions(), &[ids.dead, ids.pick]);
        assert!(!from_dead.is_reachable(ids.main));
    }

    #[test]
    fn test_scope_parses() {
        assert_eq!("all".parse::<AnalysisScope>().ok(), Some(AnalysisScope::All));
        assert_eq!(AnalysisScope::Reachable.to_string(), "reachable");
    }
}
