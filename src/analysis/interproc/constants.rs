//! Interprocedural constant propagation.
//!
//! Non-call statements and branch edges reuse [`ConstantPropagation`] unchanged; only the
//! three call-related edge kinds are specific to the interprocedural setting. Facts are
//! context-insensitive: a callee's entry fact is the meet of the bindings of all its
//! call sites.

use std::collections::BTreeSet;

use crate::{
    analysis::{
        callgraph::CallSite,
        cfg::CfgEdgeKind,
        dataflow::{
            eval_operand, ConstFact, ConstValue, ConstantPropagation, DataFlowAnalysis,
            Direction, MeetSemiLattice,
        },
        icfg::IcfgNode,
        interproc::framework::InterproceduralAnalysis,
    },
    ir::{CallStmt, FuncId, Function, Program, VarId},
};

/// Constant propagation across calls and returns.
///
/// # Example
///
/// ```rust,ignore
/// let analysis = InterConstantPropagation::new(&program);
/// let result = InterproceduralSolver::default().solve(&analysis, &icfg)?;
/// let fact = result.fact_before(IcfgNode::stmt(main, ret)).unwrap();
/// assert_eq!(fact.get(a), ConstValue::Const(5));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct InterConstantPropagation<'a> {
    program: &'a Program,
    intra: ConstantPropagation,
}

impl<'a> InterConstantPropagation<'a> {
    /// Creates the analysis for `program`.
    #[must_use]
    pub fn new(program: &'a Program) -> Self {
        InterConstantPropagation {
            program,
            intra: ConstantPropagation::new(),
        }
    }

    fn function(&self, func: FuncId) -> &'a Function {
        match self.program.function(func) {
            Some(function) => function,
            None => panic!("{func} is in the ICFG but not in the program"),
        }
    }

    fn call(&self, site: CallSite) -> &'a CallStmt {
        match self
            .function(site.caller)
            .stmt(site.stmt)
            .and_then(|stmt| stmt.as_call())
        {
            Some(call) => call,
            None => panic!("{site} is not a call statement"),
        }
    }
}

impl InterproceduralAnalysis for InterConstantPropagation<'_> {
    type Fact = ConstFact;
    const DIRECTION: Direction = Direction::Forward;

    fn new_boundary_fact(&self, entry: IcfgNode) -> ConstFact {
        self.intra.boundary(self.function(entry.func))
    }

    fn new_initial_fact(&self) -> ConstFact {
        ConstFact::new()
    }

    fn transfer_non_call(&self, node: IcfgNode, input: &ConstFact) -> ConstFact {
        self.intra
            .transfer(self.function(node.func), node.node, input)
    }

    fn transfer_normal_edge(
        &self,
        source: IcfgNode,
        target: IcfgNode,
        kind: CfgEdgeKind,
        fact: &ConstFact,
    ) -> ConstFact {
        self.intra.transfer_edge(
            self.function(source.func),
            source.node,
            target.node,
            kind,
            fact,
        )
    }

    fn transfer_call_to_return_edge(
        &self,
        call_site: CallSite,
        _return_site: IcfgNode,
        fact: &ConstFact,
    ) -> ConstFact {
        let mut local = fact.clone();
        if let Some(dst) = self.call(call_site).dst {
            local.remove(dst);
        }
        local
    }

    fn transfer_call_edge(&self, call_site: CallSite, callee: FuncId, fact: &ConstFact) -> ConstFact {
        if !fact.is_reachable() {
            return ConstFact::new();
        }
        let call = self.call(call_site);
        self.function(callee)
            .params()
            .iter()
            .zip(&call.args)
            .map(|(&formal, &actual)| (formal, eval_operand(fact, actual)))
            .collect()
    }

    fn transfer_return_edge(
        &self,
        call_site: CallSite,
        _callee: FuncId,
        return_vars: &BTreeSet<VarId>,
        _return_site: IcfgNode,
        exit_fact: &ConstFact,
    ) -> ConstFact {
        if !exit_fact.is_reachable() {
            return ConstFact::new();
        }
        let mut fact = ConstFact::reachable();
        if let Some(dst) = self.call(call_site).dst {
            let value = return_vars
                .iter()
                .fold(ConstValue::Undef, |acc, &var| acc.meet(&exit_fact.get(var)));
            fact.set(dst, value);
        }
        fact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            callgraph::CallGraphBuilder,
            icfg::{Icfg, IcfgBuilder},
            interproc::{InterproceduralSolver, SolverConfig, WorklistOrder},
        },
        ir::{Operand, ProgramBuilder, Type},
        test::factories::{add_program, cfgs, pick_program, recursive_program},
    };

    fn icfg_for(program: &Program, entry: FuncId) -> Icfg {
        let cfgs = cfgs(program);
        let cg = CallGraphBuilder::new(program).build(entry);
        IcfgBuilder::new(program, &cfgs).build(&cg).unwrap()
    }

    #[test]
    fn add_returns_five() {
        let (program, ids) = add_program();
        let icfg = icfg_for(&program, ids.main);
        let result = InterproceduralSolver::default()
            .solve(&InterConstantPropagation::new(&program), &icfg)
            .unwrap();

        let main = program.function(ids.main).unwrap();
        let a = main.var_by_name("a").unwrap();
        let ret = main.layout()[1];
        let fact = result.fact_before(IcfgNode::stmt(ids.main, ret)).unwrap();
        assert_eq!(fact.get(a), ConstValue::Const(5));

        let add = program.function(ids.add).unwrap();
        let entry = result.fact_after(IcfgNode::entry(ids.add)).unwrap();
        assert_eq!(entry.get(add.params()[0]), ConstValue::Const(2));
        assert_eq!(entry.get(add.params()[1]), ConstValue::Const(3));
        assert_eq!(entry.len(), 2);
    }

    #[test]
    fn call_edge_does_not_leak_caller_state() {
        let mut builder = ProgramBuilder::new();
        let main = builder.declare("main", &[], Type::Int);
        let id = builder.declare("id", &["v"], Type::Int);
        let mut body = builder.body(main).unwrap();
        let secret = body.local("secret");
        let r = body.local("r");
        body.assign(secret, 99);
        body.call(Some(r), id, vec![Operand::Const(4)]);
        body.ret(Some(r));
        body.finish().unwrap();
        let mut body = builder.body(id).unwrap();
        let v = body.param(0);
        body.ret(Some(v));
        body.finish().unwrap();
        let program = builder.build().unwrap();

        let icfg = icfg_for(&program, main);
        let result = InterproceduralSolver::default()
            .solve(&InterConstantPropagation::new(&program), &icfg)
            .unwrap();

        let callee_entry = result.fact_before(IcfgNode::entry(id)).unwrap();
        assert_eq!(callee_entry.get(secret), ConstValue::Undef);
        assert_eq!(callee_entry.get(v), ConstValue::Const(4));

        let main_fn = program.function(main).unwrap();
        let ret = IcfgNode::stmt(main, main_fn.layout()[2]);
        let fact = result.fact_before(ret).unwrap();
        assert_eq!(fact.get(secret), ConstValue::Const(99));
        assert_eq!(fact.get(r), ConstValue::Const(4));
    }

    #[test]
    fn multiple_call_sites_meet_in_callee() {
        let (program, ids) = pick_program();
        let icfg = icfg_for(&program, ids.main);
        let result = InterproceduralSolver::default()
            .solve(&InterConstantPropagation::new(&program), &icfg)
            .unwrap();

        let pick = program.function(ids.pick).unwrap();
        let c = pick.params()[0];
        let entry = result.fact_after(IcfgNode::entry(ids.pick)).unwrap();
        assert_eq!(entry.get(c), ConstValue::NonConst);

        let main = program.function(ids.main).unwrap();
        let u = main.var_by_name("u").unwrap();
        let ret = IcfgNode::stmt(ids.main, *main.layout().last().unwrap());
        assert_eq!(result.fact_before(ret).unwrap().get(u), ConstValue::NonConst);
        assert!(result.fact_before(IcfgNode::entry(ids.dead)).is_none());
    }

    #[test]
    fn recursion_converges_in_every_order() {
        let (program, ids) = recursive_program();
        let icfg = icfg_for(&program, ids.main);
        let analysis = InterConstantPropagation::new(&program);

        let fifo = InterproceduralSolver::default().solve(&analysis, &icfg).unwrap();
        for order in [WorklistOrder::Lifo, WorklistOrder::ReversePostorder] {
            let other = InterproceduralSolver::new(SolverConfig::with_order(order))
                .solve(&analysis, &icfg)
                .unwrap();
            assert!(fifo.same_facts(&other), "{order} disagrees with fifo");
        }
        for seed in [3, 17, 40_961] {
            let config = SolverConfig::shuffled(WorklistOrder::Lifo, seed);
            let shuffled = InterproceduralSolver::new(config)
                .solve(&analysis, &icfg)
                .unwrap();
            assert!(fifo.same_facts(&shuffled), "shuffle {seed} disagrees with fifo");
        }

        let main = program.function(ids.main).unwrap();
        let r = main.var_by_name("r").unwrap();
        let ret = IcfgNode::stmt(ids.main, main.layout()[1]);
        assert_eq!(fifo.fact_before(ret).unwrap().get(r), ConstValue::NonConst);
    }

    #[test]
    fn missing_callee_leaves_result_undefined() {
        let (program, ids) = add_program();
        let mut cfgs = cfgs(&program);
        cfgs.remove(&ids.add);
        let cg = CallGraphBuilder::new(&program).build(ids.main);
        let icfg = IcfgBuilder::new(&program, &cfgs).build(&cg).unwrap();

        let result = InterproceduralSolver::default()
            .solve(&InterConstantPropagation::new(&program), &icfg)
            .unwrap();
        let main = program.function(ids.main).unwrap();
        let a = main.var_by_name("a").unwrap();
        let fact = result
            .fact_before(IcfgNode::stmt(ids.main, main.layout()[1]))
            .unwrap();
        assert!(fact.is_reachable());
        assert_eq!(fact.get(a), ConstValue::Undef);
    }
}
