//! Benchmarks for interprocedural graph construction and solving.
//!
//! Runs over a synthetic call chain where every function adds a constant to its
//! argument and calls the next one:
//! - Call graph construction
//! - ICFG construction
//! - Interprocedural constant propagation, per worklist order

extern crate midend;

use std::{collections::HashMap, hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use midend::{
    analysis::{
        self, CallGraph, ControlFlowGraph, InterConstantPropagation, InterproceduralSolver,
        SolverConfig, WorklistOrder,
    },
    ir::{BinaryOp, Expr, FuncId, Operand, Program, ProgramBuilder, Type},
};
use strum::IntoEnumIterator;

/// `main` calls `f0(1)`; `fi(x)` branches on `x`, then calls `fi+1(x + i)` twice.
fn chain(len: usize) -> (Program, FuncId) {
    let mut builder = ProgramBuilder::new();
    let main = builder.declare("main", &[], Type::Int);
    let funcs: Vec<FuncId> = (0..len)
        .map(|i| builder.declare(&format!("f{i}"), &["x"], Type::Int))
        .collect();

    let mut body = builder.body(main).unwrap();
    let r = body.local("r");
    body.call(Some(r), funcs[0], vec![Operand::Const(1)]);
    body.ret(Some(r));
    body.finish().unwrap();

    for (i, &func) in funcs.iter().enumerate() {
        let mut body = builder.body(func).unwrap();
        let x = body.param(0);
        let y = body.local("y");
        let z = body.local("z");
        body.assign(y, Expr::binary(BinaryOp::Add, x, i as i64));
        match funcs.get(i + 1) {
            Some(&next) => {
                let other = body.new_label();
                body.branch(x, other);
                body.call(Some(z), next, vec![Operand::Var(y)]);
                body.ret(Some(z));
                body.bind(other);
                body.call(Some(z), next, vec![Operand::Var(x)]);
                body.ret(Some(z));
            }
            None => {
                body.ret(Some(y));
            }
        }
        body.finish().unwrap();
    }

    (builder.build().unwrap(), main)
}

fn cfgs(program: &Program, cg: &CallGraph) -> HashMap<FuncId, Arc<ControlFlowGraph>> {
    cg.reachable_functions()
        .iter()
        .map(|&func| {
            let function = program.function(func).unwrap();
            (func, Arc::new(ControlFlowGraph::build(function).unwrap()))
        })
        .collect()
}

/// Benchmark call graph discovery over chains of increasing length.
fn bench_call_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_graph");
    for len in [16, 128, 512] {
        let (program, main) = chain(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(analysis::build_call_graph(black_box(&program), main)));
        });
    }
    group.finish();
}

/// Benchmark stitching prebuilt CFGs into an ICFG.
fn bench_icfg(c: &mut Criterion) {
    let mut group = c.benchmark_group("icfg");
    for len in [16, 128, 512] {
        let (program, main) = chain(len);
        let cg = analysis::build_call_graph(&program, main);
        let cfgs = cfgs(&program, &cg);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(analysis::build_icfg(&program, &cfgs, &cg).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark interprocedural constant propagation under each worklist order.
fn bench_inter_constprop(c: &mut Criterion) {
    let (program, main) = chain(128);
    let cg = analysis::build_call_graph(&program, main);
    let cfgs = cfgs(&program, &cg);
    let icfg = analysis::build_icfg(&program, &cfgs, &cg).unwrap();
    let analysis = InterConstantPropagation::new(&program);

    let mut group = c.benchmark_group("inter_constprop");
    for order in WorklistOrder::iter() {
        let solver = InterproceduralSolver::new(SolverConfig::with_order(order));
        group.bench_function(order.to_string(), |b| {
            b.iter(|| black_box(solver.solve(&analysis, black_box(&icfg)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_call_graph, bench_icfg, bench_inter_constprop);
criterion_main!(benches);
