#![allow(unused)]
extern crate minclr;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use minclr::prelude::*;
use std::{hint::black_box, sync::Arc};

fn int32() -> TypeRef {
    TypeRef::corelib("System.Int32")
}

/// Catalog with `Bench.Loops::Sum(int)`, a local-variable countdown loop, and
/// `Bench.Loops::Depth(int)`, a self-recursive call chain.
fn bench_catalog() -> (Arc<Catalog>, MethodRef, MethodRef) {
    let catalog = Catalog::with_corelib().expect("corelib");
    let ty = TypeRef::new("Bench", "Bench.Loops");
    let sum = MethodRef::new(ty.clone(), "Sum", 1);
    let depth = MethodRef::new(ty.clone(), "Depth", 1);

    let mut loop_body = InstructionAssembler::new();
    loop_body.ldarg(0).unwrap().stloc(1).unwrap();
    loop_body.label("head").unwrap();
    loop_body.ldloc(1).unwrap().branch("brfalse.s", "exit").unwrap();
    loop_body
        .ldloc(0)
        .unwrap()
        .ldloc(1)
        .unwrap()
        .emit("add")
        .unwrap()
        .stloc(0)
        .unwrap();
    loop_body
        .ldloc(1)
        .unwrap()
        .emit("ldc.i4.m1")
        .unwrap()
        .emit("add")
        .unwrap()
        .stloc(1)
        .unwrap();
    loop_body.branch("br.s", "head").unwrap();
    loop_body.label("exit").unwrap();
    loop_body.ldloc(0).unwrap().emit("ret").unwrap();

    let mut recursion = InstructionAssembler::new();
    recursion.ldarg(0).unwrap().branch("brtrue.s", "deeper").unwrap();
    recursion.ldc_i4(0).unwrap().emit("ret").unwrap();
    recursion.label("deeper").unwrap();
    recursion
        .ldarg(0)
        .unwrap()
        .ldc_i4(1)
        .unwrap()
        .emit("sub")
        .unwrap()
        .call(depth.clone())
        .unwrap()
        .ldc_i4(1)
        .unwrap()
        .emit("add")
        .unwrap()
        .emit("ret")
        .unwrap();

    catalog
        .register(
            DomainType::builder(ty)
                .method(
                    DomainMethod::builder("Sum")
                        .as_static()
                        .param(int32())
                        .returns(int32())
                        .local(CilFlavor::I4)
                        .local(CilFlavor::I4)
                        .body(loop_body.finish().unwrap()),
                )
                .method(
                    DomainMethod::builder("Depth")
                        .as_static()
                        .param(int32())
                        .returns(int32())
                        .body(recursion.finish().unwrap()),
                ),
        )
        .unwrap();

    (Arc::new(catalog), sum, depth)
}

/// Benchmark the dispatch loop on a tight arithmetic loop
///
/// Each iteration executes 11 instructions, so throughput is reported in loop iterations.
fn bench_loop(c: &mut Criterion) {
    let (catalog, sum, _) = bench_catalog();
    let mut process = EmulationProcess::new(catalog, EmulationConfig::default());

    let mut group = c.benchmark_group("dispatch_loop");
    for iterations in [100, 10_000] {
        group.throughput(Throughput::Elements(iterations as u64));
        group.bench_function(format!("sum_{iterations}"), |b| {
            b.iter(|| {
                let result = process
                    .invoke(&sum, vec![EmValue::I32(black_box(iterations))])
                    .unwrap();
                black_box(result)
            });
        });
    }
    group.finish();
}

/// Benchmark the call protocol: frame push, argument passing and return propagation
fn bench_calls(c: &mut Criterion) {
    let (catalog, _, depth) = bench_catalog();
    let mut process = EmulationProcess::new(catalog, EmulationConfig::default());

    let mut group = c.benchmark_group("call_protocol");
    group.throughput(Throughput::Elements(25));
    group.bench_function("recursion_25", |b| {
        b.iter(|| {
            let result = process
                .invoke(&depth, vec![EmValue::I32(black_box(24))])
                .unwrap();
            black_box(result)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_loop, bench_calls);
criterion_main!(benches);
