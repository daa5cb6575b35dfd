//! Benchmarks for the visit and build stages.
//!
//! Run with: cargo bench --bench composition

use criterion::{criterion_group, criterion_main, Criterion};
use linkgen_core::{
    graph::{BuildOptions, LinkGraph},
    schematic::Schematic,
    symbols::{Compilation, TypeKind, TypeSymbol},
    target::{Assembly, LinkTarget},
};
use std::hint::black_box;

const ACTORS: &[&str] = &["IGuild", "IChannel", "IGuildChannel", "IThreadChannel", "IMember", "IRole", "IMessage"];

fn setup_graph() -> LinkGraph {
    let types = ACTORS
        .iter()
        .map(|name| TypeSymbol::new(format!("Discord.{name}Actor"), TypeKind::Interface))
        .collect::<Vec<_>>();
    let targets = ACTORS.iter().map(|name| {
        LinkTarget::new(
            format!("Discord.{name}Actor"),
            format!("Discord.{name}"),
            "ulong",
            format!("Discord.Models.{name}Model"),
            Assembly::Core,
        )
    });
    LinkGraph::new(Compilation::new(types), Schematic::standard(), targets)
}

// Benchmark: composition search over every node of every actor tree
fn bench_semantic_composition(c: &mut Criterion) {
    let graph = setup_graph();
    let arena = graph.arena();
    let ids = arena.ids().collect::<Vec<_>>();

    c.bench_function("semantic_composition", |b| {
        b.iter(|| {
            for id in &ids {
                black_box(arena.semantic_composition(*id, true, None));
            }
        })
    });
}

// Benchmark: full visit pass from a freshly constructed graph
fn bench_visit(c: &mut Criterion) {
    c.bench_function("visit", |b| {
        b.iter(|| {
            let mut graph = setup_graph();
            graph.visit().unwrap();
            black_box(graph.is_visited());
        })
    });
}

// Benchmark: parallel build of a visited graph
fn bench_build(c: &mut Criterion) {
    let mut graph = setup_graph();
    graph.visit().unwrap();

    c.bench_function("build", |b| {
        b.iter(|| black_box(graph.build(BuildOptions::default()).unwrap()))
    });
}

criterion_group!(benches, bench_semantic_composition, bench_visit, bench_build);
criterion_main!(benches);
