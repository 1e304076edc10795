//! Mining performance benchmarks: lattice enumeration, hierarchy
//! reduction and GA clustering on synthetic histories.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use roleminer::budget::PhaseBudget;
use roleminer::ga::GaOptimizer;
use roleminer::lattice::build_lattice;
use roleminer::reducer::reduce_hierarchy;
use roleminer::{FrequencyMatrix, MiningConfig, PermissionMatrix};

/// Layered synthetic population: `layers` privilege tiers over
/// `users_per_layer` users each; tier `k` holds functions `0..=k`.
fn layered_matrices(
    layers: usize,
    users_per_layer: usize,
) -> (PermissionMatrix, FrequencyMatrix) {
    let users = layers * users_per_layer;
    let mut p = PermissionMatrix::new(users, layers);
    let mut f = FrequencyMatrix::new(users, layers);
    for layer in 0..layers {
        for slot in 0..users_per_layer {
            let u = layer * users_per_layer + slot;
            for func in layer..layers {
                p.set(u, func);
                f.add(u, func, (layer + 1) as u64);
            }
        }
    }
    (p, f)
}

fn bench_lattice(c: &mut Criterion) {
    let mut group = c.benchmark_group("lattice_enumeration");
    for layers in [4usize, 8, 12] {
        let (p, _) = layered_matrices(layers, 20);
        group.bench_with_input(BenchmarkId::from_parameter(layers), &layers, |b, _| {
            b.iter(|| build_lattice(&p, &PhaseBudget::unlimited()));
        });
    }
    group.finish();
}

fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_reduction");
    for layers in [4usize, 8, 12] {
        let (p, _) = layered_matrices(layers, 20);
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        group.bench_with_input(BenchmarkId::from_parameter(layers), &layers, |b, _| {
            b.iter(|| reduce_hierarchy(&lattice.concepts));
        });
    }
    group.finish();
}

fn bench_ga(c: &mut Criterion) {
    let mut group = c.benchmark_group("ga_clustering");
    group.sample_size(10);
    for layers in [4usize, 8] {
        let (p, f) = layered_matrices(layers, 20);
        let lattice = build_lattice(&p, &PhaseBudget::unlimited()).expect("lattice");
        let basic = reduce_hierarchy(&lattice.concepts);
        let config = MiningConfig {
            generations: 20,
            population: 50,
            ..MiningConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(layers), &layers, |b, _| {
            b.iter(|| {
                let mut optimizer =
                    GaOptimizer::new(basic.clone(), p.clone(), &f, config.clone());
                optimizer.run(&PhaseBudget::unlimited())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lattice, bench_reduction, bench_ga);
criterion_main!(benches);
