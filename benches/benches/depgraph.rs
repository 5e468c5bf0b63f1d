// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_depgraph::{DependencyGraph, TraversalScratch};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn below(&mut self, upper_exclusive: u32) -> u32 {
        if upper_exclusive == 0 {
            return 0;
        }
        self.next_u32() % upper_exclusive
    }
}

/// Random DAG where node `n` only reads nodes `< n`.
fn build_dag(n: u32, edges_per_node: u32, seed: u64) -> DependencyGraph<u32> {
    let mut graph = DependencyGraph::new();
    let mut rng = Lcg::new(seed);
    for from in 1..n {
        for _ in 0..edges_per_node.min(from) {
            let to = rng.below(from);
            graph
                .add_dependency(from, to)
                .expect("edges only point to lower ids");
        }
    }
    graph
}

fn bench_depgraph(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_depgraph");
    group.sample_size(50);

    for &(n, edges_per_node) in &[(256_u32, 1_u32), (256, 4), (4_096, 1), (4_096, 4)] {
        group.bench_function(format!("build(n={n},e={edges_per_node})"), |b| {
            b.iter(|| black_box(build_dag(n, edges_per_node, 0xD1A7_0000_0000_0001)));
        });

        let graph = build_dag(n, edges_per_node, 0xD1A7_0000_0000_0002);

        group.bench_function(
            format!("transitive_dependents(n={n},e={edges_per_node})"),
            |b| {
                let mut scratch = TraversalScratch::with_capacity(n as usize);
                b.iter(|| {
                    let mut count = 0_usize;
                    graph.for_each_transitive_dependent(0, &mut scratch, |_| count += 1);
                    black_box(count);
                });
            },
        );

        group.bench_function(
            format!("post_order_dependencies(n={n},e={edges_per_node})"),
            |b| {
                let mut scratch = TraversalScratch::with_capacity(n as usize);
                let mut order = Vec::with_capacity(n as usize);
                b.iter(|| {
                    graph.post_order_dependencies(n - 1, &mut scratch, &mut order);
                    black_box(order.len());
                });
            },
        );

        group.bench_function(
            format!("cycle_check_reject(n={n},e={edges_per_node})"),
            |b| {
                b.iter_batched(
                    || build_dag(n, edges_per_node, 0xD1A7_0000_0000_0003),
                    |mut graph| {
                        // 0 reading the newest node always closes a cycle when
                        // the newest node reaches 0.
                        black_box(graph.add_dependency(0, n - 1).is_err());
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_depgraph);
criterion_main!(benches);
