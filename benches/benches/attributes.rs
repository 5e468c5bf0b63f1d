// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_attribute::{AttributeStore, Modifier};

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

fn name(i: u32) -> String {
    format!("attr{i}")
}

/// Store whose attribute `i` carries a constant modifier and reads up to
/// `reads_per_attr` attributes with lower indices.
fn build_store(n: u32, reads_per_attr: u32, seed: u64) -> AttributeStore {
    let mut store = AttributeStore::new();
    let mut rng = Lcg::new(seed);
    for i in 0..n {
        store
            .add_attribute(&name(i), f64::from(i))
            .expect("names are non-empty");
        store
            .add_modifier(Modifier::additive(name(i), 1.0))
            .expect("names are non-empty");
        for _ in 0..reads_per_attr.min(i) {
            let source = rng.below(i);
            store
                .add_modifier(Modifier::dependency_scaled(name(i), name(source), 0.01))
                .expect("reads only point to lower indices");
        }
    }
    store
}

fn bench_attributes(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_attribute");
    group.sample_size(30);

    for &(n, reads) in &[(256_u32, 1_u32), (256, 4), (2_048, 1), (2_048, 4)] {
        let last = name(n - 1);

        group.bench_function(format!("cold_read(n={n},r={reads})"), |b| {
            b.iter_batched(
                || build_store(n, reads, 0xA77A_0000_0000_0001),
                |mut store| black_box(store.get_value(&last)),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("warm_read(n={n},r={reads})"), |b| {
            let mut store = build_store(n, reads, 0xA77A_0000_0000_0002);
            let _ = store.get_value(&last);
            b.iter(|| black_box(store.get_value(&last)));
        });

        group.bench_function(format!("root_write_then_read(n={n},r={reads})"), |b| {
            let mut store = build_store(n, reads, 0xA77A_0000_0000_0003);
            let root = name(0);
            let mut base = 0.0;
            b.iter(|| {
                base += 1.0;
                store.set_base_value(&root, base).expect("root exists");
                black_box(store.get_value(&last))
            });
        });

        group.bench_function(format!("attach_detach(n={n},r={reads})"), |b| {
            let mut store = build_store(n, reads, 0xA77A_0000_0000_0004);
            let source = name(0);
            b.iter(|| {
                let id = store
                    .add_modifier(Modifier::sync_from(last.as_str(), source.as_str()))
                    .expect("source is upstream of the target");
                black_box(store.remove_modifier(id))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_attributes);
criterion_main!(benches);
