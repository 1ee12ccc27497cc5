// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbor_dirty::{DependencyTable, Scope};
use arbor_location::Location;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

const COMPONENT: u8 = 0;
const CONTEXT: u8 = 1;

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

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

/// Locations of a tree with `fanout` children per node, breadth first.
fn tree_locations(n: usize, fanout: usize) -> Vec<Location> {
    let mut locations = vec![Location::anchor()];
    let mut next = 0;
    while locations.len() < n {
        let parent = locations[next].clone();
        for position in 0..fanout {
            if locations.len() == n {
                break;
            }
            locations.push(parent.child(position));
        }
        next += 1;
    }
    locations
}

/// Every location reads its own component and the context of a random
/// earlier location.
fn build_table(locations: &[Location], seed: u64) -> DependencyTable<Location, u8> {
    let mut table = DependencyTable::new();
    let mut rng = Lcg::new(seed);
    for (index, location) in locations.iter().enumerate() {
        table.record(location.clone(), COMPONENT, location.clone(), Scope::Exact);
        let producer = &locations[rng.gen_range_usize(index + 1)];
        table.record(producer.clone(), CONTEXT, location.clone(), Scope::Exact);
    }
    table
}

fn bench_dependencies(c: &mut Criterion) {
    let mut group = c.benchmark_group("arbor_dirty");
    group.sample_size(50);

    for &(n, fanout) in &[(256_usize, 4_usize), (4_096, 4), (4_096, 16)] {
        let locations = tree_locations(n, fanout);

        group.bench_function(format!("record(n={n},f={fanout})"), |b| {
            b.iter(|| black_box(build_table(&locations, 0xA7B0_0000_0000_0001)));
        });

        group.bench_function(format!("take_dependents(n={n},f={fanout})"), |b| {
            b.iter_batched(
                || build_table(&locations, 0xA7B0_0000_0000_0002),
                |mut table| {
                    let mut taken = 0;
                    for location in &locations {
                        taken += table.take_dependents(location, CONTEXT, Scope::Exact).len();
                    }
                    black_box(taken);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("forget_consumer(n={n},f={fanout})"), |b| {
            b.iter_batched(
                || build_table(&locations, 0xA7B0_0000_0000_0003),
                |mut table| {
                    let forgotten: usize = locations
                        .iter()
                        .map(|location| table.forget_consumer(location))
                        .sum();
                    black_box(forgotten);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dependencies);
criterion_main!(benches);
