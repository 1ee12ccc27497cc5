// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbor::{
    Body, Component, ContextKey, Contextual, Empty, ForEach, IntoComponent, PropertyField,
    RenderResult, Shadow, ShadowGraph, State, ready,
};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use futures::executor::block_on;

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

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u32() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

struct Depth;

impl ContextKey for Depth {
    type Value = u32;
}

#[derive(Clone, Debug, Default)]
struct Row {
    selected: State<bool>,
    depth: Contextual<Depth>,
}

impl Component for Row {
    fn body(&self) -> Body<'_> {
        ready(Empty)
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![
            PropertyField::new("selected", &mut self.selected),
            PropertyField::new("depth", &mut self.depth),
        ]
    }
}

#[derive(Clone, Debug)]
struct Table {
    rows: State<Vec<u32>>,
}

impl Component for Table {
    fn body(&self) -> Body<'_> {
        let rows = ForEach::new(self.rows.get().clone(), |id| *id, |_| Row::default());
        ready(rows.context::<Depth>(1))
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![PropertyField::new("rows", &mut self.rows)]
    }
}

fn table(n: u32) -> Table {
    Table {
        rows: State::new((0..n).collect()),
    }
}

async fn render_all(graph: &ShadowGraph) -> RenderResult<Vec<Shadow>> {
    graph.root().await?.child_list().await
}

fn rendered(n: u32) -> (ShadowGraph, Vec<Shadow>) {
    let graph = ShadowGraph::new(table(n));
    let rows = block_on(render_all(&graph)).unwrap();
    (graph, rows)
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("arbor");
    group.sample_size(30);

    for &n in &[64_u32, 1_024] {
        group.bench_function(format!("initial_render(rows={n})"), |b| {
            b.iter_batched(
                || ShadowGraph::new(table(n)),
                |graph| black_box(block_on(render_all(&graph)).unwrap().len()),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("cached_render(rows={n})"), |b| {
            let (graph, _) = rendered(n);
            b.iter(|| black_box(block_on(render_all(&graph)).unwrap().len()));
        });

        group.bench_function(format!("select_one(rows={n})"), |b| {
            b.iter_batched(
                || rendered(n),
                |(graph, rows)| {
                    let row = rows[rows.len() / 2].subject_as::<Row>().unwrap();
                    row.selected.set(true);
                    black_box(block_on(render_all(&graph)).unwrap().len())
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("shuffle_rows(rows={n})"), |b| {
            let mut rng = Lcg::new(0xA7B0_0000_0000_0004);
            b.iter_batched(
                || {
                    let (graph, _) = rendered(n);
                    let mut order: Vec<u32> = (0..n).collect();
                    rng.shuffle(&mut order);
                    (graph, order)
                },
                |(graph, order)| {
                    let root = block_on(graph.root()).unwrap();
                    root.subject_as::<Table>().unwrap().rows.set(order);
                    black_box(block_on(render_all(&graph)).unwrap().len())
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
