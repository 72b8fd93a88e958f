// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_tree_sync::patch::{diff_by, diff_unique};
use understory_tree_sync::{
    BuilderConfig, ConsistencyChecks, MultiParent, NodeId, SingleParent, Tree, TreeBuilder,
    TreeModelFilter, TreeView,
};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

#[derive(Clone, Debug)]
struct Item {
    id: u32,
    parents: Vec<u32>,
}

/// `n` items, each with up to `fan` parents drawn from earlier ids.
fn gen_items(n: usize, fan: usize, seed: u64) -> Vec<Item> {
    let mut rng = Rng::new(seed);
    (0..n as u32)
        .map(|id| {
            let parents = if id == 0 {
                Vec::new()
            } else {
                (0..1 + rng.below(fan))
                    .map(|_| rng.below(id as usize) as u32)
                    .collect()
            };
            Item { id, parents }
        })
        .collect()
}

fn quiet() -> BuilderConfig {
    BuilderConfig::new().checks(ConsistencyChecks::empty())
}

/// A source tree with `n` nodes; payloads are their creation order.
fn gen_tree(n: usize, seed: u64) -> Tree<u32> {
    let mut rng = Rng::new(seed);
    let mut tree = Tree::with_root(Some(0));
    let mut nodes: Vec<NodeId> = tree.root().into_iter().collect();
    for i in 1..n as u32 {
        let parent = nodes[rng.below(nodes.len())];
        let node = tree.create(Some(i));
        let _ = tree.append(parent, node);
        nodes.push(node);
    }
    tree
}

fn bench_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("builder");
    for &n in &[256usize, 1024, 4096] {
        let items = gen_items(n, 1, 7);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("add_all_single_parent_n{}", n), |b| {
            b.iter_batched(
                || {
                    TreeBuilder::new(SingleParent::new(
                        |e: &Item| e.id,
                        |e: &Item| e.parents.first().copied(),
                    ))
                    .with_config(quiet())
                },
                |mut builder| {
                    builder.add_all(items.iter().cloned());
                    black_box(builder.tree().len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    let items = gen_items(1024, 3, 11);
    group.bench_function("add_all_multi_parent_reversed", |b| {
        b.iter_batched(
            || {
                TreeBuilder::new(MultiParent::new(|e: &Item| e.id, |e: &Item| e.parents.clone()))
                    .with_config(quiet())
            },
            |mut builder| {
                // Children first, so most of them wait as orphans.
                builder.add_all(items.iter().rev().cloned());
                black_box(builder.tree().len());
            },
            BatchSize::SmallInput,
        )
    });
    let reparented: Vec<Item> = gen_items(1024, 3, 13);
    group.bench_function("update_all_reparent", |b| {
        b.iter_batched(
            || {
                let mut builder = TreeBuilder::new(MultiParent::new(
                    |e: &Item| e.id,
                    |e: &Item| e.parents.clone(),
                ))
                .with_config(quiet());
                builder.add_all(items.iter().cloned());
                builder
            },
            |mut builder| {
                builder.update_all(reparented.iter().cloned());
                black_box(builder.tree().len());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    for &n in &[1024usize, 8192] {
        let tree = gen_tree(n, 3);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("attach_n{}", n), |b| {
            b.iter(|| {
                let mut filter = TreeModelFilter::new().with_predicate(|v: &u32| v % 3 != 0);
                filter.set_source_root(&tree, tree.root());
                black_box(filter.len());
            })
        });
        group.bench_function(format!("swap_predicate_n{}", n), |b| {
            b.iter_batched(
                || {
                    let mut filter = TreeModelFilter::new().with_predicate(|v: &u32| v % 3 != 0);
                    filter.set_source_root(&tree, tree.root());
                    filter
                },
                |mut filter| {
                    filter.set_predicate(&tree, Some(Box::new(|v: &u32| v % 5 != 0)));
                    black_box(filter.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.bench_function("sync_edit_stream", |b| {
        b.iter_batched(
            || {
                let tree = gen_tree(2048, 5);
                let mut filter = TreeModelFilter::new().with_predicate(|v: &u32| v % 2 == 0);
                filter.set_source_root(&tree, tree.root());
                (tree, filter)
            },
            |(mut tree, mut filter)| {
                let mut rng = Rng::new(17);
                let nodes: Vec<NodeId> = tree
                    .root()
                    .map_or_else(Vec::new, |r| tree.descendants(r).collect());
                for i in 0..256_u32 {
                    let node = nodes[rng.below(nodes.len())];
                    tree.set_user_object(node, Some(i));
                }
                filter.sync(&tree);
                black_box(filter.len());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch");
    for &n in &[64usize, 512] {
        let mut rng = Rng::new(23);
        let current: Vec<u32> = (0..n as u32).collect();
        let mut goal: Vec<u32> = current.iter().copied().filter(|_| rng.below(8) != 0).collect();
        for _ in 0..n / 8 {
            let at = rng.below(goal.len() + 1);
            goal.insert(at, n as u32 + rng.below(n) as u32);
        }
        let mut seen = std::collections::HashSet::new();
        goal.retain(|v| seen.insert(*v));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("diff_unique_n{}", n), |b| {
            b.iter(|| black_box(diff_unique(&current, &goal, |&c| c, |&g| g).len()))
        });
        group.bench_function(format!("diff_by_n{}", n), |b| {
            b.iter(|| black_box(diff_by(&current, &goal, |a, b| a == b).len()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_builder, bench_filter, bench_patch);
criterion_main!(benches);
