// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use smallvec::smallvec;
use understory_omnitree::{Bounds, Omnitree, Point};

type Plane = Omnitree<[f64; 2], f64, fn(&[f64; 2]) -> Point<f64>>;
type Space = Omnitree<[f64; 3], f64, fn(&[f64; 3]) -> Point<f64>>;

const EXTENT: f64 = 2000.0;

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
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn at2(p: &[f64; 2]) -> Point<f64> {
    smallvec![p[0], p[1]]
}

fn at3(p: &[f64; 3]) -> Point<f64> {
    smallvec![p[0], p[1], p[2]]
}

fn empty_plane() -> Plane {
    Omnitree::new(
        Bounds::from_slices(&[0.0, 0.0], &[EXTENT, EXTENT]),
        at2 as fn(&[f64; 2]) -> Point<f64>,
    )
    .unwrap()
}

fn empty_space() -> Space {
    Omnitree::new(
        Bounds::from_slices(&[0.0; 3], &[EXTENT; 3]),
        at3 as fn(&[f64; 3]) -> Point<f64>,
    )
    .unwrap()
}

fn gen_random_points(count: usize, seed: u64) -> Vec<[f64; 2]> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| [rng.next_f64() * EXTENT, rng.next_f64() * EXTENT])
        .collect()
}

fn gen_clustered_points(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<[f64; 2]> {
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    for _ in 0..n_clusters {
        let cx = spread + rng.next_f64() * (EXTENT - 2.0 * spread);
        let cy = spread + rng.next_f64() * (EXTENT - 2.0 * spread);
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push([cx + dx, cy + dy]);
        }
    }
    out
}

fn filled_plane(points: &[[f64; 2]]) -> Plane {
    let mut tree = empty_plane();
    tree.try_extend(points.iter().copied()).unwrap();
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &n in &[1_000usize, 10_000, 50_000] {
        let points = gen_random_points(n, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("random_2d_n{}", n), |b| {
            b.iter_batched(
                empty_plane,
                |mut tree| {
                    tree.try_extend(points.iter().copied()).unwrap();
                    black_box(tree.len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    let clustered = gen_clustered_points(16, 1_000, 50.0);
    group.throughput(Throughput::Elements(clustered.len() as u64));
    group.bench_function("clustered_2d", |b| {
        b.iter_batched(
            empty_plane,
            |mut tree| {
                tree.try_extend(clustered.iter().copied()).unwrap();
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        )
    });
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    let points: Vec<[f64; 3]> = (0..10_000)
        .map(|_| {
            [
                rng.next_f64() * EXTENT,
                rng.next_f64() * EXTENT,
                rng.next_f64() * EXTENT,
            ]
        })
        .collect();
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("random_3d_n10000", |b| {
        b.iter_batched(
            empty_space,
            |mut tree| {
                tree.try_extend(points.iter().copied()).unwrap();
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let points = gen_random_points(50_000, 0xBADC_F00D_1234_5678);
    let tree = filled_plane(&points);
    let region = Bounds::from_slices(&[800.0, 800.0], &[1200.0, 1200.0]);

    group.bench_function("visit_rect_n50000", |b| {
        b.iter(|| {
            let mut hits = 0_usize;
            tree.visit_rect(&region, |_| hits += 1).unwrap();
            black_box(hits);
        })
    });
    group.bench_function("query_rect_n50000", |b| {
        b.iter(|| black_box(tree.query_rect(&region).count()))
    });
    group.bench_function("count_in_n50000", |b| {
        b.iter(|| black_box(tree.count_in(&region).unwrap()))
    });
    let probes: Vec<[f64; 2]> = points.iter().step_by(97).copied().collect();
    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function("query_point_n50000", |b| {
        b.iter(|| {
            let mut hits = 0_usize;
            for p in &probes {
                hits += tree.query_point(p).count();
            }
            black_box(hits);
        })
    });
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    let points = gen_random_points(20_000, 0x0DDB_A11C_0FFE_E000);
    let tree = filled_plane(&points);
    group.bench_function("remove_in_quarter_n20000", |b| {
        let region = Bounds::from_slices(&[0.0, 0.0], &[EXTENT / 2.0, EXTENT / 2.0]);
        b.iter_batched(
            || tree.clone(),
            |mut tree| black_box(tree.remove_in(&region).unwrap()),
            BatchSize::LargeInput,
        )
    });
    group.bench_function("remove_where_half_n20000", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| black_box(tree.remove_where(|p| p[0] < EXTENT / 2.0).unwrap()),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    let points = gen_random_points(20_000, 0x5EED_5EED_5EED_5EED);
    let tree = filled_plane(&points);
    for &drift in &[1.0_f64, 50.0] {
        group.bench_function(format!("drift{}_n20000", drift), |b| {
            b.iter_batched(
                || {
                    let mut tree = tree.clone();
                    let mut rng = Rng::new(0xD21F_7000_0000_0001);
                    for p in tree.iter_mut() {
                        p[0] = (p[0] + (rng.next_f64() - 0.5) * drift).clamp(0.0, EXTENT);
                        p[1] = (p[1] + (rng.next_f64() - 0.5) * drift).clamp(0.0, EXTENT);
                    }
                    tree
                },
                |mut tree| {
                    tree.update().unwrap();
                    black_box(tree.len());
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_remove, bench_update);
criterion_main!(benches);
