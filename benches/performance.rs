// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meshfit::geometry::{primitives, AabbTree};
use meshfit::{project, project_with_params, ProjectionParams};
use nalgebra::Point3;

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree");

    let target = primitives::sphere(1.0, 32, 48);
    group.bench_function("build_sphere_32x48", |b| {
        b.iter(|| AabbTree::build(black_box(&target)).unwrap());
    });

    let tree = AabbTree::build(&target).unwrap();
    let queries: Vec<Point3<f64>> = (0..1000)
        .map(|i| {
            let t = i as f64 / 1000.0;
            Point3::new(
                (t * 37.0).sin() * 1.5,
                (t * 53.0).cos() * 1.5,
                2.0 * t - 1.0,
            )
        })
        .collect();
    group.bench_function("query_batch_1000", |b| {
        b.iter(|| tree.query(black_box(&queries)));
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    group.sample_size(10);

    let target = primitives::sphere(1.0, 24, 36);
    let working = primitives::sphere(1.0, 12, 18);

    group.bench_function("sphere_no_refine", |b| {
        let params = ProjectionParams {
            refine_ratio: 1.0,
            max_refine_rounds: 0,
        };
        b.iter(|| project_with_params(black_box(&target), black_box(&working), &params).unwrap());
    });

    group.bench_function("sphere_refined", |b| {
        b.iter(|| project(black_box(&target), black_box(&working)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_tree, bench_projection);
criterion_main!(benches);
