//! KD-tree build and radius-search benchmarks, at grid sizes representative
//! of a contact-neighbor rebuild over a few thousand nodes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec3;
use peridem_core::KdTree;

fn grid_points(n_per_axis: usize, spacing: f64) -> Vec<DVec3> {
  let mut pts = Vec::with_capacity(n_per_axis * n_per_axis * n_per_axis);
  for x in 0..n_per_axis {
    for y in 0..n_per_axis {
      for z in 0..n_per_axis {
        pts.push(DVec3::new(x as f64 * spacing, y as f64 * spacing, z as f64 * spacing));
      }
    }
  }
  pts
}

fn bench_build(c: &mut Criterion) {
  let mut group = c.benchmark_group("nsearch/build");
  for &n in &[8usize, 16, 24] {
    let pts = grid_points(n, 1.0);
    group.bench_with_input(BenchmarkId::new("grid", pts.len()), &pts, |b, pts| {
      b.iter(|| KdTree::build(black_box(pts)));
    });
  }
  group.finish();
}

fn bench_radius_search(c: &mut Criterion) {
  let mut group = c.benchmark_group("nsearch/radius_search");
  let pts = grid_points(20, 1.0);
  let (tree, _) = KdTree::build(&pts);
  let tags: Vec<u64> = (0..pts.len()).map(|i| (i % 4) as u64).collect();
  let q = pts[pts.len() / 2];

  group.bench_function("plain_r3", |b| {
    b.iter(|| tree.radius_search(black_box(q), black_box(3.0)));
  });
  group.bench_function("exclude_tag_r3", |b| {
    b.iter(|| tree.radius_search_exclude_tag(black_box(q), black_box(3.0), tags[pts.len() / 2], &tags));
  });
  group.bench_function("include_tag_r3", |b| {
    b.iter(|| tree.radius_search_include_tag(black_box(q), black_box(3.0), tags[pts.len() / 2], &tags));
  });

  group.finish();
}

criterion_group!(benches, bench_build, bench_radius_search);
criterion_main!(benches);
