//! Static KD-tree over a 3D point cloud with tag-fused radius search.
//!
//! Grounded on `original_source/src/nsearch/nsearch.h`'s `BaseNSearch`
//! contract (`radiusSearch`/`radiusSearchExcludeTag`/
//! `radiusSearchIncludeTag`/`closestPoint`), which there wraps nanoflann.
//! Here the tree is a from-scratch, pure-Rust implementation: the
//! exclude/include tag tests must be fused into traversal rather than
//! applied as a post-filter, which rules out wrapping a generic
//! nearest-neighbor crate that only exposes plain radius search.

use std::time::{Duration, Instant};

use glam::DVec3;

/// One KD-tree node: a point, its original index into the input slice, and
/// the splitting axis chosen at this level (cycles 0,1,2 with tree depth).
struct Node {
  point: DVec3,
  index: u32,
  axis: u8,
  left: Option<u32>,
  right: Option<u32>,
}

/// Immutable point-set spatial index, rebuilt wholesale whenever the
/// underlying positions change materially (see `NeighborManager`).
pub struct KdTree {
  nodes: Vec<Node>,
  root: Option<u32>,
}

impl KdTree {
  /// Build a balanced tree over `points` via median-of-three recursive
  /// partition. Returns the wall-clock time spent, mirroring the original
  /// API returning the setup cost instead of discarding it.
  pub fn build(points: &[DVec3]) -> (Self, Duration) {
    let start = Instant::now();
    let mut indices: Vec<u32> = (0..points.len() as u32).collect();
    let mut nodes = Vec::with_capacity(points.len());
    let root = Self::build_recursive(points, &mut indices, 0, &mut nodes);
    (Self { nodes, root }, start.elapsed())
  }

  fn build_recursive(points: &[DVec3], indices: &mut [u32], depth: u32, nodes: &mut Vec<Node>) -> Option<u32> {
    if indices.is_empty() {
      return None;
    }
    let axis = (depth % 3) as u8;
    let mid = indices.len() / 2;
    indices.select_nth_unstable_by(mid, |a, b| {
      coord(points[*a as usize], axis)
        .partial_cmp(&coord(points[*b as usize], axis))
        .unwrap()
    });
    let pivot = indices[mid];
    let (left_idx, right_idx) = indices.split_at_mut(mid);
    let right_idx = &mut right_idx[1..];

    let left = Self::build_recursive(points, left_idx, depth + 1, nodes);
    let right = Self::build_recursive(points, right_idx, depth + 1, nodes);

    nodes.push(Node {
      point: points[pivot as usize],
      index: pivot,
      axis,
      left,
      right,
    });
    Some(nodes.len() as u32 - 1)
  }

  fn node(&self, id: u32) -> &Node {
    &self.nodes[id as usize]
  }

  /// All point indices within Euclidean distance `r` of `q`, each paired
  /// with the squared distance. Unsorted, per the contract.
  pub fn radius_search(&self, q: DVec3, r: f64) -> (Vec<u32>, Vec<f64>) {
    let mut ids = Vec::new();
    let mut dists = Vec::new();
    self.radius_search_filtered(q, r, |_| true, &mut ids, &mut dists);
    (ids, dists)
  }

  /// As `radius_search`, but skips points whose tag equals `query_tag`.
  pub fn radius_search_exclude_tag(&self, q: DVec3, r: f64, query_tag: u64, tags: &[u64]) -> (Vec<u32>, Vec<f64>) {
    let mut ids = Vec::new();
    let mut dists = Vec::new();
    self.radius_search_filtered(q, r, |idx| tags[idx as usize] != query_tag, &mut ids, &mut dists);
    (ids, dists)
  }

  /// As `radius_search`, but skips points whose tag differs from
  /// `query_tag`.
  pub fn radius_search_include_tag(&self, q: DVec3, r: f64, query_tag: u64, tags: &[u64]) -> (Vec<u32>, Vec<f64>) {
    let mut ids = Vec::new();
    let mut dists = Vec::new();
    self.radius_search_filtered(q, r, |idx| tags[idx as usize] == query_tag, &mut ids, &mut dists);
    (ids, dists)
  }

  /// Shared traversal core: the tag predicate is evaluated inline at each
  /// candidate, never as a pass over an already-collected vector.
  fn radius_search_filtered(&self, q: DVec3, r: f64, keep: impl Fn(u32) -> bool, ids: &mut Vec<u32>, dists: &mut Vec<f64>) {
    let Some(root) = self.root else { return };
    let r2 = r * r;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
      let node = self.node(id);
      let d2 = node.point.distance_squared(q);
      if d2 < r2 && keep(node.index) {
        ids.push(node.index);
        dists.push(d2);
      }
      let delta = coord(q, node.axis) - coord(node.point, node.axis);
      let (near, far) = if delta <= 0.0 { (node.left, node.right) } else { (node.right, node.left) };
      if let Some(n) = near {
        stack.push(n);
      }
      if delta * delta < r2 {
        if let Some(f) = far {
          stack.push(f);
        }
      }
    }
  }

  /// Nearest point to `q` and its distance, or `None` for an empty tree.
  pub fn closest_point(&self, q: DVec3) -> Option<(u32, f64)> {
    let root = self.root?;
    let mut best: Option<(u32, f64)> = None;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
      let node = self.node(id);
      let d2 = node.point.distance_squared(q);
      if best.map_or(true, |(_, bd2)| d2 < bd2) {
        best = Some((node.index, d2));
      }
      let delta = coord(q, node.axis) - coord(node.point, node.axis);
      let (near, far) = if delta <= 0.0 { (node.left, node.right) } else { (node.right, node.left) };
      if let Some(n) = near {
        stack.push(n);
      }
      let bound = best.map_or(f64::INFINITY, |(_, bd2)| bd2);
      if delta * delta < bound {
        if let Some(f) = far {
          stack.push(f);
        }
      }
    }
    best.map(|(idx, d2)| (idx, d2.sqrt()))
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

fn coord(p: DVec3, axis: u8) -> f64 {
  match axis {
    0 => p.x,
    1 => p.y,
    _ => p.z,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn brute_force(points: &[DVec3], q: DVec3, r: f64) -> Vec<u32> {
    let mut out: Vec<u32> = points
      .iter()
      .enumerate()
      .filter(|(_, p)| p.distance_squared(q) < r * r)
      .map(|(i, _)| i as u32)
      .collect();
    out.sort_unstable();
    out
  }

  fn grid_points() -> Vec<DVec3> {
    let mut pts = Vec::new();
    for x in 0..8 {
      for y in 0..8 {
        pts.push(DVec3::new(x as f64, y as f64, 0.0));
      }
    }
    pts
  }

  #[test]
  fn radius_search_matches_brute_force() {
    let pts = grid_points();
    let (tree, _) = KdTree::build(&pts);
    let q = DVec3::new(3.5, 3.5, 0.0);
    let (mut ids, _) = tree.radius_search(q, 2.0);
    ids.sort_unstable();
    assert_eq!(ids, brute_force(&pts, q, 2.0));
  }

  #[test]
  fn exclude_tag_skips_same_tag_points() {
    let pts = grid_points();
    let tags: Vec<u64> = (0..pts.len()).map(|i| (i % 2) as u64).collect();
    let (tree, _) = KdTree::build(&pts);
    let q = pts[0];
    let (ids, _) = tree.radius_search_exclude_tag(q, 3.0, tags[0], &tags);
    assert!(ids.iter().all(|&i| tags[i as usize] != tags[0]));
  }

  #[test]
  fn include_tag_keeps_only_same_tag_points() {
    let pts = grid_points();
    let tags: Vec<u64> = (0..pts.len()).map(|i| (i % 3) as u64).collect();
    let (tree, _) = KdTree::build(&pts);
    let q = pts[0];
    let (ids, _) = tree.radius_search_include_tag(q, 3.0, tags[0], &tags);
    assert!(ids.iter().all(|&i| tags[i as usize] == tags[0]));
  }

  #[test]
  fn closest_point_matches_brute_force() {
    let pts = grid_points();
    let (tree, _) = KdTree::build(&pts);
    let q = DVec3::new(2.2, 5.9, 0.0);
    let (id, _) = tree.closest_point(q).unwrap();
    let brute = pts
      .iter()
      .enumerate()
      .min_by(|(_, a), (_, b)| a.distance_squared(q).partial_cmp(&b.distance_squared(q)).unwrap())
      .unwrap()
      .0;
    assert_eq!(id as usize, brute);
  }

  #[test]
  fn boundary_point_at_exact_radius_is_excluded() {
    let pts = vec![DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)];
    let (tree, _) = KdTree::build(&pts);
    let (ids, _) = tree.radius_search(DVec3::ZERO, 1.0);
    assert!(!ids.contains(&1));
  }
}
