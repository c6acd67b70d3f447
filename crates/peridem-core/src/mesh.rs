//! Reference-configuration mesh for a zone: nodes, volumes, element
//! connectivity. Grounded on `original_source/src/mesh/meshUtil.h`
//! (node/volume/connectivity shape) and `meshUtil.h`'s VTK-numbered
//! element types; derived-quantity-once-at-construction style mirrors the
//! teacher's `octree/config.rs::OctreeConfig`.

use glam::DVec3;

/// VTK cell-type numbering, per spec §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
  Line = 3,
  Triangle = 5,
  Quad = 9,
  Tetra = 10,
}

/// Canonical mesh for a zone, instanced per particle via scale/rotate/
/// translate. No runtime mutation after `finalize()`.
pub struct ReferenceMesh {
  pub nodes: Vec<DVec3>,
  pub volumes: Vec<f64>,
  pub connectivity: Vec<Vec<usize>>,
  pub element_type: ElementType,
  pub dim: u8,

  bbox: peridem_geometry::Aabb,
  bounding_radius: f64,
  inscribed_radius: f64,
  h: f64,
  center_node: usize,
}

impl ReferenceMesh {
  /// Build from raw mesh data and compute every derived quantity once
  /// (bbox, radii, spacing, center node) rather than per-query.
  pub fn new(nodes: Vec<DVec3>, volumes: Vec<f64>, connectivity: Vec<Vec<usize>>, element_type: ElementType, dim: u8) -> Self {
    let mut bbox = peridem_geometry::Aabb::empty();
    for &n in &nodes {
      bbox.encapsulate(n);
    }
    let center = bbox.center();

    let bounding_radius = nodes.iter().map(|n| (*n - center).length()).fold(0.0_f64, f64::max);
    let inscribed_radius = bbox.inscribed_radius();

    let h = min_pairwise_distance(&nodes);

    let center_node = nodes
      .iter()
      .enumerate()
      .min_by(|(_, a), (_, b)| (**a - center).length_squared().partial_cmp(&(**b - center).length_squared()).unwrap())
      .map(|(i, _)| i)
      .unwrap_or(0);

    Self {
      nodes,
      volumes,
      connectivity,
      element_type,
      dim,
      bbox,
      bounding_radius,
      inscribed_radius,
      h,
      center_node,
    }
  }

  pub fn bbox(&self) -> peridem_geometry::Aabb {
    self.bbox
  }

  pub fn bounding_radius(&self) -> f64 {
    self.bounding_radius
  }

  pub fn inscribed_radius(&self) -> f64 {
    self.inscribed_radius
  }

  /// Minimum pairwise nodal distance, used as the mesh spacing `h`.
  pub fn h(&self) -> f64 {
    self.h
  }

  pub fn center_node(&self) -> usize {
    self.center_node
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }
}

/// O(n²) exact minimum pairwise distance. Reference meshes are built once
/// at setup on modest node counts per particle; this is not a per-step hot
/// path, so brute force is preferred over a spatial index here.
fn min_pairwise_distance(nodes: &[DVec3]) -> f64 {
  let mut min = f64::INFINITY;
  for i in 0..nodes.len() {
    for j in (i + 1)..nodes.len() {
      let d = nodes[i].distance(nodes[j]);
      if d < min {
        min = d;
      }
    }
  }
  if min.is_finite() {
    min
  } else {
    0.0
  }
}
