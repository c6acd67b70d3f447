//! Model state: every node-indexed array, plus the particle/reference-
//! particle arenas, neighbor lists, bond-fracture store, spatial index,
//! loading objects, clocks, and keyed metrics.
//!
//! Grounded on `original_source/src/model/modelData.h` for the node-array
//! set; container shape (a single struct owning everything for one run)
//! mirrors the workspace's world-container convention of one struct per
//! live simulation instance.

use glam::DVec3;
use smallvec::SmallVec;

use crate::fracture::FractureStore;
use crate::loading::Loading;
use crate::metrics::SimMetrics;
use crate::nsearch::KdTree;
use crate::particle::{Particle, ReferenceParticleHandle};
use peridem_geometry::Geometry;

/// Global node identifier — a newtype so it cannot be confused with a
/// particle-local index at a call site (DESIGN NOTES: the original C++
/// cannot express this distinction in its type system).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Node-indexed structure-of-arrays: one parallel `Vec` per §3 quantity.
pub struct Nodes {
  pub reference_position: Vec<DVec3>,
  pub position: Vec<DVec3>,
  pub displacement: Vec<DVec3>,
  pub velocity: Vec<DVec3>,
  pub force: Vec<DVec3>,
  pub volume: Vec<f64>,
  /// bits 0,1,2 = x,y,z fixed flags.
  pub fixity: Vec<u8>,
  pub weighted_volume: Vec<f64>,
  pub dilation: Vec<f64>,
  pub damage: Vec<f64>,
  pub particle_id: Vec<u32>,
  pub velocity_magnitude: Vec<f64>,
}

impl Nodes {
  pub fn with_capacity(n: usize) -> Self {
    Self {
      reference_position: Vec::with_capacity(n),
      position: Vec::with_capacity(n),
      displacement: Vec::with_capacity(n),
      velocity: Vec::with_capacity(n),
      force: Vec::with_capacity(n),
      volume: Vec::with_capacity(n),
      fixity: Vec::with_capacity(n),
      weighted_volume: Vec::with_capacity(n),
      dilation: Vec::with_capacity(n),
      damage: Vec::with_capacity(n),
      particle_id: Vec::with_capacity(n),
      velocity_magnitude: Vec::with_capacity(n),
    }
  }

  pub fn len(&self) -> usize {
    self.position.len()
  }

  pub fn is_empty(&self) -> bool {
    self.position.is_empty()
  }

  #[inline]
  pub fn is_dof_fixed(&self, node: NodeId, dof: usize) -> bool {
    (self.fixity[node.index()] & (1 << dof)) != 0
  }

  #[inline]
  pub fn set_dof_fixed(&mut self, node: NodeId, dof: usize) {
    self.fixity[node.index()] |= 1 << dof;
  }
}

/// Everything needed to run one simulation: owns node arrays, particle
/// instances, reference particles, neighbor lists, the bond-fracture
/// store, the spatial index, loading objects, clocks, and metrics.
pub struct ModelState {
  pub nodes: Nodes,
  pub particles: Vec<Particle>,
  pub reference_particles: Vec<crate::mesh::ReferenceMesh>,
  /// One entry per zone, indexed by `Particle::geometry`/`GeometryHandle`.
  pub geometries: Vec<Geometry>,
  pub fracture: FractureStore,
  /// Fixed peridynamic neighbor lists, one per node; `SmallVec` gives
  /// bounded small-size inline storage for per-node bounded collections.
  pub pd_neighbors: Vec<SmallVec<[u32; 16]>>,
  pub contact_neighbors: Vec<Vec<u32>>,
  pub wall_neighbors: Vec<Vec<u32>>,
  pub kd_tree: Option<KdTree>,
  pub loadings: Vec<Loading>,
  pub step: u64,
  pub time: f64,
  pub metrics: SimMetrics,
}

impl ModelState {
  pub fn new() -> Self {
    Self {
      nodes: Nodes::with_capacity(0),
      particles: Vec::new(),
      reference_particles: Vec::new(),
      geometries: Vec::new(),
      fracture: FractureStore::new(&[]),
      pd_neighbors: Vec::new(),
      contact_neighbors: Vec::new(),
      wall_neighbors: Vec::new(),
      kd_tree: None,
      loadings: Vec::new(),
      step: 0,
      time: 0.0,
      metrics: SimMetrics::new(),
    }
  }

  pub fn reference_particle(&self, handle: ReferenceParticleHandle) -> &crate::mesh::ReferenceMesh {
    &self.reference_particles[handle.0 as usize]
  }

  /// Particle-local accessor: shifts `local` by the particle's `globStart`.
  #[inline]
  pub fn local_node(&self, particle_idx: usize, local: usize) -> NodeId {
    NodeId(self.particles[particle_idx].local_to_global(local) as u32)
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }
}

impl Default for ModelState {
  fn default() -> Self {
    Self::new()
  }
}
