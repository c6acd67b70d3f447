//! Run orchestration: `init()` constructs a `ModelState` from a zone/
//! particle blueprint, `run()` drives the time loop, `close()` hands the
//! final state back to the caller.
//!
//! Grounded on `original_source/src/model/demModel.cpp`'s
//! `run()`/`init()`/`integrate()` sequence; the resource-holding shape
//! (one struct owning the thread pool plus everything a run touches)
//! treats the thread pool as an injected resource constructed once and
//! reused, not a global — honored by wrapping the whole time loop in
//! `pool.install(..)` rather than threading `&ThreadPool` through every
//! stage signature, since `install` already scopes every nested
//! `rayon::prelude` call spawned within it onto the injected pool.

use glam::DVec3;
use peridem_geometry::Geometry;
use rayon::ThreadPool;
use thiserror::Error;

use crate::integrate::Integrator;
use crate::loading::{self, Loading};
use crate::material::Material;
use crate::mesh::ReferenceMesh;
use crate::neighbor::NeighborManager;
use crate::particle::{GeometryHandle, MaterialHandle, Particle, ParticleId, ParticleKind, ReferenceParticleHandle, Transform};
use crate::pipeline::{self, ContactParams, ContactTable, Pipeline};
use crate::state::ModelState;

#[derive(Debug, Error)]
pub enum OrchestratorError {
  #[error("simulation setup defines no zones")]
  NoZones,
  #[error("particle instance references unknown zone id {0}")]
  UnknownZone(u32),
  #[error("failed to build thread pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One zone: the geometry region it occupies, the canonical mesh instanced
/// into every particle of the zone, and the material those particles obey.
pub struct ZoneBlueprint {
  pub geometry: Geometry,
  pub reference: ReferenceMesh,
  pub material: Material,
}

/// One concrete particle: which zone it's stamped from, its placement, and
/// whether it's a deformable particle or a (possibly fully fixed) wall.
pub struct ParticleInstanceSpec {
  pub zone_id: u32,
  pub kind: ParticleKind,
  pub transform: Transform,
  pub all_dofs_constrained: bool,
}

/// Contact coefficients between a pair of zones, keyed the same way as
/// `ContactTable`. `restitution` is the user-facing coefficient of
/// restitution ε, converted to β_n at setup (§4.L).
pub struct ContactPairSpec {
  pub zone_i: u32,
  pub zone_j: u32,
  pub r_c: f64,
  pub kn: f64,
  pub mu: f64,
  pub kappa: f64,
  pub restitution: f64,
}

/// Everything `Orchestrator::init` needs to build a runnable `ModelState`.
/// Deliberately independent of any file format: `peridem-io`'s input-deck
/// loader is responsible for producing this from a YAML deck.
pub struct SimulationSetup {
  pub zones: Vec<ZoneBlueprint>,
  pub particles: Vec<ParticleInstanceSpec>,
  pub contact_pairs: Vec<ContactPairSpec>,
  pub gravity: DVec3,
  pub loadings: Vec<Loading>,
  pub integrator: Integrator,
  pub dt: f64,
  pub num_steps: u64,
  pub output_interval: u64,
  pub neighbor_interval: u64,
  pub neighbor_s_factor: f64,
  pub stop: StopCriterion,
  pub n_threads: usize,
}

/// Termination condition checked once per step after output (§4.L).
#[derive(Clone, Copy, Debug)]
pub enum StopCriterion {
  MaxParticleDist { particle_a: u32, particle_b: u32, max_dist: f64 },
  MaxNodeDist { node_a: u32, node_b: u32, max_dist: f64 },
  None,
}

impl StopCriterion {
  pub fn is_met(&self, state: &ModelState) -> bool {
    match *self {
      StopCriterion::None => false,
      StopCriterion::MaxParticleDist { particle_a, particle_b, max_dist } => {
        let a = state.particles.iter().find(|p| p.id.0 == particle_a);
        let b = state.particles.iter().find(|p| p.id.0 == particle_b);
        match (a, b) {
          (Some(a), Some(b)) => particle_center(state, a).distance(particle_center(state, b)) >= max_dist,
          _ => false,
        }
      }
      StopCriterion::MaxNodeDist { node_a, node_b, max_dist } => {
        let (a, b) = (node_a as usize, node_b as usize);
        if a < state.node_count() && b < state.node_count() {
          state.nodes.position[a].distance(state.nodes.position[b]) >= max_dist
        } else {
          false
        }
      }
    }
  }
}

fn particle_center(state: &ModelState, p: &Particle) -> DVec3 {
  let mut center = DVec3::ZERO;
  let mut n = 0.0;
  for i in p.node_range.clone() {
    center += state.nodes.position[i];
    n += 1.0;
  }
  if n > 0.0 {
    center / n
  } else {
    center
  }
}

/// Owns the injected thread pool and every piece of state a run touches.
pub struct Orchestrator {
  pool: ThreadPool,
  state: ModelState,
  materials: Vec<Material>,
  pipeline: Pipeline,
  neighbor_mgr: NeighborManager,
  integrator: Integrator,
  dt: f64,
  num_steps: u64,
  output_interval: u64,
  stop: StopCriterion,
  on_output: Option<Box<dyn FnMut(&ModelState) + Send>>,
}

impl Orchestrator {
  /// `init()`: construct particles/nodes from the zone blueprints, resolve
  /// contact coefficients (including β_n from restitution), build the
  /// KD-tree and both neighbor lists, size the bond-fracture store, attach
  /// loadings, and select which particles get force computed.
  pub fn init(setup: SimulationSetup) -> Result<Self, OrchestratorError> {
    if setup.zones.is_empty() {
      return Err(OrchestratorError::NoZones);
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(setup.n_threads.max(1)).build()?;

    let mut state = ModelState::new();
    let mut materials = Vec::with_capacity(setup.zones.len());
    for zone in setup.zones {
      let reference_handle = ReferenceParticleHandle(state.reference_particles.len() as u32);
      let geometry_handle = GeometryHandle(state.geometries.len() as u32);
      debug_assert_eq!(reference_handle.0, geometry_handle.0, "one geometry/mesh/material triple per zone, arenas kept in lockstep");
      state.reference_particles.push(zone.reference);
      state.geometries.push(zone.geometry);
      materials.push(zone.material);
    }

    for spec in setup.particles {
      let zone_idx = spec.zone_id as usize;
      if zone_idx >= state.reference_particles.len() {
        return Err(OrchestratorError::UnknownZone(spec.zone_id));
      }
      stamp_particle(&mut state, &materials, zone_idx, spec);
    }

    build_peridynamic_neighbors(&mut state);
    state.fracture = crate::fracture::FractureStore::new(&state.pd_neighbors.iter().map(|n| n.len()).collect::<Vec<_>>());

    let mut contact = ContactTable::new();
    for pair in &setup.contact_pairs {
      let eps = pair.restitution.clamp(1e-6, 1.0 - 1e-9);
      let ln_eps = eps.ln();
      let beta_n_factor = -2.0 * ln_eps / (std::f64::consts::PI.powi(2) + ln_eps * ln_eps).sqrt();
      contact.insert(
        pair.zone_i,
        pair.zone_j,
        ContactParams {
          r_c: pair.r_c,
          kn: pair.kn,
          beta_n_factor,
          mu: pair.mu,
          kappa: pair.kappa,
        },
      );
    }

    let neighbor_mgr = NeighborManager::new(setup.neighbor_interval, setup.neighbor_s_factor, contact.r_c_max());
    pipeline::rebuild_contact_neighbors(&mut state, &neighbor_mgr);

    state.loadings = setup.loadings;
    loading::assign_fixity(&mut state);

    let pipeline = Pipeline::new(contact, setup.gravity);

    Ok(Self {
      pool,
      state,
      materials,
      pipeline,
      neighbor_mgr,
      integrator: setup.integrator,
      dt: setup.dt,
      num_steps: setup.num_steps,
      output_interval: setup.output_interval,
      stop: setup.stop,
      on_output: None,
    })
  }

  /// Install a callback invoked every `output_interval` steps, e.g. a
  /// `peridem-io` writer's `write_step`.
  pub fn on_output(&mut self, sink: impl FnMut(&ModelState) + Send + 'static) {
    self.on_output = Some(Box::new(sink));
  }

  pub fn state(&self) -> &ModelState {
    &self.state
  }

  /// `run()`: drive the integrator loop for `num_steps`, emitting output on
  /// the configured cadence and checking the stop criterion once per step.
  /// The whole loop runs inside the injected thread pool.
  pub fn run(&mut self) {
    let Orchestrator {
      pool,
      state,
      materials,
      pipeline,
      neighbor_mgr,
      integrator,
      dt,
      num_steps,
      output_interval,
      stop,
      on_output,
    } = self;
    let dt = *dt;
    let num_steps = *num_steps;
    let output_interval = *output_interval;
    let integrator = *integrator;

    pool.install(|| {
      for _ in 0..num_steps {
        integrator.step(state, pipeline, neighbor_mgr, materials.as_slice(), dt);

        if output_interval > 0 && state.step % output_interval == 0 {
          if let Some(sink) = on_output.as_mut() {
            sink(state);
          }
        }

        if stop.is_met(state) {
          break;
        }
      }
    });
  }

  /// `close()`: hand back the final state for inspection or a last write.
  pub fn close(self) -> ModelState {
    self.state
  }
}

fn stamp_particle(state: &mut ModelState, materials: &[Material], zone_idx: usize, spec: ParticleInstanceSpec) {
  let material = &materials[zone_idx];
  let mesh_node_count = state.reference_particles[zone_idx].node_count();
  let scale3 = spec.transform.scale.powi(3);
  let start = state.nodes.len();
  // A wall (or any particle) with every dof constrained never integrates;
  // fix all three components up front rather than leaning on a loading to
  // do it (§4.L "selects compute-force nodes" applies the same exemption).
  let initial_fixity: u8 = if spec.all_dofs_constrained { 0b111 } else { 0 };

  for local in 0..mesh_node_count {
    let x_ref_local = state.reference_particles[zone_idx].nodes[local];
    let x0 = spec.transform.apply(x_ref_local);
    let vol = state.reference_particles[zone_idx].volumes[local] * scale3;

    state.nodes.reference_position.push(x0);
    state.nodes.position.push(x0);
    state.nodes.displacement.push(DVec3::ZERO);
    state.nodes.velocity.push(DVec3::ZERO);
    state.nodes.force.push(DVec3::ZERO);
    state.nodes.volume.push(vol);
    state.nodes.fixity.push(initial_fixity);
    state.nodes.weighted_volume.push(0.0);
    state.nodes.dilation.push(0.0);
    state.nodes.damage.push(0.0);
    state.nodes.particle_id.push(state.particles.len() as u32);
    state.nodes.velocity_magnitude.push(0.0);
  }

  let h = state.reference_particles[zone_idx].h() * spec.transform.scale;
  let horizon = material.horizon();
  let (kn, rc) = Particle::internal_contact_coefficients(material.elastic_constants().k, horizon, h);
  let is_wall = matches!(spec.kind, ParticleKind::Wall);

  state.particles.push(Particle {
    id: ParticleId(state.particles.len() as u32),
    kind: spec.kind,
    zone_id: spec.zone_id,
    reference: ReferenceParticleHandle(zone_idx as u32),
    geometry: GeometryHandle(zone_idx as u32),
    transform: spec.transform,
    material: MaterialHandle(zone_idx as u32),
    horizon,
    h,
    density: material.density(),
    kn,
    rc,
    all_dofs_constrained: spec.all_dofs_constrained,
    // Skip force computation on walls that can never move; matches the
    // original's freeze-static-walls optimization (§4.L "selects
    // compute-force nodes").
    compute_force: !(is_wall && spec.all_dofs_constrained),
    node_range: start..start + mesh_node_count,
  });
}

/// Fixed peridynamic neighborhoods: within `horizon` of each node, in the
/// *reference* configuration, restricted to the node's own particle. The
/// reference-configuration KD-tree plus the fused include-tag search
/// (`nsearch::radius_search_include_tag`) does both the distance and the
/// same-particle filtering in one fused traversal.
fn build_peridynamic_neighbors(state: &mut ModelState) {
  let (tree, _) = crate::nsearch::KdTree::build(&state.nodes.reference_position);
  let tags: Vec<u64> = state.nodes.particle_id.iter().map(|&p| p as u64).collect();
  let n = state.node_count();

  let lists: Vec<smallvec::SmallVec<[u32; 16]>> = (0..n)
    .map(|i| {
      let q = state.nodes.reference_position[i];
      let particle_idx = state.nodes.particle_id[i] as usize;
      let horizon = state.particles[particle_idx].horizon;
      let (ids, _) = tree.radius_search_include_tag(q, horizon, tags[i], &tags);
      ids.into_iter().filter(|&id| id as usize != i).collect::<smallvec::SmallVec<[u32; 16]>>()
    })
    .collect();
  state.pd_neighbors = lists;
}
