//! Integration-level re-statements of the six concrete seed scenarios,
//! driven through the public pipeline/orchestrator surface rather than a
//! single formula in isolation.

use glam::DVec3;
use peridem_core::material::{ElasticConstants, InfluenceFn, Material, PmbParams, RnpParams};
use peridem_core::mesh::{ElementType, ReferenceMesh};
use peridem_core::orchestrator::{Orchestrator, ParticleInstanceSpec, SimulationSetup, StopCriterion, ZoneBlueprint};
use peridem_core::particle::{GeometryHandle, MaterialHandle, Particle, ParticleId, ParticleKind, ReferenceParticleHandle, Transform};
use peridem_core::state::{ModelState, Nodes};
use peridem_core::{pipeline, FractureStore, Integrator, NeighborManager};
use peridem_geometry::Geometry;

fn two_node_particle_state(material: Material, x1: DVec3, x2: DVec3) -> ModelState {
  let mut state = ModelState::new();
  state.nodes = Nodes::with_capacity(2);
  for x in [x1, x2] {
    state.nodes.reference_position.push(x);
    state.nodes.position.push(x);
    state.nodes.displacement.push(DVec3::ZERO);
    state.nodes.velocity.push(DVec3::ZERO);
    state.nodes.force.push(DVec3::ZERO);
    state.nodes.volume.push(1.0);
    state.nodes.fixity.push(0);
    state.nodes.weighted_volume.push(0.0);
    state.nodes.dilation.push(0.0);
    state.nodes.damage.push(0.0);
    state.nodes.particle_id.push(0);
    state.nodes.velocity_magnitude.push(0.0);
  }
  state.particles.push(Particle {
    id: ParticleId(0),
    kind: ParticleKind::Particle,
    zone_id: 0,
    reference: ReferenceParticleHandle(0),
    geometry: GeometryHandle(0),
    transform: Transform::identity(),
    material: MaterialHandle(0),
    horizon: material.horizon(),
    h: 0.01,
    density: material.density(),
    kn: 1.0,
    rc: 0.9,
    all_dofs_constrained: false,
    compute_force: true,
    node_range: 0..2,
  });
  state.pd_neighbors = vec![smallvec::smallvec![1], smallvec::smallvec![0]];
  state.fracture = FractureStore::new(&[1, 1]);
  state.contact_neighbors = vec![vec![], vec![]];
  state.wall_neighbors = vec![vec![], vec![]];
  state
}

/// Scenario 1: single-bond elastic RNP. Two nodes 0.1 apart, symmetric
/// displacement giving stretch s = 0.2, influence constant, beta = 1.
#[test]
fn single_bond_elastic_rnp_matches_closed_form() {
  let material = Material::Rnp(RnpParams {
    horizon: 0.15,
    density: 1.0,
    beta: 1.0,
    c: 1.0,
    factor_sc: 1.0,
    s_c: 1.0,
    influence: InfluenceFn::Constant,
    irreversible: false,
    elastic: ElasticConstants::resolve(Some(1.0), None, 0.25, None, None).unwrap(),
  });
  let mut state = two_node_particle_state(material, DVec3::ZERO, DVec3::new(0.1, 0.0, 0.0));
  state.nodes.displacement[0] = DVec3::new(-0.01, 0.0, 0.0);
  state.nodes.displacement[1] = DVec3::new(0.01, 0.0, 0.0);

  pipeline::peridynamic_force(&mut state, &[material]);

  let r = 0.1_f64;
  let s = 0.2_f64;
  let b_eps = (4.0 / 3.0) * std::f64::consts::PI * 0.15_f64.powi(3);
  let expected_mag = 4.0 * s * 1.0 * (-1.0_f64 * r * s * s).exp() / (0.15 * b_eps);

  assert!(state.nodes.force[0].x > 0.0, "node 1 pulled toward node 2 along +x");
  assert!((state.nodes.force[0].x - expected_mag).abs() < 1e-9);
  assert!(state.nodes.force[0].y.abs() < 1e-12 && state.nodes.force[0].z.abs() < 1e-12);
  assert!((state.nodes.force[0] + state.nodes.force[1]).length() < 1e-9, "bond pair forces are equal and opposite");
}

/// Scenario 2: PMB bond breaking. s=0.04 leaves the bond intact; s=0.06
/// breaks it; returning to s=0 never un-breaks it (irreversibility).
#[test]
fn pmb_bond_breaks_above_critical_stretch_and_stays_broken() {
  let material = Material::Pmb(PmbParams {
    horizon: 1.0,
    density: 1.0,
    c: 1.0,
    s_c: 0.05,
    influence: InfluenceFn::Constant,
    irreversible: true,
    elastic: ElasticConstants::resolve(Some(1.0), None, 0.25, None, None).unwrap(),
  });
  let mut state = two_node_particle_state(material, DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0));

  state.nodes.displacement[1] = DVec3::new(0.04, 0.0, 0.0);
  pipeline::peridynamic_force(&mut state, &[material]);
  assert!(!state.fracture.get(0, 0));
  assert_ne!(state.nodes.force[0], DVec3::ZERO);

  state.nodes.displacement[1] = DVec3::new(0.06, 0.0, 0.0);
  pipeline::peridynamic_force(&mut state, &[material]);
  assert!(state.fracture.get(0, 0));

  state.nodes.displacement[1] = DVec3::ZERO;
  pipeline::peridynamic_force(&mut state, &[material]);
  assert!(state.fracture.get(0, 0), "irreversibility: bond stays broken once s returns below s_c");
}

/// Scenario 3: two-particle normal contact, no fracture. Two single-node
/// "disks" penetrating by a fixed amount produce equal and opposite
/// repulsive forces sized by K_n * penetration * neighbor volume.
#[test]
fn two_particle_normal_contact_is_repulsive_and_sized_by_penetration() {
  let mut state = ModelState::new();
  state.nodes = Nodes::with_capacity(2);
  let penetration = 0.05;
  let volume = 2.0;
  for (y, pid) in [(0.0, 0u32), (2.0 - penetration, 1u32)] {
    let x = DVec3::new(0.0, y, 0.0);
    state.nodes.reference_position.push(x);
    state.nodes.position.push(x);
    state.nodes.displacement.push(DVec3::ZERO);
    state.nodes.velocity.push(DVec3::ZERO);
    state.nodes.force.push(DVec3::ZERO);
    state.nodes.volume.push(volume);
    state.nodes.fixity.push(0);
    state.nodes.weighted_volume.push(0.0);
    state.nodes.dilation.push(0.0);
    state.nodes.damage.push(0.0);
    state.nodes.particle_id.push(pid);
    state.nodes.velocity_magnitude.push(0.0);
  }
  for zone_id in 0..2u32 {
    state.particles.push(Particle {
      id: ParticleId(zone_id),
      kind: ParticleKind::Particle,
      zone_id,
      reference: ReferenceParticleHandle(zone_id),
      geometry: GeometryHandle(zone_id),
      transform: Transform::identity(),
      material: MaterialHandle(zone_id),
      horizon: 1.0,
      h: 0.1,
      density: 1.0,
      kn: 1.0,
      rc: 0.9,
      all_dofs_constrained: false,
      compute_force: true,
      node_range: (zone_id as usize)..(zone_id as usize + 1),
    });
  }
  state.contact_neighbors = vec![vec![1], vec![0]];
  state.wall_neighbors = vec![vec![], vec![]];

  let mut contact = pipeline::ContactTable::new();
  let kn = 100.0;
  contact.insert(
    0,
    1,
    pipeline::ContactParams {
      r_c: 2.0,
      kn,
      beta_n_factor: 0.0,
      mu: 0.0,
      kappa: 0.0,
    },
  );

  pipeline::contact_force(&mut state, &contact);

  let expected_mag = kn * penetration * volume;
  assert!(state.nodes.force[0].y < 0.0, "disk 1 pushed away from disk 2");
  assert!(state.nodes.force[1].y > 0.0, "disk 2 pushed away from disk 1");
  assert!((state.nodes.force[0].y.abs() - expected_mag).abs() < 1e-9);
  assert!((state.nodes.force[1].y.abs() - expected_mag).abs() < 1e-9);
}

fn free_fall_setup(dt: f64, num_steps: u64) -> SimulationSetup {
  let material = Material::Elastic(peridem_core::material::ElasticParams {
    horizon: 1.0,
    density: 1.0,
    c: 0.0,
    influence: InfluenceFn::Constant,
    elastic: ElasticConstants::resolve(Some(1.0), None, 0.25, None, None).unwrap(),
  });
  SimulationSetup {
    zones: vec![ZoneBlueprint {
      geometry: Geometry::Sphere { center: DVec3::ZERO, radius: 0.01 },
      reference: ReferenceMesh::new(vec![DVec3::ZERO], vec![1.0], vec![], ElementType::Line, 3),
      material,
    }],
    particles: vec![ParticleInstanceSpec {
      zone_id: 0,
      kind: ParticleKind::Particle,
      transform: Transform::identity(),
      all_dofs_constrained: false,
    }],
    contact_pairs: vec![],
    gravity: DVec3::new(0.0, -9.81, 0.0),
    loadings: vec![],
    integrator: Integrator::CentralDifference,
    dt,
    num_steps,
    output_interval: 0,
    neighbor_interval: 1_000_000,
    neighbor_s_factor: 1.5,
    stop: StopCriterion::None,
    n_threads: 1,
  }
}

/// Scenario 4: gravity-only free fall. A lone particle under constant
/// gravity follows the explicit integrator's closed-form symplectic-Euler
/// trajectory, not the continuous 0.5*g*t^2 curve (that gap is the scheme's
/// O(dt) discretization error).
#[test]
fn gravity_only_free_fall_matches_symplectic_euler_closed_form() {
  let dt = 1.0e-3;
  let n = 1000u64;
  let mut orch = Orchestrator::init(free_fall_setup(dt, n)).unwrap();
  orch.run();
  let state = orch.close();

  let g = -9.81_f64;
  let nf = n as f64;
  let expected_y = g * dt * dt * nf * (nf + 1.0) / 2.0;
  assert!((state.nodes.position[0].y - expected_y).abs() < 1e-6, "y={} expected={}", state.nodes.position[0].y, expected_y);
  assert_eq!(state.nodes.position[0].x, 0.0);
  assert_eq!(state.nodes.position[0].z, 0.0);
}

/// Scenario 5: fixity. A particle with every dof constrained never moves
/// from its reference position, even under gravity.
#[test]
fn all_dofs_constrained_particle_never_moves() {
  let mut setup = free_fall_setup(1.0e-3, 200);
  setup.particles[0].all_dofs_constrained = true;
  let mut orch = Orchestrator::init(setup).unwrap();
  orch.run();
  let state = orch.close();

  assert_eq!(state.nodes.position[0], DVec3::ZERO);
  assert_eq!(state.nodes.displacement[0], DVec3::ZERO);
  assert_eq!(state.nodes.velocity[0], DVec3::ZERO);
}

/// Scenario 6: adaptive contact schedule. A single particle driven at
/// constant velocity rebuilds exactly on the interval boundary, with r_s
/// equal to the closed-form min(S*R_c_max, S*I*dt*v).
#[test]
fn adaptive_contact_schedule_fires_on_interval_boundary_with_expected_radius() {
  let interval = 10u64;
  let s_factor = 1.2;
  let r_c_max = 2.0;
  let dt = 0.01;
  let v = 5.0;

  let mut mgr = NeighborManager::new(interval, s_factor, r_c_max);
  let mut fired_at = None;
  for step in 1..=interval {
    if mgr.should_rebuild() {
      fired_at = Some(step);
    }
    mgr.advance();
    if step % ((interval as f64 * 0.2).floor().max(1.0) as u64) == 0 {
      mgr.resize(v, dt, r_c_max);
    }
  }
  assert_eq!(fired_at, Some(1));

  let expected_r_s = (s_factor * r_c_max).min(s_factor * interval as f64 * dt * v);
  assert!((mgr.r_s - expected_r_s).abs() < 1e-9);
}
