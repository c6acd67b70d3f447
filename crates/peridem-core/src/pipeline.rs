//! Force pipeline: reset, peridynamic force, contact neighbor rebuild,
//! contact force, damping, external force — scheduled per step in strict
//! sequence (spec §4.I, §5).
//!
//! One named function per stage, called in a fixed order, each stage
//! itself parallel over independent items via `rayon`: map each node to
//! its force contribution in parallel, then apply serially so no node's
//! write ever overlaps another's read in the collected pass.

use std::collections::HashMap;

use glam::DVec3;
use rayon::prelude::*;

use crate::material::Material;
use crate::neighbor::NeighborManager;
use crate::nsearch::KdTree;
use crate::state::{ModelState, NodeId};

/// Per-zone-pair contact coefficients, resolved once at setup (§4.L).
#[derive(Clone, Copy, Debug)]
pub struct ContactParams {
  pub r_c: f64,
  pub kn: f64,
  /// β_n derived from the user-supplied restitution ε via
  /// `β_n = -2 ln(ε) / sqrt(π² + ln²ε) · β_n_factor` (§4.L), used by the
  /// pair/wall damping stages.
  pub beta_n_factor: f64,
  pub mu: f64,
  /// Harmonic-mean bulk modulus of the pair, used in the damping
  /// coefficient `β_n = β_n_factor · sqrt(κ · R_c · m_eq)`.
  pub kappa: f64,
}

/// Symmetric lookup table keyed by (zone_i, zone_j), grounded on the
/// original's per-particle-zone-pair deck.
#[derive(Clone, Debug, Default)]
pub struct ContactTable {
  params: HashMap<(u32, u32), ContactParams>,
}

impl ContactTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, zone_i: u32, zone_j: u32, params: ContactParams) {
    self.params.insert(Self::key(zone_i, zone_j), params);
    self.params.insert(Self::key(zone_j, zone_i), params);
  }

  fn key(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
      (a, b)
    } else {
      (b, a)
    }
  }

  pub fn get(&self, zone_i: u32, zone_j: u32) -> Option<&ContactParams> {
    self.params.get(&Self::key(zone_i, zone_j))
  }

  /// Largest `r_c` across every registered pair, used as `R_c_max` by the
  /// neighbor manager's adaptive sizing.
  pub fn r_c_max(&self) -> f64 {
    self.params.values().map(|p| p.r_c).fold(0.0, f64::max)
  }
}

/// Owns the per-pair contact coefficients and gravity; the thread pool and
/// per-run neighbor schedule are passed in by the orchestrator.
pub struct Pipeline {
  pub contact: ContactTable,
  pub gravity: DVec3,
}

impl Pipeline {
  pub fn new(contact: ContactTable, gravity: DVec3) -> Self {
    Self { contact, gravity }
  }

  /// Run the seven stages of §4.I in strict sequence.
  pub fn step(&self, state: &mut ModelState, neighbor_mgr: &mut NeighborManager, dt: f64, t: f64, materials: &[Material]) {
    reset_forces(state);
    peridynamic_force(state, materials);

    if neighbor_mgr.should_rebuild() {
      rebuild_contact_neighbors(state, neighbor_mgr);
    }
    neighbor_mgr.advance();

    contact_force(state, &self.contact);
    particle_pair_damping(state, &self.contact);
    particle_wall_damping(state, &self.contact);
    external_force(state, self.gravity, t);
  }
}

/// Stage 1: zero every node's force in parallel.
pub fn reset_forces(state: &mut ModelState) {
  state.nodes.force.par_iter_mut().for_each(|f| *f = DVec3::ZERO);
}

/// Stage 2: peridynamic bond force at every compute-force node, with the
/// state-based dilation pre-pass, volume correction, broken-bond repulsive
/// fallback, and damage tracking described in §4.I step 2.
pub fn peridynamic_force(state: &mut ModelState, materials: &[Material]) {
  let particle_node_ranges: Vec<(usize, usize, usize)> = state
    .particles
    .iter()
    .enumerate()
    .filter(|(_, p)| p.compute_force)
    .map(|(pi, p)| (pi, p.node_range.start, p.node_range.end))
    .collect();

  for (particle_idx, start, end) in particle_node_ranges {
    let material = &materials[state.particles[particle_idx].material.0 as usize];
    let h = state.particles[particle_idx].h;
    let horizon = material.horizon();

    if material.is_state_active() {
      recompute_weighted_volume_and_dilation(state, material, start, end, h);
    }

    let kn = state.particles[particle_idx].kn;
    let rc = state.particles[particle_idx].rc;

    let contributions: Vec<(DVec3, f64, Vec<bool>)> = (start..end)
      .into_par_iter()
      .map(|i| accumulate_bond_forces(state, material, i, horizon, h, kn, rc))
      .collect();

    for (local_i, (force, damage, broken_bits)) in contributions.into_iter().enumerate() {
      let i = start + local_i;
      state.nodes.force[i] += force;
      state.nodes.damage[i] = damage;
      for (k, broken) in broken_bits.into_iter().enumerate() {
        if broken {
          state.fracture.set(i, k, true);
        }
      }
    }
  }
}

fn recompute_weighted_volume_and_dilation(state: &mut ModelState, material: &Material, start: usize, end: usize, h: f64) {
  let horizon = material.horizon();
  let check_up = horizon + 0.5 * h;
  let check_low = horizon - 0.5 * h;

  let weighted_volumes: Vec<f64> = (start..end)
    .into_par_iter()
    .map(|i| {
      let xi = state.nodes.reference_position[i];
      let mut m = 0.0;
      for &j in state.pd_neighbors[i].iter() {
        let j = j as usize;
        let r = (state.nodes.reference_position[j] - xi).length();
        let mut vol_j = state.nodes.volume[j];
        if r > check_low {
          vol_j *= (check_up - r) / h;
        }
        m += r * r * material.influence_fn(r) * vol_j;
      }
      m
    })
    .collect();
  for (local_i, m) in weighted_volumes.into_iter().enumerate() {
    let i = start + local_i;
    if m < 1e-18 {
      state.metrics.note_degenerate_m_i();
    }
    state.nodes.weighted_volume[i] = m;
  }

  // Before accumulating theta, every still-intact bond's current-step
  // strain is checked against its critical stretch and the broken bit set
  // if exceeded (§4.I step 2) — a bond that crosses s_c this step must not
  // contribute to theta_i, not just bonds broken as of the previous step.
  let results: Vec<(f64, Vec<bool>)> = (start..end)
    .into_par_iter()
    .map(|i| {
      let xi = state.nodes.reference_position[i];
      let ui = state.nodes.displacement[i];
      let m = state.nodes.weighted_volume[i];
      let mut theta = 0.0;
      let mut broken_bits = Vec::with_capacity(state.pd_neighbors[i].len());
      for (k, &j) in state.pd_neighbors[i].iter().enumerate() {
        let j = j as usize;
        let xj = state.nodes.reference_position[j];
        let uj = state.nodes.displacement[j];
        let dx_ref = xj - xi;
        let du = uj - ui;
        let r = dx_ref.length();

        let mut broken = state.fracture.get(i, k);
        if !broken {
          let s = material.strain(dx_ref, du);
          broken = material.should_break(r, s);
        }
        broken_bits.push(broken);
        if broken || m < 1e-18 {
          continue;
        }

        let mut vol_j = state.nodes.volume[j];
        if r > check_low {
          vol_j *= (check_up - r) / h;
        }
        let change_length = (dx_ref + du).length() - r;
        theta += r * change_length * material.influence_fn(r) * vol_j;
      }
      let theta = if m < 1e-18 { 0.0 } else { 3.0 * theta / m };
      (theta, broken_bits)
    })
    .collect();
  for (local_i, (theta, broken_bits)) in results.into_iter().enumerate() {
    let i = start + local_i;
    state.nodes.dilation[i] = theta;
    for (k, broken) in broken_bits.into_iter().enumerate() {
      if broken {
        state.fracture.set(i, k, true);
      }
    }
  }
}

/// Compute node `i`'s total peridynamic force contribution, damage, and the
/// updated broken-bit for every bond in `N_pd(i)`. Bond-fracture bits are
/// read here (to respect irreversibility) but only written back by the
/// caller, which is the sole owner of `state.fracture` for node `i` in this
/// stage (spec §5: "each bit has a unique owner (node i, bond k)").
fn accumulate_bond_forces(state: &ModelState, material: &Material, i: usize, horizon: f64, h: f64, kn: f64, rc: f64) -> (DVec3, f64, Vec<bool>) {
  let xi = state.nodes.reference_position[i];
  let ui = state.nodes.displacement[i];
  let check_up = horizon + 0.5 * h;
  let check_low = horizon - 0.5 * h;

  let mut force = DVec3::ZERO;
  let mut damage: f64 = 0.0;
  let mut broken_bits = Vec::with_capacity(state.pd_neighbors[i].len());

  for (k, &j) in state.pd_neighbors[i].iter().enumerate() {
    let j = j as usize;
    let xj = state.nodes.reference_position[j];
    let uj = state.nodes.displacement[j];
    let dx_ref = xj - xi;
    let du = uj - ui;
    let r = dx_ref.length();
    let s = material.strain(dx_ref, du);
    let s_c = material.critical_stretch(r);
    damage = damage.max((s.abs() / s_c).min(f64::MAX));

    let mut broken = state.fracture.get(i, k);
    let mut vol_j = state.nodes.volume[j];
    if r > check_low {
      vol_j *= (check_up - r) / h;
    }

    let f_scalar = if material.is_state_active() {
      let m_i = state.nodes.weighted_volume[i];
      let theta_i = state.nodes.dilation[i];
      let m_j = state.nodes.weighted_volume[j];
      let theta_j = state.nodes.dilation[j];
      let (_, f_i) = material.energy_and_force_state(r, s, &mut broken, m_i, theta_i);
      let (_, f_j) = material.energy_and_force_state(r, s, &mut broken, m_j, theta_j);
      (f_i + f_j) * vol_j
    } else {
      let (_, f) = material.energy_and_force(r, s, &mut broken, true);
      f * vol_j
    };

    if !broken {
      force += f_scalar * material.bond_force_direction(dx_ref, du);
    } else {
      let y_ji = (xj + uj) - (xi + ui);
      let r_cur = y_ji.length();
      if r_cur > 1e-300 {
        let f = (kn * vol_j * (r_cur - rc) / r_cur).min(0.0);
        force += f * y_ji;
      }
    }
    broken_bits.push(broken);
  }

  (force, damage, broken_bits)
}

/// Stage 3: rebuild the dynamic contact neighbor lists and per-particle
/// wall-node condensed sets (§4.H).
pub fn rebuild_contact_neighbors(state: &mut ModelState, neighbor_mgr: &NeighborManager) {
  let (tree, _) = KdTree::build(&state.nodes.position);
  let tags: Vec<u64> = state.nodes.particle_id.iter().map(|&p| p as u64).collect();

  let n = state.node_count();
  let eligible: Vec<bool> = (0..n)
    .map(|i| {
      let pid = state.nodes.particle_id[i] as usize;
      let p = &state.particles[pid];
      p.compute_force && !(p.is_wall() && p.all_dofs_constrained)
    })
    .collect();

  let lists: Vec<Vec<u32>> = (0..n)
    .into_par_iter()
    .map(|i| {
      if !eligible[i] {
        return Vec::new();
      }
      let q = state.nodes.position[i];
      let (ids, _) = tree.radius_search_exclude_tag(q, neighbor_mgr.r_s, tags[i], &tags);
      ids
    })
    .collect();
  state.contact_neighbors = lists;

  let wall_lists: Vec<Vec<u32>> = (0..state.particles.len())
    .into_par_iter()
    .map(|pi| {
      let p = &state.particles[pi];
      if p.is_wall() {
        return Vec::new();
      }
      let mut wall_nodes = std::collections::HashSet::new();
      for i in p.node_range.clone() {
        for &j in &state.contact_neighbors[i] {
          let owner = state.particles[state.nodes.particle_id[j as usize] as usize].id.0;
          if state.particles[state.nodes.particle_id[j as usize] as usize].is_wall() {
            wall_nodes.insert(j);
            let _ = owner;
          }
        }
      }
      wall_nodes.into_iter().collect()
    })
    .collect();
  state.wall_neighbors = wall_lists;

  state.kd_tree = Some(tree);
}

/// Stage 4: Hertzian-penalty normal + Coulomb friction contact force.
pub fn contact_force(state: &mut ModelState, contact: &ContactTable) {
  let n = state.node_count();
  let contributions: Vec<DVec3> = (0..n)
    .into_par_iter()
    .map(|i| {
      let pid_i = state.nodes.particle_id[i] as usize;
      let particle_i = &state.particles[pid_i];
      if !particle_i.compute_force {
        return DVec3::ZERO;
      }
      let mut force = DVec3::ZERO;
      for &j in &state.contact_neighbors[i] {
        let j = j as usize;
        let pid_j = state.nodes.particle_id[j] as usize;
        let particle_j = &state.particles[pid_j];
        if particle_i.is_wall() && particle_j.is_wall() {
          continue;
        }
        let Some(params) = contact.get(particle_i.zone_id, particle_j.zone_id) else {
          continue;
        };
        let y_ji = state.nodes.position[j] - state.nodes.position[i];
        let r = y_ji.length();
        if r >= params.r_c || r < 1e-300 {
          continue;
        }
        let e_n = y_ji / r;
        let v_ji = state.nodes.velocity[j] - state.nodes.velocity[i];
        let v_n = v_ji.dot(e_n);
        let tangential = v_ji - v_n * e_n;
        let e_t = if tangential.length() > 1e-300 { tangential.normalize() } else { DVec3::ZERO };

        let vol_j = state.nodes.volume[j];
        let f_scalar = (params.kn * (r - params.r_c) * vol_j).min(0.0);
        force += f_scalar * e_n;
        force += params.mu * f_scalar * e_t;
      }
      force
    })
    .collect();
  for (i, f) in contributions.into_iter().enumerate() {
    state.nodes.force[i] += f;
  }
}

/// Particle center, radius, and mass, derived from node positions/volumes.
fn particle_center_and_mass(state: &ModelState, pi: usize) -> (DVec3, f64, f64) {
  let p = &state.particles[pi];
  let mut center = DVec3::ZERO;
  let mut total_vol = 0.0;
  for i in p.node_range.clone() {
    center += state.nodes.position[i] * state.nodes.volume[i];
    total_vol += state.nodes.volume[i];
  }
  if total_vol > 0.0 {
    center /= total_vol;
  }
  let mass = p.density * total_vol;
  (center, total_vol, mass)
}

/// Stage 5: damping between pairs of non-wall particle centers.
pub fn particle_pair_damping(state: &mut ModelState, contact: &ContactTable) {
  let non_wall: Vec<usize> = (0..state.particles.len()).filter(|&i| !state.particles[i].is_wall()).collect();
  let mut additions: Vec<(usize, DVec3)> = Vec::new();

  for a in 0..non_wall.len() {
    for b in (a + 1)..non_wall.len() {
      let (pi, pj) = (non_wall[a], non_wall[b]);
      let Some(params) = contact.get(state.particles[pi].zone_id, state.particles[pj].zone_id) else {
        continue;
      };
      let (ci, voli, mi) = particle_center_and_mass(state, pi);
      let (cj, volj, mj) = particle_center_and_mass(state, pj);
      let ri = state.reference_particle(state.particles[pi].reference).bounding_radius() * state.particles[pi].transform.scale;
      let rj = state.reference_particle(state.particles[pj].reference).bounding_radius() * state.particles[pj].transform.scale;

      let d = (ci - cj).length();
      if d >= ri + rj + 1.01 * params.r_c || d < 1e-300 {
        continue;
      }

      let m_eq = 2.0 * mi * mj / (mi + mj).max(1e-300);
      let beta_n = params.beta_n_factor * (params.kappa * params.r_c * m_eq).max(0.0).sqrt();

      let vi = particle_mean_velocity(state, pi);
      let vj = particle_mean_velocity(state, pj);
      let hat = (ci - cj) / d;
      let v_rel = (vi - vj).dot(hat).min(0.0);

      if voli > 0.0 {
        let fi = beta_n * v_rel * hat / voli;
        for i in state.particles[pi].node_range.clone() {
          additions.push((i, fi));
        }
      }
      if volj > 0.0 {
        let fj = -beta_n * v_rel * hat / volj;
        for j in state.particles[pj].node_range.clone() {
          additions.push((j, fj));
        }
      }
    }
  }

  for (i, f) in additions {
    state.nodes.force[i] += f;
  }
}

fn particle_mean_velocity(state: &ModelState, pi: usize) -> DVec3 {
  let p = &state.particles[pi];
  let mut v = DVec3::ZERO;
  let n = p.node_count().max(1) as f64;
  for i in p.node_range.clone() {
    v += state.nodes.velocity[i];
  }
  v / n
}

/// Stage 6: damping against the condensed set of nearby wall nodes, once
/// per unique wall node per particle (see the Open Question decision in
/// `DESIGN.md`).
pub fn particle_wall_damping(state: &mut ModelState, contact: &ContactTable) {
  let mut additions: Vec<(usize, DVec3)> = Vec::new();

  for pi in 0..state.particles.len() {
    if state.particles[pi].is_wall() {
      continue;
    }
    let wall_nodes = state.wall_neighbors[pi].clone();
    if wall_nodes.is_empty() {
      continue;
    }
    let (ci, voli, mi) = particle_center_and_mass(state, pi);
    if voli <= 0.0 {
      continue;
    }

    for wj in wall_nodes {
      let wj = wj as usize;
      let wall_pid = state.nodes.particle_id[wj] as usize;
      let Some(params) = contact.get(state.particles[pi].zone_id, state.particles[wall_pid].zone_id) else {
        continue;
      };
      let xj = state.nodes.position[wj];
      let d = (ci - xj).length();
      if d < 1e-300 {
        continue;
      }
      let m_eq = mi;
      let beta_n = params.beta_n_factor * (params.kappa * params.r_c * m_eq).max(0.0).sqrt();
      let vi = particle_mean_velocity(state, pi);
      let vj = state.nodes.velocity[wj];
      let hat = (ci - xj) / d;
      let v_rel = (vi - vj).dot(hat).min(0.0);
      let f = beta_n * v_rel * hat / voli;
      for i in state.particles[pi].node_range.clone() {
        additions.push((i, f));
      }
    }
  }

  for (i, f) in additions {
    state.nodes.force[i] += f;
  }
}

/// Stage 7: gravity plus force boundary conditions.
pub fn external_force(state: &mut ModelState, gravity: DVec3, t: f64) {
  if gravity.length() > 1e-8 {
    let density: Vec<f64> = state.nodes.particle_id.iter().map(|&pid| state.particles[pid as usize].density).collect();
    state
      .nodes
      .force
      .par_iter_mut()
      .zip(density.par_iter())
      .for_each(|(f, &rho)| *f += rho * gravity);
  }

  for loading_idx in 0..state.loadings.len() {
    apply_force_bc(state, loading_idx, t);
  }
}

fn apply_force_bc(state: &mut ModelState, loading_idx: usize, t: f64) {
  use crate::loading::{BcKind, Dof};

  let (particle_ids, region, dofs, spatial, spatial_params, temporal, temporal_params, active) = {
    let l = &state.loadings[loading_idx];
    if !matches!(l.kind, BcKind::Force) || !l.active {
      return;
    }
    (
      l.particle_ids.clone(),
      l.region.clone(),
      l.dofs.clone(),
      l.spatial,
      l.spatial_params.clone(),
      l.temporal,
      l.temporal_params.clone(),
      l.active,
    )
  };
  if !active {
    return;
  }

  for &pid in &particle_ids {
    let Some(particle) = state.particles.iter().find(|p| p.id.0 == pid) else { continue };
    let range = particle.node_range.clone();
    for i in range {
      let x_ref = state.nodes.reference_position[i];
      if let Some(region) = &region {
        use peridem_geometry::GeometryOps;
        if !region.is_inside(x_ref) {
          continue;
        }
      }
      let value = spatial.eval(x_ref, &spatial_params) * temporal.eval(t, &temporal_params);
      for dof in &dofs {
        let axis = match dof {
          Dof::X => 0,
          Dof::Y => 1,
          Dof::Z => 2,
        };
        let mut delta = DVec3::ZERO;
        match axis {
          0 => delta.x = value,
          1 => delta.y = value,
          _ => delta.z = value,
        }
        state.nodes.force[i] += delta;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reset_forces_zeroes_every_node() {
    let mut state = ModelState::new();
    state.nodes = crate::state::Nodes::with_capacity(2);
    for _ in 0..2 {
      state.nodes.force.push(DVec3::new(1.0, 2.0, 3.0));
    }
    reset_forces(&mut state);
    assert!(state.nodes.force.iter().all(|f| *f == DVec3::ZERO));
  }

  #[test]
  fn contact_table_lookup_is_symmetric() {
    let mut table = ContactTable::new();
    table.insert(
      0,
      1,
      ContactParams {
        r_c: 1.0,
        kn: 10.0,
        beta_n_factor: 0.1,
        mu: 0.2,
        kappa: 5.0,
      },
    );
    assert!(table.get(0, 1).is_some());
    assert!(table.get(1, 0).is_some());
    assert!(table.get(2, 3).is_none());
  }
}
