//! Explicit time integrators: central difference and velocity-Verlet.
//!
//! Grounded on `original_source/src/model/demModel.cpp`'s two integration
//! loops (one force evaluation per step for each scheme); the free/fixed
//! dof gating reads the per-node fixity mask from §3, and the update loop
//! itself is a `par_iter_mut` stage, consistent with "every heavy loop is
//! a parallel for-each" applied throughout `pipeline`.

use glam::DVec3;
use rayon::prelude::*;

use crate::material::Material;
use crate::neighbor::NeighborManager;
use crate::pipeline::Pipeline;
use crate::state::ModelState;

#[inline]
fn component(v: DVec3, axis: usize) -> f64 {
  match axis {
    0 => v.x,
    1 => v.y,
    _ => v.z,
  }
}

#[inline]
fn set_component(v: &mut DVec3, axis: usize, value: f64) {
  match axis {
    0 => v.x = value,
    1 => v.y = value,
    _ => v.z = value,
  }
}

fn densities_per_node(state: &ModelState) -> Vec<f64> {
  state.nodes.particle_id.iter().map(|&pid| state.particles[pid as usize].density).collect()
}

/// `v += factor * (dt/rho) * f` for every free dof. `factor` is `1.0` for
/// central difference's single kick and `0.5` for each half of
/// velocity-Verlet's split kick.
fn kick(state: &mut ModelState, dt: f64, factor: f64) {
  let densities = densities_per_node(state);
  state
    .nodes
    .velocity
    .par_iter_mut()
    .zip(state.nodes.force.par_iter())
    .zip(state.nodes.fixity.par_iter())
    .zip(densities.par_iter())
    .for_each(|(((v, f), fixity), rho)| {
      for axis in 0..3 {
        if fixity & (1 << axis) != 0 {
          continue;
        }
        let dv = factor * dt / rho * component(*f, axis);
        set_component(v, axis, component(*v, axis) + dv);
      }
    });
}

/// `x += dt*v`, `u += dt*v` for every free dof. Fixed dofs are driven
/// exclusively by the displacement BC (spec §4.K), never by this update.
fn advance_position_and_displacement(state: &mut ModelState, dt: f64) {
  state
    .nodes
    .position
    .par_iter_mut()
    .zip(state.nodes.displacement.par_iter_mut())
    .zip(state.nodes.velocity.par_iter())
    .zip(state.nodes.fixity.par_iter())
    .for_each(|(((x, u), v), fixity)| {
      for axis in 0..3 {
        if fixity & (1 << axis) != 0 {
          continue;
        }
        let dx = dt * component(*v, axis);
        set_component(x, axis, component(*x, axis) + dx);
        set_component(u, axis, component(*u, axis) + dx);
      }
    });
}

/// Refresh the per-node velocity-magnitude cache and return the global
/// maximum, the quantity `NeighborManager::resize` needs for its adaptive
/// sizing (spec §4.H).
fn refresh_velocity_magnitude(state: &mut ModelState) -> f64 {
  state
    .nodes
    .velocity_magnitude
    .par_iter_mut()
    .zip(state.nodes.velocity.par_iter())
    .for_each(|(mag, v)| *mag = v.length());
  state.nodes.velocity_magnitude.iter().copied().fold(0.0_f64, f64::max)
}

/// `K.integrate()`'s two explicit marchers (spec §4.K). Each `step` call
/// advances exactly one step: kick/drift, clock advance, displacement BC,
/// one force-pipeline evaluation (§4.I), and — for velocity-Verlet — the
/// closing half-kick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Integrator {
  CentralDifference,
  VelocityVerlet,
}

impl Integrator {
  pub fn step(&self, state: &mut ModelState, pipeline: &Pipeline, neighbor_mgr: &mut NeighborManager, materials: &[Material], dt: f64) {
    match self {
      Integrator::CentralDifference => {
        kick(state, dt, 1.0);
        advance_position_and_displacement(state, dt);
        self.advance_clock_and_evaluate_forces(state, pipeline, neighbor_mgr, materials, dt);
      }
      Integrator::VelocityVerlet => {
        kick(state, dt, 0.5);
        advance_position_and_displacement(state, dt);
        self.advance_clock_and_evaluate_forces(state, pipeline, neighbor_mgr, materials, dt);
        kick(state, dt, 0.5);
      }
    }
  }

  fn advance_clock_and_evaluate_forces(
    &self,
    state: &mut ModelState,
    pipeline: &Pipeline,
    neighbor_mgr: &mut NeighborManager,
    materials: &[Material],
    dt: f64,
  ) {
    state.step += 1;
    state.time += dt;

    crate::loading::apply_displacement_bcs(state, state.time, dt);

    let v_max = refresh_velocity_magnitude(state);
    if state.step % neighbor_mgr.velocity_refresh_cadence() == 0 {
      let r_c_max = pipeline.contact.r_c_max();
      neighbor_mgr.resize(v_max, dt, r_c_max);
    }

    pipeline.step(state, neighbor_mgr, dt, state.time, materials);
  }
}
