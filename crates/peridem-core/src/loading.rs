//! Displacement and force boundary conditions with spatial × temporal
//! modulation. Grounded on `original_source/src/loading/*`; `SpatialFn`/
//! `TemporalFn` are small closed enums with a per-variant `eval`, the
//! teacher's preference (`types.rs::NormalMode`, `PresentationHint`) over
//! `Box<dyn Fn>` since the function set is fixed and exhaustive.

use glam::DVec3;
use peridem_geometry::{Geometry, GeometryOps};

use crate::state::{ModelState, NodeId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpatialFn {
  Constant,
  HatX,
  HatY,
  SinX,
  SinY,
  LinearX,
  LinearY,
}

impl SpatialFn {
  /// Evaluate at a reference-configuration point, producing a scalar
  /// modulation factor.
  pub fn eval(&self, x_ref: DVec3, params: &[f64]) -> f64 {
    let a = params.first().copied().unwrap_or(1.0);
    match self {
      SpatialFn::Constant => a,
      SpatialFn::HatX => a * (1.0 - x_ref.x.abs()),
      SpatialFn::HatY => a * (1.0 - x_ref.y.abs()),
      SpatialFn::SinX => a * (std::f64::consts::PI * x_ref.x).sin(),
      SpatialFn::SinY => a * (std::f64::consts::PI * x_ref.y).sin(),
      SpatialFn::LinearX => a * x_ref.x,
      SpatialFn::LinearY => a * x_ref.y,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TemporalFn {
  Constant,
  Linear,
  Quadratic,
  Sin,
  /// Rigid rotation about an axis through `x0` at angular rate ω; handled
  /// specially by the caller (see `Loading::apply_displacement`) since it
  /// rotates the whole reference offset rather than scaling a scalar.
  Rotation,
}

impl TemporalFn {
  pub fn eval(&self, t: f64, params: &[f64]) -> f64 {
    let a = params.first().copied().unwrap_or(1.0);
    match self {
      TemporalFn::Constant => a,
      TemporalFn::Linear => a * t,
      TemporalFn::Quadratic => a * t * t,
      TemporalFn::Sin => {
        let omega = params.get(1).copied().unwrap_or(1.0);
        a * (omega * t).sin()
      }
      TemporalFn::Rotation => a,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dof {
  X = 0,
  Y = 1,
  Z = 2,
}

pub enum BcKind {
  Displacement,
  Force,
}

/// One boundary-condition specification: a particle selector, a region,
/// the affected dofs, spatial/temporal modulation, and setup flags.
pub struct Loading {
  pub kind: BcKind,
  pub particle_ids: Vec<u32>,
  pub region: Option<Geometry>,
  pub dofs: Vec<Dof>,
  pub spatial: SpatialFn,
  pub spatial_params: Vec<f64>,
  pub temporal: TemporalFn,
  pub temporal_params: Vec<f64>,
  pub zero: bool,
  pub active: bool,
}

impl Loading {
  /// Displacement/velocity pair for a non-rotation temporal at a given
  /// reference point and time.
  pub fn evaluate_scalar(&self, x_ref: DVec3, t: f64, dt_for_velocity: f64) -> (f64, f64) {
    let spatial = self.spatial.eval(x_ref, &self.spatial_params);
    let u = spatial * self.temporal.eval(t, &self.temporal_params);
    let u_next = spatial * self.temporal.eval(t + dt_for_velocity, &self.temporal_params);
    let v = (u_next - u) / dt_for_velocity;
    (u, v)
  }

  /// Rigid rotation of `x_ref - x0` by `omega * t` about the z axis (2D),
  /// returning the displacement and the analytic angular-velocity-driven
  /// velocity, per spec §4.J's `rotation` temporal.
  pub fn evaluate_rotation(&self, x_ref: DVec3, x0: DVec3, omega: f64, t: f64) -> (DVec3, DVec3) {
    let theta = omega * t;
    let rel = x_ref - x0;
    let (s, c) = theta.sin_cos();
    let rotated = DVec3::new(c * rel.x - s * rel.y, s * rel.x + c * rel.y, rel.z);
    let u = rotated - rel;
    // d/dtheta of rotated, scaled by omega (d theta/dt).
    let d_rotated_dtheta = DVec3::new(-s * rel.x - c * rel.y, c * rel.x - s * rel.y, 0.0);
    let v = d_rotated_dtheta * omega;
    (u, v)
  }
}

#[inline]
fn dof_axis(dof: Dof) -> usize {
  match dof {
    Dof::X => 0,
    Dof::Y => 1,
    Dof::Z => 2,
  }
}

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

/// Setup-time fixity assignment (spec §4.J): for every displacement BC and
/// every node of every selected particle that lies in the BC's region, set
/// the fixity bits for the listed dofs. Run once from
/// `Orchestrator::init`, before the first force evaluation.
pub fn assign_fixity(state: &mut ModelState) {
  for loading_idx in 0..state.loadings.len() {
    let (is_displacement, particle_ids, region, dofs) = {
      let l = &state.loadings[loading_idx];
      (matches!(l.kind, BcKind::Displacement), l.particle_ids.clone(), l.region.clone(), l.dofs.clone())
    };
    if !is_displacement {
      continue;
    }
    for &pid in &particle_ids {
      let Some(particle) = state.particles.iter().find(|p| p.id.0 == pid) else {
        continue;
      };
      for i in particle.node_range.clone() {
        let x_ref = state.nodes.reference_position[i];
        if let Some(region) = &region {
          if !region.is_inside(x_ref) {
            continue;
          }
        }
        for &dof in &dofs {
          state.nodes.set_dof_fixed(NodeId(i as u32), dof_axis(dof));
        }
      }
    }
  }
}

/// Per-step displacement BC evaluation (spec §4.J): for every active,
/// non-zero displacement BC, assign `u`/`v` at each matching node from its
/// spatial × temporal modulation (or, for the `rotation` temporal, from the
/// rigid-rotation formula), then set `x = x_ref + u` along the listed dofs.
/// `dt` is only used to estimate the analytic velocity by finite
/// differencing the temporal schedule one step ahead.
pub fn apply_displacement_bcs(state: &mut ModelState, t: f64, dt: f64) {
  for loading_idx in 0..state.loadings.len() {
    apply_one_displacement_bc(state, loading_idx, t, dt);
  }
}

fn apply_one_displacement_bc(state: &mut ModelState, loading_idx: usize, t: f64, dt: f64) {
  let (is_displacement, particle_ids, region, dofs, spatial, spatial_params, temporal, temporal_params, zero, active) = {
    let l = &state.loadings[loading_idx];
    (
      matches!(l.kind, BcKind::Displacement),
      l.particle_ids.clone(),
      l.region.clone(),
      l.dofs.clone(),
      l.spatial,
      l.spatial_params.clone(),
      l.temporal,
      l.temporal_params.clone(),
      l.zero,
      l.active,
    )
  };
  if !is_displacement || !active || zero {
    return;
  }

  for &pid in &particle_ids {
    let Some(particle) = state.particles.iter().find(|p| p.id.0 == pid) else {
      continue;
    };
    let range = particle.node_range.clone();
    for i in range {
      let x_ref = state.nodes.reference_position[i];
      if let Some(region) = &region {
        if !region.is_inside(x_ref) {
          continue;
        }
      }

      if matches!(temporal, TemporalFn::Rotation) {
        let omega = temporal_params.first().copied().unwrap_or(0.0);
        let x0 = region.as_ref().map(|r| r.center()).unwrap_or(DVec3::ZERO);
        let theta = omega * t;
        let rel = x_ref - x0;
        let (s, c) = theta.sin_cos();
        let rotated = DVec3::new(c * rel.x - s * rel.y, s * rel.x + c * rel.y, rel.z);
        let u = rotated - rel;
        let d_rotated_dtheta = DVec3::new(-s * rel.x - c * rel.y, c * rel.x - s * rel.y, 0.0);
        let v = d_rotated_dtheta * omega;
        for &dof in &dofs {
          let axis = dof_axis(dof);
          let mut disp = state.nodes.displacement[i];
          set_component(&mut disp, axis, component(u, axis));
          state.nodes.displacement[i] = disp;
          let mut vel = state.nodes.velocity[i];
          set_component(&mut vel, axis, component(v, axis));
          state.nodes.velocity[i] = vel;
        }
        state.nodes.position[i] = x_ref + state.nodes.displacement[i];
        continue;
      }

      let spatial_value = spatial.eval(x_ref, &spatial_params);
      let u_scalar = spatial_value * temporal.eval(t, &temporal_params);
      let u_next = spatial_value * temporal.eval(t + dt, &temporal_params);
      let v_scalar = (u_next - u_scalar) / dt;
      for &dof in &dofs {
        let axis = dof_axis(dof);
        let mut disp = state.nodes.displacement[i];
        set_component(&mut disp, axis, u_scalar);
        state.nodes.displacement[i] = disp;
        let mut vel = state.nodes.velocity[i];
        set_component(&mut vel, axis, v_scalar);
        state.nodes.velocity[i] = vel;
      }
      state.nodes.position[i] = x_ref + state.nodes.displacement[i];
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn constant_spatial_times_linear_temporal_is_rate_times_time() {
    let s = SpatialFn::Constant;
    let t = TemporalFn::Linear;
    assert!((s.eval(DVec3::ZERO, &[2.0]) * t.eval(3.0, &[1.0]) - 6.0).abs() < 1e-12);
  }

  #[test]
  fn rotation_by_quarter_turn_matches_closed_form() {
    let loading = Loading {
      kind: BcKind::Displacement,
      particle_ids: vec![],
      region: None,
      dofs: vec![Dof::X, Dof::Y],
      spatial: SpatialFn::Constant,
      spatial_params: vec![],
      temporal: TemporalFn::Rotation,
      temporal_params: vec![],
      zero: false,
      active: true,
    };
    let omega = std::f64::consts::FRAC_PI_2;
    let (u, _) = loading.evaluate_rotation(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO, omega, 1.0);
    assert!((u - DVec3::new(-1.0, 1.0, 0.0)).length() < 1e-9);
  }

  fn single_node_state() -> ModelState {
    use crate::particle::{MaterialHandle, Particle, ParticleId, ParticleKind, ReferenceParticleHandle, Transform};
    use crate::state::Nodes;

    let mut state = ModelState::new();
    state.nodes = Nodes::with_capacity(1);
    state.nodes.reference_position.push(DVec3::ZERO);
    state.nodes.position.push(DVec3::ZERO);
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
    state.particles.push(Particle {
      id: ParticleId(0),
      kind: ParticleKind::Particle,
      zone_id: 0,
      reference: ReferenceParticleHandle(0),
      geometry: crate::particle::GeometryHandle(0),
      transform: Transform::identity(),
      material: MaterialHandle(0),
      horizon: 1.0,
      h: 1.0,
      density: 1.0,
      kn: 1.0,
      rc: 1.0,
      all_dofs_constrained: false,
      compute_force: true,
      node_range: 0..1,
    });
    state
  }

  #[test]
  fn assign_fixity_sets_only_the_listed_dofs() {
    let mut state = single_node_state();
    state.loadings.push(Loading {
      kind: BcKind::Displacement,
      particle_ids: vec![0],
      region: None,
      dofs: vec![Dof::X],
      spatial: SpatialFn::Constant,
      spatial_params: vec![0.0],
      temporal: TemporalFn::Constant,
      temporal_params: vec![0.0],
      zero: true,
      active: true,
    });
    assign_fixity(&mut state);
    assert!(state.nodes.is_dof_fixed(NodeId(0), 0));
    assert!(!state.nodes.is_dof_fixed(NodeId(0), 1));
  }

  #[test]
  fn apply_displacement_bc_moves_fixed_node_along_linear_schedule() {
    let mut state = single_node_state();
    state.loadings.push(Loading {
      kind: BcKind::Displacement,
      particle_ids: vec![0],
      region: None,
      dofs: vec![Dof::X],
      spatial: SpatialFn::Constant,
      spatial_params: vec![2.0],
      temporal: TemporalFn::Linear,
      temporal_params: vec![1.0],
      zero: false,
      active: true,
    });
    apply_displacement_bcs(&mut state, 3.0, 0.01);
    assert!((state.nodes.displacement[0].x - 6.0).abs() < 1e-9);
    assert!((state.nodes.position[0].x - 6.0).abs() < 1e-9);
    assert!((state.nodes.velocity[0].x - 2.0).abs() < 1e-6, "v = d/dt(spatial*t) = spatial = 2.0");
  }

  #[test]
  fn zero_valued_bc_is_skipped_at_every_step() {
    let mut state = single_node_state();
    state.loadings.push(Loading {
      kind: BcKind::Displacement,
      particle_ids: vec![0],
      region: None,
      dofs: vec![Dof::X],
      spatial: SpatialFn::Constant,
      spatial_params: vec![5.0],
      temporal: TemporalFn::Linear,
      temporal_params: vec![1.0],
      zero: true,
      active: true,
    });
    apply_displacement_bcs(&mut state, 3.0, 0.01);
    assert_eq!(state.nodes.displacement[0].x, 0.0);
  }
}
