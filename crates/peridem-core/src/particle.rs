//! Particle instances: a reference particle transformed into the current
//! configuration, plus the material/geometry handles and derived contact
//! coefficients carried with each instance.
//!
//! Grounded on `original_source/src/particle/baseParticle.h/.cpp` for the
//! attribute list and `K_n`/`R_c` derivation; handles are small `Copy`
//! newtype `usize` indices into `ModelState`'s arenas, the cyclic-
//! reference re-architecture from DESIGN NOTES.

use std::ops::Range;

use glam::DVec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceParticleHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleKind {
  Particle,
  Wall,
}

/// Translate-rotate-scale transform from reference to current
/// configuration: `T(x_ref) = translation + rotate(axis, angle) * (scale * x_ref)`.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
  pub translation: DVec3,
  pub axis: DVec3,
  pub angle: f64,
  pub scale: f64,
}

impl Transform {
  pub fn identity() -> Self {
    Self {
      translation: DVec3::ZERO,
      axis: DVec3::Z,
      angle: 0.0,
      scale: 1.0,
    }
  }

  /// Apply to a reference-configuration point: scale about origin, rotate
  /// about `axis`, then translate — the order fixed by spec §3.
  pub fn apply(&self, x_ref: DVec3) -> DVec3 {
    let scaled = x_ref * self.scale;
    let rotated = if self.angle.abs() < 1e-300 {
      scaled
    } else {
      glam::DQuat::from_axis_angle(self.axis.normalize_or_zero(), self.angle) * scaled
    };
    rotated + self.translation
  }
}

#[derive(Clone, Debug)]
pub struct Particle {
  pub id: ParticleId,
  pub kind: ParticleKind,
  pub zone_id: u32,
  pub reference: ReferenceParticleHandle,
  pub geometry: GeometryHandle,
  pub transform: Transform,
  pub material: MaterialHandle,
  pub horizon: f64,
  pub h: f64,
  pub density: f64,
  pub kn: f64,
  pub rc: f64,
  pub all_dofs_constrained: bool,
  pub compute_force: bool,
  pub node_range: Range<usize>,
}

impl Particle {
  /// Derive internal-contact coefficients from the bulk modulus and mesh
  /// spacing: `K_n = 18K/(π ε⁵)`, `R_c = 0.95 h` (spec §4.F).
  pub fn internal_contact_coefficients(bulk_modulus: f64, horizon: f64, h: f64) -> (f64, f64) {
    let kn = 18.0 * bulk_modulus / (std::f64::consts::PI * horizon.powi(5));
    let rc = 0.95 * h;
    (kn, rc)
  }

  pub fn glob_start(&self) -> usize {
    self.node_range.start
  }

  pub fn glob_end(&self) -> usize {
    self.node_range.end
  }

  pub fn node_count(&self) -> usize {
    self.node_range.len()
  }

  /// Map a particle-local node index to its global node id.
  #[inline]
  pub fn local_to_global(&self, local: usize) -> usize {
    self.node_range.start + local
  }

  pub fn is_wall(&self) -> bool {
    self.kind == ParticleKind::Wall
  }
}
