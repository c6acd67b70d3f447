//! Peridynamic material models.
//!
//! Grounded on `original_source/src/material/mparticle/material.h` for the
//! four model formulas and on `materialDeck.h`'s `MatData` conversion
//! functions (`toK`/`toE`/`toLambdaE`/`toGE`/`toGc`/`toKIc`) for elastic
//! constant resolution. Dispatch uses a small tagged enum over a class
//! hierarchy; the original's file-scope shared-pointer influence function
//! becomes an explicit field on each variant instead of global state
//! (DESIGN NOTES).

use glam::DVec3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MaterialDataMissing {
  #[error("need either Young's modulus E or bulk modulus K, got neither")]
  NeitherEnorK,
  #[error("critical stretch parameters insufficient to derive s_c")]
  MissingCriticalStretch,
}

/// The physically-derived quantities shared by every model, resolved once
/// at construction from whatever subset of {E,K,G,ν,λ,μ,G_c,K_Ic} the
/// input deck supplies plus a fixed ν (bond-based models cannot represent
/// an arbitrary Poisson's ratio; the original hardcodes ν=0.25 for RNP/PMB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElasticConstants {
  pub e: f64,
  pub k: f64,
  pub g: f64,
  pub nu: f64,
  pub lambda: f64,
  pub mu: f64,
  pub gc: f64,
  pub k_ic: f64,
}

impl ElasticConstants {
  fn to_e(k: f64, nu: f64) -> f64 {
    k * (3.0 * (1.0 - 2.0 * nu))
  }
  fn to_k(e: f64, nu: f64) -> f64 {
    e / (3.0 * (1.0 - 2.0 * nu))
  }
  fn to_lambda_e(e: f64, nu: f64) -> f64 {
    e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu))
  }
  fn to_g_e(e: f64, nu: f64) -> f64 {
    e / (2.0 * (1.0 + nu))
  }
  fn to_gc(k_ic: f64, e: f64) -> f64 {
    k_ic * k_ic / e
  }
  fn to_k_ic(gc: f64, e: f64) -> f64 {
    (gc * e).sqrt()
  }

  /// Resolve the full constant set from a partial deck. `nu` is fixed by
  /// the calling model (0.25 for bond-based RNP/PMB, user-supplied for
  /// state-based). Exactly one of `e`/`k` must be given; `gc`/`k_ic` are
  /// optional and cross-derived when only one is present.
  pub fn resolve(e: Option<f64>, k: Option<f64>, nu: f64, gc: Option<f64>, k_ic: Option<f64>) -> Result<Self, MaterialDataMissing> {
    let (e, k) = match (e, k) {
      (Some(e), _) => (e, Self::to_k(e, nu)),
      (None, Some(k)) => (Self::to_e(k, nu), k),
      (None, None) => return Err(MaterialDataMissing::NeitherEnorK),
    };
    let lambda = Self::to_lambda_e(e, nu);
    let g = Self::to_g_e(e, nu);
    let (gc, k_ic) = match (gc, k_ic) {
      (Some(gc), Some(k_ic)) => (gc, k_ic),
      (Some(gc), None) => (gc, Self::to_k_ic(gc, e)),
      (None, Some(k_ic)) => (Self::to_gc(k_ic, e), k_ic),
      (None, None) => (0.0, 0.0),
    };
    Ok(Self {
      e,
      k,
      g,
      nu,
      lambda,
      mu: g,
      gc,
      k_ic,
    })
  }
}

/// Bounded, non-increasing weight on normalized bond length r/ε.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InfluenceFn {
  Constant,
  Linear,
  Gaussian { beta: f64 },
}

impl InfluenceFn {
  pub fn eval(&self, r_over_horizon: f64) -> f64 {
    match self {
      InfluenceFn::Constant => 1.0,
      InfluenceFn::Linear => (1.0 - r_over_horizon).max(0.0),
      InfluenceFn::Gaussian { beta } => (-r_over_horizon * r_over_horizon / beta).exp(),
    }
  }
}

#[derive(Clone, Copy, Debug)]
pub struct RnpParams {
  pub horizon: f64,
  pub density: f64,
  pub beta: f64,
  pub c: f64,
  pub factor_sc: f64,
  pub s_c: f64,
  pub influence: InfluenceFn,
  pub irreversible: bool,
  pub elastic: ElasticConstants,
}

#[derive(Clone, Copy, Debug)]
pub struct PmbParams {
  pub horizon: f64,
  pub density: f64,
  pub c: f64,
  pub s_c: f64,
  pub influence: InfluenceFn,
  pub irreversible: bool,
  pub elastic: ElasticConstants,
}

#[derive(Clone, Copy, Debug)]
pub struct ElasticParams {
  pub horizon: f64,
  pub density: f64,
  pub c: f64,
  pub influence: InfluenceFn,
  pub elastic: ElasticConstants,
}

#[derive(Clone, Copy, Debug)]
pub struct StateParams {
  pub horizon: f64,
  pub density: f64,
  pub s_0: f64,
  pub influence: InfluenceFn,
  pub irreversible: bool,
  pub elastic: ElasticConstants,
}

/// `Material = {RNP, PMB, Elastic, State}` per DESIGN NOTES' tagged-variant
/// re-architecture of the original's material class hierarchy.
#[derive(Clone, Copy, Debug)]
pub enum Material {
  Rnp(RnpParams),
  Pmb(PmbParams),
  Elastic(ElasticParams),
  State(StateParams),
}

impl Material {
  pub fn horizon(&self) -> f64 {
    match self {
      Material::Rnp(p) => p.horizon,
      Material::Pmb(p) => p.horizon,
      Material::Elastic(p) => p.horizon,
      Material::State(p) => p.horizon,
    }
  }

  pub fn density(&self) -> f64 {
    match self {
      Material::Rnp(p) => p.density,
      Material::Pmb(p) => p.density,
      Material::Elastic(p) => p.density,
      Material::State(p) => p.density,
    }
  }

  pub fn influence_fn(&self, r: f64) -> f64 {
    let horizon = self.horizon();
    match self {
      Material::Rnp(p) => p.influence.eval(r / horizon),
      Material::Pmb(p) => p.influence.eval(r / horizon),
      Material::Elastic(p) => p.influence.eval(r / horizon),
      Material::State(p) => p.influence.eval(r / horizon),
    }
  }

  /// ∫ J(r) r² over the neighborhood is the caller's job (see
  /// `pipeline::state_dilation`); this just exposes the raw weight used by
  /// the i-th moment, matching `influenceFnMoment(i)` in the shared
  /// contract for `i = 0`.
  pub fn influence_fn_moment(&self, r: f64, moment: i32) -> f64 {
    self.influence_fn(r) * r.powi(moment)
  }

  pub fn is_state_active(&self) -> bool {
    matches!(self, Material::State(_))
  }

  pub fn elastic_constants(&self) -> ElasticConstants {
    match self {
      Material::Rnp(p) => p.elastic,
      Material::Pmb(p) => p.elastic,
      Material::Elastic(p) => p.elastic,
      Material::State(p) => p.elastic,
    }
  }

  pub fn critical_stretch(&self, r: f64) -> f64 {
    match self {
      Material::Rnp(p) => (1.0 / (2.0 * p.beta)).sqrt() / r.max(1e-300).sqrt(),
      Material::Pmb(p) => p.s_c,
      Material::Elastic(_) => f64::INFINITY,
      Material::State(p) => p.s_0,
    }
  }

  /// Whether a bond at distance `r` carrying stretch `s` should break,
  /// independent of force evaluation — the same per-variant threshold
  /// `energy_and_force`/`energy_and_force_state` apply, exposed so callers
  /// that need a break decision without a force (e.g. the state-based
  /// dilation prepass) can reach the same answer.
  pub fn should_break(&self, r: f64, s: f64) -> bool {
    match self {
      Material::Rnp(p) => p.irreversible && s.abs() > p.factor_sc * self.critical_stretch(r),
      Material::Pmb(p) => p.irreversible && s.abs() > p.s_c,
      Material::Elastic(_) => false,
      Material::State(p) => p.irreversible && s.abs() > p.s_0,
    }
  }

  /// `strain(Δx_ref, Δu) → s`, the relative bond stretch. RNP uses the
  /// linearized dot-product form `(Δx_ref · Δu) / (Δx_ref · Δx_ref)`; the
  /// other three models use the nonlinear `(|Δx_ref+Δu| − |Δx_ref|) / |Δx_ref|`
  /// form.
  pub fn strain(&self, dx_ref: DVec3, du: DVec3) -> f64 {
    let r_sq = dx_ref.length_squared();
    if r_sq < 1e-300 {
      return 0.0;
    }
    match self {
      Material::Rnp(_) => dx_ref.dot(du) / r_sq,
      Material::Pmb(_) | Material::Elastic(_) | Material::State(_) => (dx_ref + du).length() / r_sq.sqrt() - 1.0,
    }
  }

  /// Unit vector along the current (deformed) bond; `DVec3::ZERO` on the
  /// degenerate zero-length case (`NumericDegenerate` policy, §7).
  pub fn bond_force_direction(&self, dx_ref: DVec3, du: DVec3) -> DVec3 {
    let y = dx_ref + du;
    let len = y.length();
    if len < 1e-300 {
      DVec3::ZERO
    } else {
      y / len
    }
  }

  /// `energyAndForce(r, s, broken_in_out, break_allowed) -> (e, f_scalar)`.
  /// `broken` is updated in place; returns `(energy, scalar_force)`.
  pub fn energy_and_force(&self, r: f64, s: f64, broken: &mut bool, break_allowed: bool) -> (f64, f64) {
    if *broken {
      return (0.0, 0.0);
    }
    match self {
      Material::Rnp(p) => {
        let s_c = self.critical_stretch(r);
        if break_allowed && p.irreversible && s.abs() > p.factor_sc * s_c {
          *broken = true;
          return (0.0, 0.0);
        }
        let j = self.influence_fn(r);
        let b_eps = (4.0 / 3.0) * std::f64::consts::PI * p.horizon.powi(3);
        let e = j * p.c * (1.0 - (-p.beta * r * s * s).exp()) / (p.horizon * b_eps);
        let f = 4.0 * j * s * p.c * p.beta * (-p.beta * r * s * s).exp() / (p.horizon * b_eps);
        (e, f)
      }
      Material::Pmb(p) => {
        if break_allowed && p.irreversible && s.abs() > p.s_c {
          *broken = true;
          return (0.0, 0.0);
        }
        let j = self.influence_fn(r);
        let e = 0.5 * j * p.c * s * s * r;
        let f = j * p.c * s;
        (e, f)
      }
      Material::Elastic(p) => {
        let j = self.influence_fn(r);
        let e = 0.5 * j * p.c * s * s * r;
        let f = j * p.c * s;
        (e, f)
      }
      Material::State(_) => (0.0, 0.0),
    }
  }

  /// `energyAndForceState(r, s, broken_in_out, m, theta) -> (e, f_scalar)`,
  /// the per-bond *pair* contribution; the caller sums this with the
  /// opposite node's own `(m_j, θ_j)` evaluation (§4.I step 2).
  pub fn energy_and_force_state(&self, r: f64, s: f64, broken: &mut bool, m: f64, theta: f64) -> (f64, f64) {
    if *broken {
      return (0.0, 0.0);
    }
    let Material::State(p) = self else {
      return self.energy_and_force(r, s, broken, true);
    };
    if p.irreversible && s.abs() > p.s_0 {
      *broken = true;
      return (0.0, 0.0);
    }
    let j = self.influence_fn(r);
    let alpha = 15.0 * p.elastic.g / m;
    let factor = 3.0 * p.elastic.k / m - alpha / 3.0;
    let extension = r * s;
    let f = j * (r * theta * factor + extension * alpha);
    (0.0, f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn elastic_constants_resolve_from_e_alone() {
    let c = ElasticConstants::resolve(Some(1000.0), None, 0.25, None, None).unwrap();
    assert!((c.k - 1000.0 / (3.0 * 0.5)).abs() < 1e-9);
    assert!((c.g - 1000.0 / 2.5).abs() < 1e-9);
  }

  #[test]
  fn elastic_constants_resolve_from_k_alone() {
    let c = ElasticConstants::resolve(None, Some(500.0), 0.25, None, None).unwrap();
    assert!((c.e - 500.0 * 1.5).abs() < 1e-9);
  }

  #[test]
  fn missing_both_e_and_k_is_an_error() {
    assert_eq!(
      ElasticConstants::resolve(None, None, 0.25, None, None).unwrap_err(),
      MaterialDataMissing::NeitherEnorK
    );
  }

  #[test]
  fn pmb_bond_breaks_above_critical_stretch_and_stays_broken() {
    let m = Material::Pmb(PmbParams {
      horizon: 1.0,
      density: 1.0,
      c: 1.0,
      s_c: 0.05,
      influence: InfluenceFn::Constant,
      irreversible: true,
      elastic: ElasticConstants::resolve(Some(1.0), None, 0.25, None, None).unwrap(),
    });
    let mut broken = false;
    let (_, f1) = m.energy_and_force(1.0, 0.04, &mut broken, true);
    assert!(!broken);
    assert_ne!(f1, 0.0);
    let (_, _) = m.energy_and_force(1.0, 0.06, &mut broken, true);
    assert!(broken);
    let (e2, f2) = m.energy_and_force(1.0, 0.0, &mut broken, true);
    assert!(broken);
    assert_eq!((e2, f2), (0.0, 0.0));
  }

  #[test]
  fn rnp_single_bond_matches_closed_form() {
    let m = Material::Rnp(RnpParams {
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
    let r = 0.1;
    let s = 0.2;
    let mut broken = false;
    let (_, f) = m.energy_and_force(r, s, &mut broken, false);
    let b_eps = (4.0 / 3.0) * std::f64::consts::PI * 0.15f64.powi(3);
    let expected = 4.0 * s * 1.0 * (-1.0 * r * s * s).exp() / (0.15 * b_eps);
    assert!((f - expected).abs() < 1e-12);
  }
}
