//! Axis-aligned bounding box.
//!
//! A plain min/max value type with an "empty, ready for encapsulation"
//! builder rather than an owning container.

use glam::DVec3;

/// Axis-aligned bounding box in 2D or 3D (the unused z extent is left at
/// zero for 2D geometry).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: DVec3,
  pub max: DVec3,
}

impl Aabb {
  /// An inverted-extent box, ready to be grown via `encapsulate`.
  pub fn empty() -> Self {
    Self {
      min: DVec3::splat(f64::INFINITY),
      max: DVec3::splat(f64::NEG_INFINITY),
    }
  }

  pub fn new(min: DVec3, max: DVec3) -> Self {
    Self { min, max }
  }

  pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  pub fn center(&self) -> DVec3 {
    0.5 * (self.min + self.max)
  }

  pub fn half_extents(&self) -> DVec3 {
    0.5 * (self.max - self.min)
  }

  pub fn is_valid(&self) -> bool {
    self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
  }

  /// Expand to include a point.
  pub fn encapsulate(&mut self, point: DVec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Union of two boxes.
  pub fn union(&self, other: &Aabb) -> Aabb {
    Aabb {
      min: self.min.min(other.min),
      max: self.max.max(other.max),
    }
  }

  /// Dilate (grow) the box uniformly by `tol` on every side.
  pub fn dilated(&self, tol: f64) -> Aabb {
    let pad = DVec3::splat(tol);
    Aabb {
      min: self.min - pad,
      max: self.max + pad,
    }
  }

  pub fn contains_point(&self, p: DVec3) -> bool {
    p.x >= self.min.x
      && p.x <= self.max.x
      && p.y >= self.min.y
      && p.y <= self.max.y
      && p.z >= self.min.z
      && p.z <= self.max.z
  }

  pub fn intersects(&self, other: &Aabb) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
      && self.min.z <= other.max.z
      && self.max.z >= other.min.z
  }

  /// Radius of the largest inscribed sphere/circle.
  pub fn inscribed_radius(&self) -> f64 {
    let he = self.half_extents();
    he.x.min(he.y).min(he.z)
  }

  /// Radius of the smallest circumscribing sphere/circle.
  pub fn circumscribed_radius(&self) -> f64 {
    self.half_extents().length()
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_then_encapsulate_recovers_point() {
    let mut b = Aabb::empty();
    b.encapsulate(DVec3::new(1.0, 2.0, 3.0));
    b.encapsulate(DVec3::new(-1.0, 0.0, 5.0));
    assert_eq!(b.min, DVec3::new(-1.0, 0.0, 3.0));
    assert_eq!(b.max, DVec3::new(1.0, 2.0, 5.0));
  }

  #[test]
  fn dilated_grows_symmetrically() {
    let b = Aabb::from_center_half_extents(DVec3::ZERO, DVec3::splat(1.0));
    let d = b.dilated(0.5);
    assert_eq!(d.min, DVec3::splat(-1.5));
    assert_eq!(d.max, DVec3::splat(1.5));
  }
}
