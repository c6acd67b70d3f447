//! Geometric primitives.
//!
//! A single tagged enum replaces a deep shape-class hierarchy (DESIGN
//! NOTES: "deep inheritance over material/geometry" -> tagged variant +
//! dispatch through match).

use glam::DVec3;

use crate::aabb::Aabb;

/// A geometric primitive or a signed composition of primitives.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
  Line { center: DVec3, length: f64 },
  Triangle { center: DVec3, circumradius: f64 },
  Square { center: DVec3, side: f64 },
  Rectangle { center: DVec3, half_extents: [f64; 2] },
  Hexagon { center: DVec3, circumradius: f64 },
  /// Two coaxial discs of different radii joined along z (a "drum" cross
  /// section), per the original's `drum2d` shape.
  Drum2d {
    center: DVec3,
    radius_top: f64,
    radius_bottom: f64,
    height: f64,
  },
  Cube { center: DVec3, side: f64 },
  Cuboid { center: DVec3, half_extents: DVec3 },
  Circle { center: DVec3, radius: f64 },
  Ellipse { center: DVec3, radii: [f64; 2] },
  Sphere { center: DVec3, radius: f64 },
  Cylinder { center: DVec3, radius: f64, height: f64 },
  /// Annular ring between two concentric radii.
  Annulus { center: DVec3, inner_radius: f64, outer_radius: f64 },
  /// Signed union/difference of child geometries. `isInside` is the union
  /// of children whose sign is +1 minus those whose sign is -1.
  Complex { children: Vec<(Box<Geometry>, i8)> },
}

/// Shared predicate contract for every primitive (spec §4.A).
pub trait GeometryOps {
  fn volume(&self) -> f64;
  fn center(&self) -> DVec3;
  fn bounding_box(&self, tol: f64) -> Aabb;
  fn inscribed_radius(&self) -> f64;
  fn bounding_radius(&self) -> f64;
  fn is_inside(&self, p: DVec3) -> bool;
  fn is_outside(&self, p: DVec3) -> bool {
    !self.is_inside(p)
  }
  fn is_near(&self, p: DVec3, tol: f64) -> bool;
  fn is_near_boundary(&self, p: DVec3, tol: f64, within: bool) -> bool;
  fn does_intersect(&self, p: DVec3) -> bool {
    self.is_inside(p)
  }
  fn box_is_inside(&self, b: &Aabb) -> bool;
  fn box_does_intersect(&self, b: &Aabb) -> bool;
}

impl GeometryOps for Geometry {
  fn volume(&self) -> f64 {
    use std::f64::consts::PI;
    match self {
      Geometry::Line { length, .. } => *length,
      Geometry::Triangle { circumradius, .. } => {
        // Equilateral triangle inscribed in circumradius r: area = 3*sqrt(3)/4 * r^2
        3.0 * 3f64.sqrt() / 4.0 * circumradius * circumradius
      }
      Geometry::Square { side, .. } => side * side,
      Geometry::Rectangle { half_extents, .. } => 4.0 * half_extents[0] * half_extents[1],
      Geometry::Hexagon { circumradius, .. } => 3.0 * 3f64.sqrt() / 2.0 * circumradius * circumradius,
      Geometry::Drum2d {
        radius_top,
        radius_bottom,
        height,
        ..
      } => 0.5 * (radius_top + radius_bottom) * height * 2.0,
      Geometry::Cube { side, .. } => side * side * side,
      Geometry::Cuboid { half_extents, .. } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
      Geometry::Circle { radius, .. } => PI * radius * radius,
      Geometry::Ellipse { radii, .. } => PI * radii[0] * radii[1],
      Geometry::Sphere { radius, .. } => 4.0 / 3.0 * PI * radius.powi(3),
      Geometry::Cylinder { radius, height, .. } => PI * radius * radius * height,
      Geometry::Annulus {
        inner_radius,
        outer_radius,
        ..
      } => PI * (outer_radius * outer_radius - inner_radius * inner_radius),
      Geometry::Complex { children } => {
        children.iter().map(|(g, sign)| (*sign as f64) * g.volume()).sum()
      }
    }
  }

  fn center(&self) -> DVec3 {
    match self {
      Geometry::Line { center, .. }
      | Geometry::Triangle { center, .. }
      | Geometry::Square { center, .. }
      | Geometry::Rectangle { center, .. }
      | Geometry::Hexagon { center, .. }
      | Geometry::Drum2d { center, .. }
      | Geometry::Cube { center, .. }
      | Geometry::Cuboid { center, .. }
      | Geometry::Circle { center, .. }
      | Geometry::Ellipse { center, .. }
      | Geometry::Sphere { center, .. }
      | Geometry::Cylinder { center, .. }
      | Geometry::Annulus { center, .. } => *center,
      Geometry::Complex { children } => {
        // Signed composite centroid; if net volume is ~0, fall back to the
        // largest filler's centroid (spec §4.A).
        let net_volume: f64 = children.iter().map(|(g, s)| (*s as f64) * g.volume()).sum();
        if net_volume.abs() > 1e-12 {
          let weighted: DVec3 = children
            .iter()
            .map(|(g, s)| g.center() * ((*s as f64) * g.volume()))
            .fold(DVec3::ZERO, |a, b| a + b);
          weighted / net_volume
        } else {
          children
            .iter()
            .filter(|(_, s)| *s > 0)
            .max_by(|(a, _), (b, _)| a.volume().partial_cmp(&b.volume()).unwrap())
            .map(|(g, _)| g.center())
            .unwrap_or(DVec3::ZERO)
        }
      }
    }
  }

  fn bounding_box(&self, tol: f64) -> Aabb {
    let b = match self {
      Geometry::Line { center, length } => {
        Aabb::from_center_half_extents(*center, DVec3::new(0.5 * length, 0.0, 0.0))
      }
      Geometry::Triangle { center, circumradius } | Geometry::Hexagon { center, circumradius } => {
        Aabb::from_center_half_extents(*center, DVec3::new(*circumradius, *circumradius, 0.0))
      }
      Geometry::Square { center, side } => {
        Aabb::from_center_half_extents(*center, DVec3::new(0.5 * side, 0.5 * side, 0.0))
      }
      Geometry::Rectangle { center, half_extents } => {
        Aabb::from_center_half_extents(*center, DVec3::new(half_extents[0], half_extents[1], 0.0))
      }
      Geometry::Drum2d {
        center,
        radius_top,
        radius_bottom,
        height,
      } => {
        let r = radius_top.max(*radius_bottom);
        Aabb::from_center_half_extents(*center, DVec3::new(r, r, 0.5 * height))
      }
      Geometry::Cube { center, side } => Aabb::from_center_half_extents(*center, DVec3::splat(0.5 * side)),
      Geometry::Cuboid { center, half_extents } => Aabb::from_center_half_extents(*center, *half_extents),
      Geometry::Circle { center, radius } => {
        Aabb::from_center_half_extents(*center, DVec3::new(*radius, *radius, 0.0))
      }
      Geometry::Ellipse { center, radii } => {
        Aabb::from_center_half_extents(*center, DVec3::new(radii[0], radii[1], 0.0))
      }
      Geometry::Sphere { center, radius } => Aabb::from_center_half_extents(*center, DVec3::splat(*radius)),
      Geometry::Cylinder { center, radius, height } => {
        Aabb::from_center_half_extents(*center, DVec3::new(*radius, *radius, 0.5 * height))
      }
      Geometry::Annulus { center, outer_radius, .. } => {
        Aabb::from_center_half_extents(*center, DVec3::new(*outer_radius, *outer_radius, 0.0))
      }
      Geometry::Complex { children } => {
        let mut b = Aabb::empty();
        for (g, _) in children {
          let cb = g.bounding_box(0.0);
          b = b.union(&cb);
        }
        b
      }
    };
    b.dilated(tol)
  }

  fn inscribed_radius(&self) -> f64 {
    match self {
      Geometry::Circle { radius, .. } | Geometry::Sphere { radius, .. } => *radius,
      Geometry::Square { side, .. } | Geometry::Cube { side, .. } => 0.5 * side,
      Geometry::Annulus { inner_radius, .. } => *inner_radius,
      _ => self.bounding_box(0.0).inscribed_radius(),
    }
  }

  fn bounding_radius(&self) -> f64 {
    match self {
      Geometry::Circle { radius, .. } | Geometry::Sphere { radius, .. } => *radius,
      Geometry::Triangle { circumradius, .. } | Geometry::Hexagon { circumradius, .. } => *circumradius,
      Geometry::Annulus { outer_radius, .. } => *outer_radius,
      _ => self.bounding_box(0.0).circumscribed_radius(),
    }
  }

  fn is_inside(&self, p: DVec3) -> bool {
    match self {
      Geometry::Line { center, length } => {
        (p - *center).length() <= 0.5 * length && (p.y - center.y).abs() < 1e-12 && (p.z - center.z).abs() < 1e-12
      }
      Geometry::Triangle { center, circumradius } => (p - *center).length() <= *circumradius,
      Geometry::Hexagon { center, circumradius } => (p - *center).length() <= *circumradius,
      Geometry::Square { center, side } => {
        (p.x - center.x).abs() <= 0.5 * side && (p.y - center.y).abs() <= 0.5 * side
      }
      Geometry::Rectangle { center, half_extents } => {
        (p.x - center.x).abs() <= half_extents[0] && (p.y - center.y).abs() <= half_extents[1]
      }
      Geometry::Drum2d {
        center,
        radius_top,
        radius_bottom,
        height,
      } => {
        if (p.z - center.z).abs() > 0.5 * height {
          return false;
        }
        let t = ((p.z - center.z) + 0.5 * height) / height; // 0 at bottom, 1 at top
        let r = radius_bottom + t * (radius_top - radius_bottom);
        let planar = DVec3::new(p.x - center.x, p.y - center.y, 0.0).length();
        planar <= r
      }
      Geometry::Cube { center, side } => {
        (p.x - center.x).abs() <= 0.5 * side
          && (p.y - center.y).abs() <= 0.5 * side
          && (p.z - center.z).abs() <= 0.5 * side
      }
      Geometry::Cuboid { center, half_extents } => {
        (p.x - center.x).abs() <= half_extents.x
          && (p.y - center.y).abs() <= half_extents.y
          && (p.z - center.z).abs() <= half_extents.z
      }
      Geometry::Circle { center, radius } => (p - *center).length() <= *radius,
      Geometry::Ellipse { center, radii } => {
        let dx = (p.x - center.x) / radii[0];
        let dy = (p.y - center.y) / radii[1];
        dx * dx + dy * dy <= 1.0
      }
      Geometry::Sphere { center, radius } => (p - *center).length() <= *radius,
      Geometry::Cylinder { center, radius, height } => {
        let planar = DVec3::new(p.x - center.x, p.y - center.y, 0.0).length();
        planar <= *radius && (p.z - center.z).abs() <= 0.5 * height
      }
      Geometry::Annulus {
        center,
        inner_radius,
        outer_radius,
      } => {
        let d = (p - *center).length();
        d >= *inner_radius && d <= *outer_radius
      }
      Geometry::Complex { children } => {
        // Sequential accumulation, not a pure set union/difference: a
        // negative-signed child excludes from whatever is accumulated so
        // far, a positive-signed one adds to it, each folded left to right.
        let Some(((first, _), rest)) = children.split_first() else {
          return false;
        };
        let mut inside = first.is_inside(p);
        for (g, sign) in rest {
          inside = if *sign < 0 {
            inside && !g.is_inside(p)
          } else {
            inside || g.is_inside(p)
          };
        }
        inside
      }
    }
  }

  fn is_near(&self, p: DVec3, tol: f64) -> bool {
    self.bounding_box(tol).contains_point(p)
  }

  fn is_near_boundary(&self, p: DVec3, tol: f64, within: bool) -> bool {
    let inside = self.is_inside(p);
    if within && !inside {
      return false;
    }
    if !within && inside {
      return false;
    }
    // Approximate boundary distance via bounding-radius difference; exact
    // for the radial primitives, conservative elsewhere.
    let d = (p - self.center()).length();
    (d - self.bounding_radius()).abs() <= tol || (d - self.inscribed_radius()).abs() <= tol
  }

  fn box_is_inside(&self, b: &Aabb) -> bool {
    let corners = [
      DVec3::new(b.min.x, b.min.y, b.min.z),
      DVec3::new(b.max.x, b.min.y, b.min.z),
      DVec3::new(b.min.x, b.max.y, b.min.z),
      DVec3::new(b.max.x, b.max.y, b.min.z),
      DVec3::new(b.min.x, b.min.y, b.max.z),
      DVec3::new(b.max.x, b.min.y, b.max.z),
      DVec3::new(b.min.x, b.max.y, b.max.z),
      DVec3::new(b.max.x, b.max.y, b.max.z),
    ];
    corners.iter().all(|c| self.is_inside(*c))
  }

  fn box_does_intersect(&self, b: &Aabb) -> bool {
    self.bounding_box(0.0).intersects(b)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sphere_volume_matches_closed_form() {
    let s = Geometry::Sphere {
      center: DVec3::ZERO,
      radius: 2.0,
    };
    let expected = 4.0 / 3.0 * std::f64::consts::PI * 8.0;
    assert!((s.volume() - expected).abs() < 1e-9);
  }

  #[test]
  fn cuboid_is_inside_respects_each_axis() {
    let c = Geometry::Cuboid {
      center: DVec3::ZERO,
      half_extents: DVec3::new(1.0, 2.0, 3.0),
    };
    assert!(c.is_inside(DVec3::new(0.9, 1.9, 2.9)));
    assert!(!c.is_inside(DVec3::new(1.1, 0.0, 0.0)));
  }

  #[test]
  fn annulus_excludes_core_and_far_field() {
    let a = Geometry::Annulus {
      center: DVec3::ZERO,
      inner_radius: 1.0,
      outer_radius: 2.0,
    };
    assert!(!a.is_inside(DVec3::new(0.5, 0.0, 0.0)));
    assert!(a.is_inside(DVec3::new(1.5, 0.0, 0.0)));
    assert!(!a.is_inside(DVec3::new(3.0, 0.0, 0.0)));
  }

  #[test]
  fn complex_difference_punches_a_hole() {
    let outer = Geometry::Cube {
      center: DVec3::ZERO,
      side: 4.0,
    };
    let hole = Geometry::Sphere {
      center: DVec3::ZERO,
      radius: 1.0,
    };
    let block = Geometry::Complex {
      children: vec![(Box::new(outer), 1), (Box::new(hole), -1)],
    };
    assert!(!block.is_inside(DVec3::ZERO));
    assert!(block.is_inside(DVec3::new(1.5, 0.0, 0.0)));
    assert!(!block.is_inside(DVec3::new(3.0, 0.0, 0.0)));
  }

  #[test]
  fn bounding_box_is_dilated_by_tolerance() {
    let s = Geometry::Sphere {
      center: DVec3::ZERO,
      radius: 1.0,
    };
    let b = s.bounding_box(0.1);
    assert!((b.max.x - 1.1).abs() < 1e-12);
  }
}
