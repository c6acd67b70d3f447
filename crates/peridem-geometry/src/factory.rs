//! Build a [`Geometry`] from a type name and a flat parameter vector.
//!
//! Grounded on the original's `geomObjectsUitl.cpp` object-factory, which
//! reads a `type` tag plus a `params` list out of the input deck and
//! dispatches on string equality. Here the dispatch is a `match` over a
//! `&str` and malformed parameter counts produce a typed error instead of
//! `exit(1)`.

use glam::DVec3;
use thiserror::Error;

use crate::shapes::Geometry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BadGeometryParams {
  #[error("unknown geometry type '{0}'")]
  UnknownType(String),
  #[error("geometry '{kind}' needs {expected} parameters, got {actual}")]
  WrongArity {
    kind: &'static str,
    expected: usize,
    actual: usize,
  },
}

fn point(p: &[f64]) -> DVec3 {
  DVec3::new(p[0], p[1], p[2])
}

fn require(kind: &'static str, params: &[f64], expected: usize) -> Result<(), BadGeometryParams> {
  if params.len() != expected {
    Err(BadGeometryParams::WrongArity {
      kind,
      expected,
      actual: params.len(),
    })
  } else {
    Ok(())
  }
}

/// Construct a primitive by name. `params` layout mirrors the original
/// input-deck convention: the primitive's own scalars first, followed by
/// the center point's three coordinates (two points, in the case of a
/// cylinder's axis).
pub fn build(kind: &str, params: &[f64]) -> Result<Geometry, BadGeometryParams> {
  match kind {
    "line" => {
      require(kind, params, 4)?;
      Ok(Geometry::Line {
        length: params[0],
        center: point(&params[1..4]),
      })
    }
    "triangle" => {
      require(kind, params, 4)?;
      Ok(Geometry::Triangle {
        circumradius: params[0],
        center: point(&params[1..4]),
      })
    }
    "square" => {
      require(kind, params, 4)?;
      Ok(Geometry::Square {
        side: params[0],
        center: point(&params[1..4]),
      })
    }
    "rectangle" => {
      require(kind, params, 5)?;
      Ok(Geometry::Rectangle {
        half_extents: [0.5 * params[0], 0.5 * params[1]],
        center: point(&params[2..5]),
      })
    }
    "hexagon" => {
      require(kind, params, 4)?;
      Ok(Geometry::Hexagon {
        circumradius: params[0],
        center: point(&params[1..4]),
      })
    }
    "drum2d" => {
      require(kind, params, 6)?;
      Ok(Geometry::Drum2d {
        radius_bottom: params[0],
        radius_top: params[1],
        height: params[2],
        center: point(&params[3..6]),
      })
    }
    "cube" => {
      require(kind, params, 4)?;
      Ok(Geometry::Cube {
        side: params[0],
        center: point(&params[1..4]),
      })
    }
    "cuboid" => {
      require(kind, params, 6)?;
      Ok(Geometry::Cuboid {
        half_extents: DVec3::new(0.5 * params[0], 0.5 * params[1], 0.5 * params[2]),
        center: point(&params[3..6]),
      })
    }
    "circle" => {
      require(kind, params, 4)?;
      Ok(Geometry::Circle {
        radius: params[0],
        center: point(&params[1..4]),
      })
    }
    "ellipse" => {
      require(kind, params, 5)?;
      Ok(Geometry::Ellipse {
        radii: [params[0], params[1]],
        center: point(&params[2..5]),
      })
    }
    "sphere" => {
      require(kind, params, 4)?;
      Ok(Geometry::Sphere {
        radius: params[0],
        center: point(&params[1..4]),
      })
    }
    "cylinder" => {
      require(kind, params, 7)?;
      let base = point(&params[1..4]);
      let top = point(&params[4..7]);
      Ok(Geometry::Cylinder {
        radius: params[0],
        height: (top - base).length(),
        center: 0.5 * (base + top),
      })
    }
    "annulus" => {
      require(kind, params, 5)?;
      Ok(Geometry::Annulus {
        inner_radius: params[0],
        outer_radius: params[1],
        center: point(&params[2..5]),
      })
    }
    other => Err(BadGeometryParams::UnknownType(other.to_string())),
  }
}
