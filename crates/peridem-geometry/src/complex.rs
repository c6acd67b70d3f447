//! Helpers for building signed composite geometries.
//!
//! Grounded on the original's `ComplexGeomObject`: a flat list of child
//! objects paired with a `+1`/`-1` flag, evaluated left to right rather
//! than as a commutative set operation (see `Geometry::Complex` in
//! `shapes.rs` for the fold itself).

use thiserror::Error;

use crate::shapes::Geometry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BadComplexSpec {
  #[error("complex geometry needs at least one child object")]
  Empty,
  #[error("child sign must be +1 or -1, got {0}")]
  BadSign(i8),
}

/// Assemble a [`Geometry::Complex`] from children and their `+1`/`-1`
/// signs, validating arity and sign values up front.
pub fn build(children: Vec<(Geometry, i8)>) -> Result<Geometry, BadComplexSpec> {
  if children.is_empty() {
    return Err(BadComplexSpec::Empty);
  }
  for (_, sign) in &children {
    if *sign != 1 && *sign != -1 {
      return Err(BadComplexSpec::BadSign(*sign));
    }
  }
  Ok(Geometry::Complex {
    children: children.into_iter().map(|(g, s)| (Box::new(g), s)).collect(),
  })
}
