//! peridem-geometry - Geometric primitives and point/box predicates
//!
//! Provides the `Geometry` enum (boxes, spheres, cylinders, and the rest
//! of the primitive family) used to describe particle reference shapes
//! and domain/boundary regions, plus an axis-aligned bounding box type
//! shared by the spatial index.

pub mod aabb;
pub mod complex;
pub mod factory;
pub mod shapes;

pub use aabb::Aabb;
pub use shapes::{Geometry, GeometryOps};
