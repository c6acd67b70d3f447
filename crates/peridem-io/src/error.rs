//! I/O and configuration error taxonomy (spec §7: `MeshDataError`,
//! `IOError`, `ConfigurationError`).
//!
//! One `#[derive(thiserror::Error)]` enum per failure surface, one
//! `#[error]` variant per failure mode, applied here to the I/O boundary
//! and the input-deck validation boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
  #[error("could not read '{path}': {source}")]
  Unreadable { path: String, #[source] source: std::io::Error },
  #[error("could not write '{path}': {source}")]
  Unwritable { path: String, #[source] source: std::io::Error },
  #[error("element type {0:?} is not supported by the strain/stress routine")]
  MeshDataError(peridem_core::ElementType),
  #[error("failed to parse '{path}': {reason}")]
  Parse { path: String, reason: String },
  #[error("restart file '{0}' is missing required array '{1}'")]
  RestartMissingArray(String, &'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("could not read input deck '{path}': {source}")]
  Unreadable { path: String, #[source] source: std::io::Error },
  #[error("could not parse input deck '{path}': {source}")]
  Yaml { path: String, #[source] source: serde_yaml::Error },
  #[error("zone {0} is marked as a wall but also lists displacement/force loadings, which only apply to deformable particles")]
  ContradictoryZoneRole(u32),
  #[error("zone {0}'s material deck does not supply enough elastic constants to resolve the model")]
  MissingMaterialParams(u32),
  #[error("unknown time-integration scheme '{0}', expected 'central_difference' or 'velocity_verlet'")]
  InvalidIntegrator(String),
  #[error("contact section references zone pair ({0}, {1}) but zone {2} is not declared")]
  UnknownZone(u32, u32, u32),
  #[error("particle-cluster file '{path}': {reason}")]
  ClusterFile { path: String, reason: String },
}
