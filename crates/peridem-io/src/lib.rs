//! peridem-io - mesh/restart I/O, output writers, and input-deck loading.
//!
//! Sits above `peridem-core`/`peridem-geometry`: turns a YAML input deck
//! into a runnable `SimulationSetup`, and turns a `ModelState` snapshot
//! into a written grid file. Application binaries live in `peridem-cli`.

pub mod csv;
pub mod deck;
pub mod error;
pub mod msh;
pub mod restart;
pub mod tags;
pub mod vtu;

pub use deck::InputDeck;
pub use error::{ConfigError, IoError};
pub use restart::{RestartData, RestartReader};
pub use tags::OutputTag;

use std::path::Path;

use peridem_core::ModelState;

/// Shared contract for every per-step grid writer (spec §4.M): open, write,
/// flush, and close entirely within the call — no writer holds a file
/// handle between steps.
pub trait OutputWriter {
  fn write_step(&self, path: &Path, step: u64, state: &ModelState, tags: &[OutputTag]) -> Result<(), IoError>;
}

pub struct Vtu;
pub struct Msh;

impl OutputWriter for Vtu {
  fn write_step(&self, path: &Path, _step: u64, state: &ModelState, tags: &[OutputTag]) -> Result<(), IoError> {
    vtu::VtuWriter::write_step(path, state, tags)
  }
}

impl OutputWriter for Msh {
  fn write_step(&self, path: &Path, _step: u64, state: &ModelState, tags: &[OutputTag]) -> Result<(), IoError> {
    msh::MshWriter::write_step(path, state, tags)
  }
}

/// Builds the path for a per-step output file: `{dir}/{test_name}_{step}.{ext}`.
pub fn step_file_path(dir: &Path, test_name: &str, step: u64, ext: &str) -> std::path::PathBuf {
  dir.join(format!("{test_name}_{step}.{ext}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use glam::DVec3;
  use peridem_core::{ElementType, GeometryHandle, MaterialHandle, Particle, ParticleId, ParticleKind, ReferenceMesh, ReferenceParticleHandle, Transform};

  fn one_node_state() -> ModelState {
    let mut state = ModelState::new();
    let mesh = ReferenceMesh::new(vec![DVec3::ZERO], vec![1.0], Vec::new(), ElementType::Line, 3);
    state.reference_particles.push(mesh);
    state.particles.push(Particle {
      id: ParticleId(0),
      kind: ParticleKind::Particle,
      zone_id: 0,
      reference: ReferenceParticleHandle(0),
      geometry: GeometryHandle(0),
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
    state
  }

  #[test]
  fn both_writers_implement_the_shared_trait() {
    let state = one_node_state();
    let dir = std::env::temp_dir();
    let vtu_path = step_file_path(&dir, "peridem_io_test", 0, "vtu");
    let msh_path = step_file_path(&dir, "peridem_io_test", 0, "msh");
    Vtu.write_step(&vtu_path, 0, &state, &[OutputTag::Displacement]).unwrap();
    Msh.write_step(&msh_path, 0, &state, &[OutputTag::Displacement]).unwrap();
    assert!(vtu_path.exists());
    assert!(msh_path.exists());
    let _ = std::fs::remove_file(&vtu_path);
    let _ = std::fs::remove_file(&msh_path);
  }
}
