//! Restart support: reparses a previously written `.vtu` grid file to
//! recover node positions, displacement, and velocity, so a run can resume
//! from a checkpoint. Grounded on `original_source/src/rw/reader.h`'s
//! `vtkParticleReader`/mesh-reader family (read path mirrors the writer it
//! pairs with) using `quick_xml`'s pull reader rather than `vtu.rs`'s push
//! writer.

use std::path::Path;

use glam::DVec3;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::IoError;

pub struct RestartData {
  pub positions: Vec<DVec3>,
  pub displacement: Vec<DVec3>,
  pub velocity: Vec<DVec3>,
}

pub struct RestartReader;

impl RestartReader {
  pub fn read(path: &Path) -> Result<RestartData, IoError> {
    let text = std::fs::read_to_string(path).map_err(|e| IoError::Unreadable { path: path.display().to_string(), source: e })?;
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut positions = Vec::new();
    let mut displacement = Vec::new();
    let mut velocity = Vec::new();

    // Tracks which array we're inside: "Points" (implicit, always 3-component)
    // or a named PointData array.
    let mut current: Option<String> = None;
    let mut inside_points = false;
    let mut buf = Vec::new();

    loop {
      match reader.read_event_into(&mut buf).map_err(|e| IoError::Parse { path: path.display().to_string(), reason: e.to_string() })? {
        Event::Eof => break,
        Event::Start(e) => {
          let name = e.name();
          let local = String::from_utf8_lossy(name.as_ref()).to_string();
          if local == "Points" {
            inside_points = true;
          } else if local == "DataArray" {
            for attr in e.attributes().flatten() {
              if attr.key.as_ref() == b"Name" {
                current = Some(String::from_utf8_lossy(&attr.value).to_string());
              }
            }
          }
        }
        Event::End(e) => {
          let local = String::from_utf8_lossy(e.name().as_ref()).to_string();
          if local == "Points" {
            inside_points = false;
          } else if local == "DataArray" {
            current = None;
          }
        }
        Event::Text(t) => {
          let text = t.unescape().map_err(|e| IoError::Parse { path: path.display().to_string(), reason: e.to_string() })?;
          let values: Vec<f64> = text.split_whitespace().filter_map(|s| s.parse::<f64>().ok()).collect();
          if inside_points {
            positions = values.chunks(3).map(|c| DVec3::new(c[0], c[1], c[2])).collect();
          } else if let Some(name) = &current {
            match name.as_str() {
              "Displacement" => displacement = values.chunks(3).map(|c| DVec3::new(c[0], c[1], c[2])).collect(),
              "Velocity" => velocity = values.chunks(3).map(|c| DVec3::new(c[0], c[1], c[2])).collect(),
              _ => {}
            }
          }
        }
        _ => {}
      }
      buf.clear();
    }

    if positions.is_empty() {
      return Err(IoError::RestartMissingArray(path.display().to_string(), "Points"));
    }
    if displacement.is_empty() {
      displacement = vec![DVec3::ZERO; positions.len()];
    }
    if velocity.is_empty() {
      velocity = vec![DVec3::ZERO; positions.len()];
    }

    Ok(RestartData { positions, displacement, velocity })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tags::OutputTag;
  use crate::vtu::VtuWriter;
  use peridem_core::{ElementType, GeometryHandle, MaterialHandle, ModelState, Particle, ParticleId, ParticleKind, ReferenceMesh, ReferenceParticleHandle, Transform};

  fn one_quad_state() -> ModelState {
    let mut state = ModelState::new();
    let mesh = ReferenceMesh::new(
      vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0), DVec3::new(1.0, 1.0, 0.0), DVec3::new(0.0, 1.0, 0.0)],
      vec![0.25; 4],
      vec![vec![0, 1, 2, 3]],
      ElementType::Quad,
      2,
    );
    state.reference_particles.push(mesh);
    state.particles.push(Particle {
      id: ParticleId(0),
      kind: ParticleKind::Particle,
      zone_id: 0,
      reference: ReferenceParticleHandle(0),
      geometry: GeometryHandle(0),
      transform: Transform::identity(),
      material: MaterialHandle(0),
      horizon: 0.3,
      h: 1.0,
      density: 1000.0,
      kn: 1.0,
      rc: 0.95,
      all_dofs_constrained: false,
      compute_force: true,
      node_range: 0..4,
    });
    for i in 0..4 {
      let p = state.reference_particles[0].nodes[i];
      state.nodes.reference_position.push(p);
      state.nodes.position.push(p + DVec3::new(0.0, 0.0, 0.5));
      state.nodes.displacement.push(DVec3::new(0.0, 0.0, 0.5));
      state.nodes.velocity.push(DVec3::new(1.0, 0.0, 0.0));
      state.nodes.force.push(DVec3::ZERO);
      state.nodes.volume.push(0.25);
      state.nodes.fixity.push(0);
      state.nodes.weighted_volume.push(0.0);
      state.nodes.dilation.push(0.0);
      state.nodes.damage.push(0.0);
      state.nodes.particle_id.push(0);
      state.nodes.velocity_magnitude.push(0.0);
    }
    state
  }

  #[test]
  fn round_trips_position_displacement_and_velocity_through_a_written_vtu() {
    let state = one_quad_state();
    let path = std::env::temp_dir().join(format!("peridem_restart_test_{}.vtu", std::process::id()));
    VtuWriter::write_step(&path, &state, &[OutputTag::Displacement, OutputTag::Velocity]).unwrap();

    let restart = RestartReader::read(&path).unwrap();
    assert_eq!(restart.positions.len(), 4);
    for i in 0..4 {
      assert!((restart.positions[i] - state.nodes.position[i]).length() < 1e-9);
      assert!((restart.displacement[i] - state.nodes.displacement[i]).length() < 1e-9);
      assert!((restart.velocity[i] - state.nodes.velocity[i]).length() < 1e-9);
    }
    let _ = std::fs::remove_file(&path);
  }
}
