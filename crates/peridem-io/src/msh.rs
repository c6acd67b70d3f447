//! Gmsh MSH 2.0 ASCII (`.msh`) writer. Grounded directly on
//! `original_source/src/rw/mshWriter.cpp`: same section structure
//! (`$MeshFormat`/`$Nodes`/`$Elements`/`$NodeData`), same 1-based node and
//! element numbering, same per-array data-header layout (string-tag count,
//! name, real-tag count, time, integer-tag count, tag id, field type,
//! component count).

use std::fmt::Write as _;
use std::path::Path;

use peridem_core::{ElementType, ModelState};

use crate::error::IoError;
use crate::tags::OutputTag;

/// Gmsh's element-type code for each VTK cell type this crate emits.
fn msh_element_type(element_type: ElementType) -> usize {
  match element_type {
    ElementType::Line => 1,
    ElementType::Triangle => 2,
    ElementType::Quad => 3,
    ElementType::Tetra => 4,
  }
}

pub struct MshWriter;

impl MshWriter {
  pub fn write_step(path: &Path, state: &ModelState, tags: &[OutputTag]) -> Result<(), IoError> {
    let mut out = String::new();

    out.push_str("$MeshFormat\n2.0 0 8\n$EndMeshFormat\n");

    writeln!(out, "$Nodes\n{}", state.nodes.len()).unwrap();
    for (i, p) in state.nodes.position.iter().enumerate() {
      writeln!(out, "{} {} {} {}", i + 1, p.x, p.y, p.z).unwrap();
    }
    out.push_str("$EndNodes\n");

    let mut elements: Vec<(usize, Vec<usize>)> = Vec::new();
    for particle in &state.particles {
      let mesh = state.reference_particle(particle.reference);
      let msh_type = msh_element_type(mesh.element_type);
      for cell in &mesh.connectivity {
        elements.push((msh_type, cell.iter().map(|&local| particle.local_to_global(local)).collect()));
      }
    }

    writeln!(out, "$Elements\n{}", elements.len()).unwrap();
    for (e, (msh_type, conn)) in elements.iter().enumerate() {
      write!(out, "{} {} 2 0 6 ", e + 1, msh_type).unwrap();
      for &n in conn {
        write!(out, "{} ", n + 1).unwrap();
      }
      out.push('\n');
    }
    out.push_str("$EndElements\n");

    let mut ntag = 0;
    for tag in tags {
      match tag {
        OutputTag::Displacement => write_vector_node_data(&mut out, tag.name(), &state.nodes.displacement, &mut ntag),
        OutputTag::Velocity => write_vector_node_data(&mut out, tag.name(), &state.nodes.velocity, &mut ntag),
        OutputTag::Force => write_vector_node_data(&mut out, tag.name(), &state.nodes.force, &mut ntag),
        OutputTag::Fixity => write_scalar_node_data(&mut out, tag.name(), state.nodes.fixity.iter().map(|&b| b as f64), state.nodes.len(), &mut ntag),
        OutputTag::ParticleId => write_scalar_node_data(&mut out, tag.name(), state.nodes.particle_id.iter().map(|&id| id as f64), state.nodes.len(), &mut ntag),
        OutputTag::NodalVolume => write_scalar_node_data(&mut out, tag.name(), state.nodes.volume.iter().copied(), state.nodes.len(), &mut ntag),
        OutputTag::DamageZ => write_scalar_node_data(&mut out, tag.name(), state.nodes.damage.iter().copied(), state.nodes.len(), &mut ntag),
        OutputTag::Theta => write_scalar_node_data(&mut out, tag.name(), state.nodes.dilation.iter().copied(), state.nodes.len(), &mut ntag),
        OutputTag::ForceDensity | OutputTag::ZoneId | OutputTag::StrainStress | OutputTag::ParticleLocations => {}
      }
    }

    writeln!(out, "$NodeData\n1\n\"time\"\n1 \n{} \n3 \n{}\n1\n1", state.time, ntag).unwrap();
    out.push_str("1 0.0\n$EndNodeData\n");

    std::fs::write(path, out).map_err(|e| IoError::Unwritable { path: path.display().to_string(), source: e })
  }
}

fn write_vector_node_data(out: &mut String, name: &str, data: &[glam::DVec3], ntag: &mut usize) {
  writeln!(out, "$NodeData\n1\n\"{name}\"\n1 \n1.0 \n3 \n{ntag}\n3\n{}", data.len()).unwrap();
  *ntag += 1;
  for (i, v) in data.iter().enumerate() {
    writeln!(out, "{} {} {} {}", i + 1, v.x, v.y, v.z).unwrap();
  }
  out.push_str("$EndNodeData\n");
}

fn write_scalar_node_data<I: Iterator<Item = f64>>(out: &mut String, name: &str, data: I, len: usize, ntag: &mut usize) {
  writeln!(out, "$NodeData\n1\n\"{name}\"\n1 \n1.0 \n3 \n{ntag}\n1\n{len}").unwrap();
  *ntag += 1;
  for (i, v) in data.enumerate() {
    writeln!(out, "{} {}", i + 1, v).unwrap();
  }
  out.push_str("$EndNodeData\n");
}
