//! VTK XML UnstructuredGrid (`.vtu`) writer: the primary per-step output
//! format. Grounded on `original_source/src/rw/vtkWriter.cpp`'s
//! `appendNodes`/`appendMesh`/`appendPointData` sequence; this writer
//! reproduces the same Points/Cells/PointData shape directly as ASCII XML
//! rather than going through a VTK library binding, since none of the
//! teacher's/pack's dependency stacks vendor one.

use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use peridem_core::ModelState;

use crate::error::IoError;
use crate::tags::OutputTag;

/// Writes one `ModelState` snapshot as a VTK XML UnstructuredGrid.
pub struct VtuWriter;

impl VtuWriter {
  pub fn write_step(path: &Path, state: &ModelState, tags: &[OutputTag]) -> Result<(), IoError> {
    let mut xml = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    xml
      .write_event(Event::Decl(quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), None)))
      .map_err(|e| xml_err(path, e))?;

    let mut vtkfile = BytesStart::new("VTKFile");
    vtkfile.push_attribute(("type", "UnstructuredGrid"));
    vtkfile.push_attribute(("version", "0.1"));
    vtkfile.push_attribute(("byte_order", "LittleEndian"));
    xml.write_event(Event::Start(vtkfile)).map_err(|e| xml_err(path, e))?;
    xml.write_event(Event::Start(BytesStart::new("UnstructuredGrid"))).map_err(|e| xml_err(path, e))?;

    let num_points = state.nodes.len();
    let num_cells: usize = state.particles.iter().map(|p| state.reference_particle(p.reference).connectivity.len()).sum();

    let mut piece = BytesStart::new("Piece");
    piece.push_attribute(("NumberOfPoints", num_points.to_string().as_str()));
    piece.push_attribute(("NumberOfCells", num_cells.to_string().as_str()));
    xml.write_event(Event::Start(piece)).map_err(|e| xml_err(path, e))?;

    write_points(&mut xml, state, path)?;
    write_cells(&mut xml, state, path)?;
    write_point_data(&mut xml, state, tags, path)?;

    xml.write_event(Event::End(BytesEnd::new("Piece"))).map_err(|e| xml_err(path, e))?;
    xml.write_event(Event::End(BytesEnd::new("UnstructuredGrid"))).map_err(|e| xml_err(path, e))?;
    xml.write_event(Event::End(BytesEnd::new("VTKFile"))).map_err(|e| xml_err(path, e))?;

    let bytes = xml.into_inner().into_inner();
    std::fs::write(path, bytes).map_err(|e| IoError::Unwritable { path: path.display().to_string(), source: e })
  }
}

fn write_points(xml: &mut Writer<Cursor<Vec<u8>>>, state: &ModelState, path: &Path) -> Result<(), IoError> {
  xml.write_event(Event::Start(BytesStart::new("Points"))).map_err(|e| xml_err(path, e))?;
  write_ascii_array(xml, "Points", 3, state.nodes.position.iter().flat_map(|p| [p.x, p.y, p.z]), path)?;
  xml.write_event(Event::End(BytesEnd::new("Points"))).map_err(|e| xml_err(path, e))
}

fn write_cells(xml: &mut Writer<Cursor<Vec<u8>>>, state: &ModelState, path: &Path) -> Result<(), IoError> {
  xml.write_event(Event::Start(BytesStart::new("Cells"))).map_err(|e| xml_err(path, e))?;

  let mut connectivity = Vec::new();
  let mut offsets = Vec::new();
  let mut types = Vec::new();
  let mut running_offset = 0usize;

  for particle in &state.particles {
    let mesh = state.reference_particle(particle.reference);
    for cell in &mesh.connectivity {
      for &local in cell {
        connectivity.push(particle.local_to_global(local) as i64);
      }
      running_offset += cell.len();
      offsets.push(running_offset as i64);
      types.push(mesh.element_type as i64);
    }
  }

  write_typed_ascii_array(xml, "connectivity", "Int64", 1, connectivity.into_iter(), path)?;
  write_typed_ascii_array(xml, "offsets", "Int64", 1, offsets.into_iter(), path)?;
  write_typed_ascii_array(xml, "types", "UInt8", 1, types.into_iter(), path)?;

  xml.write_event(Event::End(BytesEnd::new("Cells"))).map_err(|e| xml_err(path, e))
}

fn write_point_data(xml: &mut Writer<Cursor<Vec<u8>>>, state: &ModelState, tags: &[OutputTag], path: &Path) -> Result<(), IoError> {
  xml.write_event(Event::Start(BytesStart::new("PointData"))).map_err(|e| xml_err(path, e))?;

  for tag in tags {
    match tag {
      OutputTag::Displacement => write_ascii_array(xml, tag.name(), 3, state.nodes.displacement.iter().flat_map(|v| [v.x, v.y, v.z]), path)?,
      OutputTag::Velocity => write_ascii_array(xml, tag.name(), 3, state.nodes.velocity.iter().flat_map(|v| [v.x, v.y, v.z]), path)?,
      OutputTag::Force => write_ascii_array(xml, tag.name(), 3, state.nodes.force.iter().flat_map(|v| [v.x, v.y, v.z]), path)?,
      OutputTag::ForceDensity => {
        let density = (0..state.nodes.len()).flat_map(|i| {
          let f = state.nodes.force[i];
          let v = state.nodes.volume[i].max(1e-300);
          [f.x / v, f.y / v, f.z / v]
        });
        write_ascii_array(xml, tag.name(), 3, density, path)?
      }
      OutputTag::Fixity => write_typed_ascii_array(xml, tag.name(), "Int64", 1, state.nodes.fixity.iter().map(|&b| b as i64), path)?,
      OutputTag::ParticleId => write_typed_ascii_array(xml, tag.name(), "Int64", 1, state.nodes.particle_id.iter().map(|&id| id as i64), path)?,
      OutputTag::ZoneId => {
        let zone = (0..state.nodes.len()).map(|i| state.particles[state.nodes.particle_id[i] as usize].zone_id as i64);
        write_typed_ascii_array(xml, tag.name(), "Int64", 1, zone, path)?
      }
      OutputTag::NodalVolume => write_ascii_array(xml, tag.name(), 1, state.nodes.volume.iter().copied(), path)?,
      OutputTag::DamageZ => write_ascii_array(xml, tag.name(), 1, state.nodes.damage.iter().copied(), path)?,
      OutputTag::Theta => write_ascii_array(xml, tag.name(), 1, state.nodes.dilation.iter().copied(), path)?,
      OutputTag::StrainStress | OutputTag::ParticleLocations => {
        // Written by dedicated formats (csv::CsvWriter); not part of the
        // node-indexed grid file.
      }
    }
  }

  xml.write_event(Event::End(BytesEnd::new("PointData"))).map_err(|e| xml_err(path, e))
}

fn write_ascii_array<I, T>(xml: &mut Writer<Cursor<Vec<u8>>>, name: &str, components: usize, values: I, path: &Path) -> Result<(), IoError>
where
  I: Iterator<Item = T>,
  T: std::fmt::Display,
{
  write_typed_ascii_array(xml, name, "Float64", components, values, path)
}

fn write_typed_ascii_array<I, T>(
  xml: &mut Writer<Cursor<Vec<u8>>>,
  name: &str,
  data_type: &str,
  components: usize,
  values: I,
  path: &Path,
) -> Result<(), IoError>
where
  I: Iterator<Item = T>,
  T: std::fmt::Display,
{
  let mut array = BytesStart::new("DataArray");
  array.push_attribute(("type", data_type));
  array.push_attribute(("Name", name));
  array.push_attribute(("NumberOfComponents", components.to_string().as_str()));
  array.push_attribute(("format", "ascii"));
  xml.write_event(Event::Start(array)).map_err(|e| xml_err(path, e))?;

  let text = values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
  xml.write_event(Event::Text(BytesText::new(&text))).map_err(|e| xml_err(path, e))?;
  xml.write_event(Event::End(BytesEnd::new("DataArray"))).map_err(|e| xml_err(path, e))
}

fn xml_err(path: &Path, e: quick_xml::Error) -> IoError {
  IoError::Parse { path: path.display().to_string(), reason: e.to_string() }
}
