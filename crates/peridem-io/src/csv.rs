//! CSV mesh/particle-cluster readers and CSV output writers. Grounded on
//! `original_source/src/rw/reader.h`'s `readCsvFile` / `readParticleCsvFile`
//! / `readParticleWithOrientCsvFile` family (node+volume mesh files,
//! particle-cluster center/radius/zone files, with-orientation variant) and
//! `apps/twop/main.cpp`'s post-processing CSV column header for the
//! writer side.

use std::path::Path;

use glam::DVec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::IoError;

/// One row of a plain node/volume mesh CSV: `x,y,z,volume`.
pub struct NodeVolumeCsv {
  pub nodes: Vec<DVec3>,
  pub volumes: Vec<f64>,
}

/// Reads a node/volume mesh file: one `x,y,z,volume` row per line, no
/// header. Mirrors `reader::readCsvFile`.
pub fn read_node_volume_csv(path: &Path) -> Result<NodeVolumeCsv, IoError> {
  let text = std::fs::read_to_string(path).map_err(|e| IoError::Unreadable { path: path.display().to_string(), source: e })?;
  let mut nodes = Vec::new();
  let mut volumes = Vec::new();
  for (lineno, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 4 {
      return Err(parse_err(path, lineno, "expected 'x,y,z,volume'"));
    }
    let xyz = parse_f64s(path, lineno, &fields[0..3])?;
    let volume = fields[3].parse::<f64>().map_err(|_| parse_err(path, lineno, "bad volume field"))?;
    nodes.push(DVec3::new(xyz[0], xyz[1], xyz[2]));
    volumes.push(volume);
  }
  Ok(NodeVolumeCsv { nodes, volumes })
}

/// One entry of a particle cluster: center, radius, zone id, and an
/// optional orientation angle (radians) for clusters generated with random
/// orientation, per `readParticleWithOrientCsvFile`.
pub struct ParticleClusterEntry {
  pub center: DVec3,
  pub radius: f64,
  pub zone: u32,
  pub orientation: f64,
}

/// Reads a particle-cluster CSV: `x,y,z,radius,zone[,orientation]`. When the
/// orientation column is absent, a seeded RNG fills it in — this crate does
/// not depend on wall-clock time or OS entropy for setup-time randomness, so
/// the seed is always explicit (spec: deterministic runs given an input
/// deck).
pub fn read_particle_cluster_csv(path: &Path, seed: u64) -> Result<Vec<ParticleClusterEntry>, IoError> {
  let text = std::fs::read_to_string(path).map_err(|e| IoError::Unreadable { path: path.display().to_string(), source: e })?;
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut out = Vec::new();
  for (lineno, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
      return Err(IoError::Parse { path: path.display().to_string(), reason: format!("line {}: expected 'x,y,z,radius,zone[,orientation]'", lineno + 1) });
    }
    let xyz = parse_f64s(path, lineno, &fields[0..3])?;
    let radius = fields[3].parse::<f64>().map_err(|_| parse_err(path, lineno, "bad radius field"))?;
    let zone = fields[4].parse::<u32>().map_err(|_| parse_err(path, lineno, "bad zone field"))?;
    let orientation = match fields.get(5) {
      Some(s) => s.parse::<f64>().map_err(|_| parse_err(path, lineno, "bad orientation field"))?,
      None => rng.random_range(0.0..std::f64::consts::TAU),
    };
    out.push(ParticleClusterEntry { center: DVec3::new(xyz[0], xyz[1], xyz[2]), radius, zone, orientation });
  }
  Ok(out)
}

fn parse_f64s(path: &Path, lineno: usize, fields: &[&str]) -> Result<[f64; 3], IoError> {
  let mut out = [0.0; 3];
  for (i, f) in fields.iter().enumerate() {
    out[i] = f.parse::<f64>().map_err(|_| parse_err(path, lineno, "bad coordinate field"))?;
  }
  Ok(out)
}

fn parse_err(path: &Path, lineno: usize, reason: &str) -> IoError {
  IoError::Parse { path: path.display().to_string(), reason: format!("line {}: {reason}", lineno + 1) }
}

/// Writes current particle zone ids, centers, and bounding radii:
/// `zone_id,x,y,z,bounding_radius`, one header line then one row per
/// particle (spec §6's "Optional particle-location CSV"). This is the
/// `Particle_Locations` output tag's dedicated file, kept separate from the
/// per-node grid output.
pub fn write_particle_locations_csv(path: &Path, particles: &[(u32, DVec3, f64)]) -> Result<(), IoError> {
  let mut out = String::from("zone_id,x,y,z,bounding_radius\n");
  for (zone_id, center, bounding_radius) in particles {
    out.push_str(&format!("{zone_id},{},{},{},{bounding_radius}\n", center.x, center.y, center.z));
  }
  std::fs::write(path, out).map_err(|e| IoError::Unwritable { path: path.display().to_string(), source: e })
}

/// Appends one row to a two-particle post-processing CSV with the column
/// set used by the `twop`/`twoparticle_demo` apps: `t, delta, cont_area_r,
/// s_loc, s_val, max_dist, cont_area_r_ideal, s_loc_ideal, s_val_ideal`.
/// Writes the header on first use (`path` does not yet exist).
pub struct PostProcessingRow {
  pub time: f64,
  pub delta: f64,
  pub contact_area_radius: f64,
  pub strain_location: f64,
  pub strain_value: f64,
  pub max_distance: f64,
  pub contact_area_radius_ideal: f64,
  pub strain_location_ideal: f64,
  pub strain_value_ideal: f64,
}

pub fn append_postprocessing_row(path: &Path, row: &PostProcessingRow) -> Result<(), IoError> {
  use std::io::Write;

  let is_new = !path.exists();
  let mut file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .map_err(|e| IoError::Unwritable { path: path.display().to_string(), source: e })?;

  if is_new {
    writeln!(file, "t, delta, cont_area_r, s_loc, s_val, max_dist, cont_area_r_ideal, s_loc_ideal, s_val_ideal")
      .map_err(|e| IoError::Unwritable { path: path.display().to_string(), source: e })?;
  }
  writeln!(
    file,
    "{}, {}, {}, {}, {}, {}, {}, {}, {}",
    row.time,
    row.delta,
    row.contact_area_radius,
    row.strain_location,
    row.strain_value,
    row.max_distance,
    row.contact_area_radius_ideal,
    row.strain_location_ideal,
    row.strain_value_ideal
  )
  .map_err(|e| IoError::Unwritable { path: path.display().to_string(), source: e })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_node_volume_rows() {
    let path = std::env::temp_dir().join(format!("peridem_nv_test_{}.csv", std::process::id()));
    std::fs::write(&path, "0,0,0,0.1\n1,0,0,0.1\n").unwrap();
    let parsed = read_node_volume_csv(&path).unwrap();
    assert_eq!(parsed.nodes.len(), 2);
    assert!((parsed.volumes[1] - 0.1).abs() < 1e-12);
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn missing_orientation_column_is_filled_deterministically_from_seed() {
    let path = std::env::temp_dir().join(format!("peridem_cluster_test_{}.csv", std::process::id()));
    std::fs::write(&path, "0,0,0,1.0,0\n").unwrap();
    let a = read_particle_cluster_csv(&path, 42).unwrap();
    let b = read_particle_cluster_csv(&path, 42).unwrap();
    assert_eq!(a[0].orientation, b[0].orientation);
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn explicit_orientation_column_is_respected() {
    let path = std::env::temp_dir().join(format!("peridem_cluster_test2_{}.csv", std::process::id()));
    std::fs::write(&path, "0,0,0,1.0,0,1.2345\n").unwrap();
    let parsed = read_particle_cluster_csv(&path, 7).unwrap();
    assert!((parsed[0].orientation - 1.2345).abs() < 1e-12);
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn postprocessing_csv_writes_header_once() {
    let path = std::env::temp_dir().join(format!("peridem_pp_test_{}.csv", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let row = PostProcessingRow { time: 0.0, delta: 0.1, contact_area_radius: 0.2, strain_location: 0.0, strain_value: 0.0, max_distance: 1.0, contact_area_radius_ideal: 0.2, strain_location_ideal: 0.0, strain_value_ideal: 0.0 };
    append_postprocessing_row(&path, &row).unwrap();
    append_postprocessing_row(&path, &row).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().filter(|l| l.starts_with("t, delta")).count(), 1);
    assert_eq!(contents.lines().count(), 3);
    let _ = std::fs::remove_file(&path);
  }
}
