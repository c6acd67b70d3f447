//! YAML input-deck loading and validation. Grounded on
//! `texture_baker/src/config.rs::Config::load` (read → `serde_yaml`-parse →
//! post-deserialize structural `validate()` pass, distinct from serde's own
//! syntactic checks) and spec §6's nested section list.

use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::Deserialize;

use peridem_core::orchestrator::{ContactPairSpec, ParticleInstanceSpec, SimulationSetup, StopCriterion, ZoneBlueprint};
use peridem_core::{
  BcKind, Dof, ElasticConstants, ElementType, InfluenceFn, Integrator, Loading, Material, ParticleKind, ReferenceMesh, SpatialFn, TemporalFn, Transform,
};
use peridem_geometry::{Geometry, GeometryOps};

use crate::csv::read_node_volume_csv;
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
pub struct ModelSectionDeck {
  pub dimension: u8,
  #[serde(default)]
  pub final_time: Option<f64>,
  #[serde(default)]
  pub num_steps: Option<u64>,
  pub dt: f64,
  #[serde(default = "default_integrator")]
  pub time_integration: String,
  #[serde(default)]
  pub quad_order: u32,
  pub horizon: f64,
  #[serde(default)]
  pub seed: u64,
  #[serde(default)]
  pub gravity: [f64; 3],
  #[serde(default)]
  pub test_name: String,
}

fn default_integrator() -> String {
  "central_difference".to_string()
}

#[derive(Debug, Deserialize)]
pub struct GeometryDeck {
  pub kind: String,
  pub params: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MeshSourceDeck {
  /// Uniform point cloud generated to fill the zone's geometry, spaced
  /// `mesh_size` apart. Used for DEM/peridynamic particles, whose internal
  /// mesh is itself a point cloud rather than a connected element mesh.
  Generated { mesh_size: f64 },
  /// Node/volume CSV per `reader::readCsvFile`.
  FromFile { path: PathBuf },
}

#[derive(Debug, Deserialize)]
pub struct MaterialDeck {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub young_modulus: Option<f64>,
  #[serde(default)]
  pub bulk_modulus: Option<f64>,
  #[serde(default)]
  pub poisson_ratio: Option<f64>,
  #[serde(default)]
  pub fracture_energy: Option<f64>,
  #[serde(default)]
  pub fracture_toughness: Option<f64>,
  pub density: f64,
  #[serde(default)]
  pub influence: String,
  #[serde(default)]
  pub influence_beta: f64,
  #[serde(default = "default_true")]
  pub irreversible: bool,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Deserialize)]
pub struct LoadingDeck {
  #[serde(rename = "type")]
  pub kind: String,
  pub particle_ids: Vec<u32>,
  #[serde(default)]
  pub region: Option<GeometryDeck>,
  pub dofs: Vec<String>,
  #[serde(default = "default_spatial")]
  pub spatial: String,
  #[serde(default)]
  pub spatial_params: Vec<f64>,
  #[serde(default = "default_temporal")]
  pub temporal: String,
  #[serde(default)]
  pub temporal_params: Vec<f64>,
  #[serde(default)]
  pub zero: bool,
}

fn default_spatial() -> String {
  "constant".to_string()
}
fn default_temporal() -> String {
  "constant".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ZoneDeck {
  pub id: u32,
  #[serde(default)]
  pub is_wall: bool,
  pub geometry: GeometryDeck,
  pub mesh: MeshSourceDeck,
  pub material: MaterialDeck,
  #[serde(default)]
  pub particles: Vec<ParticlePlacementDeck>,
  #[serde(default)]
  pub loadings: Vec<LoadingDeck>,
  #[serde(default)]
  pub all_dofs_constrained: bool,
}

/// One stamped instance of a zone: a rigid transform applied to the zone's
/// reference mesh.
#[derive(Debug, Deserialize)]
pub struct ParticlePlacementDeck {
  #[serde(default)]
  pub translation: [f64; 3],
  #[serde(default)]
  pub axis: [f64; 3],
  #[serde(default)]
  pub angle: f64,
  #[serde(default = "default_scale")]
  pub scale: f64,
}

fn default_scale() -> f64 {
  1.0
}

#[derive(Debug, Deserialize)]
pub struct ContactPairDeck {
  pub zone_i: u32,
  pub zone_j: u32,
  pub r_c: f64,
  pub kn: f64,
  /// Pairwise bulk modulus for the Hertzian normal force, from the
  /// harmonic-mean mixing rule over the two zones' materials. Defaults to
  /// `kn` when the deck leaves it unset (the common case where the penalty
  /// stiffness and the bulk-modulus term are deliberately kept equal).
  #[serde(default)]
  pub bulk_modulus: Option<f64>,
  pub restitution: f64,
  pub friction: f64,
}

#[derive(Debug, Deserialize)]
pub struct NeighborDeck {
  #[serde(default = "default_s_factor")]
  pub s_factor: f64,
  #[serde(default = "default_update_interval")]
  pub update_interval: u64,
}

fn default_s_factor() -> f64 {
  1.5
}
fn default_update_interval() -> u64 {
  50
}

#[derive(Debug, Deserialize)]
pub struct OutputDeck {
  pub path: PathBuf,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub dt_out: u64,
}

#[derive(Debug, Deserialize)]
pub struct RestartDeck {
  pub file: PathBuf,
  #[serde(default)]
  pub starting_step: u64,
}

#[derive(Debug, Deserialize)]
pub struct IcDeck {
  pub particle_ids: Vec<u32>,
  pub velocity: [f64; 3],
}

#[derive(Debug, Deserialize)]
pub struct InputDeck {
  pub model: ModelSectionDeck,
  pub zones: Vec<ZoneDeck>,
  #[serde(default)]
  pub contact: Vec<ContactPairDeck>,
  #[serde(default)]
  pub neighbor: NeighborDeck,
  pub output: OutputDeck,
  #[serde(default)]
  pub restart: Option<RestartDeck>,
  #[serde(default)]
  pub initial_conditions: Vec<IcDeck>,
}

impl Default for NeighborDeck {
  fn default() -> Self {
    Self { s_factor: default_s_factor(), update_interval: default_update_interval() }
  }
}

impl InputDeck {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable { path: path.display().to_string(), source: e })?;
    let deck: InputDeck = serde_yaml::from_str(&text).map_err(|e| ConfigError::Yaml { path: path.display().to_string(), source: e })?;
    deck.validate()?;
    Ok(deck)
  }

  /// Structural checks that serde's syntactic deserialization cannot
  /// express: zone-role contradictions, under-specified material decks, and
  /// an unrecognized time-integration tag (spec §7's
  /// `ConfigurationError`/`MaterialDataMissing` fatal-at-setup cases).
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !matches!(self.model.time_integration.as_str(), "central_difference" | "velocity_verlet") {
      return Err(ConfigError::InvalidIntegrator(self.model.time_integration.clone()));
    }
    for zone in &self.zones {
      if zone.is_wall && !zone.loadings.is_empty() && zone.loadings.iter().any(|l| l.kind == "force") {
        return Err(ConfigError::ContradictoryZoneRole(zone.id));
      }
      if zone.material.young_modulus.is_none() && zone.material.bulk_modulus.is_none() {
        return Err(ConfigError::MissingMaterialParams(zone.id));
      }
    }
    let known_zones: std::collections::HashSet<u32> = self.zones.iter().map(|z| z.id).collect();
    for pair in &self.contact {
      if !known_zones.contains(&pair.zone_i) {
        return Err(ConfigError::UnknownZone(pair.zone_i, pair.zone_j, pair.zone_i));
      }
      if !known_zones.contains(&pair.zone_j) {
        return Err(ConfigError::UnknownZone(pair.zone_i, pair.zone_j, pair.zone_j));
      }
    }
    Ok(())
  }

  /// Builds a runnable `SimulationSetup` from the parsed deck: resolves
  /// geometry/mesh/material per zone, stamps particle placements, and
  /// carries contact/neighbor/IC settings through. `base_dir` resolves
  /// relative mesh-file paths (mirrors the original's deck-relative file
  /// resolution).
  pub fn build_setup(&self, base_dir: &Path, n_threads: usize) -> Result<SimulationSetup, ConfigError> {
    let mut zones = Vec::with_capacity(self.zones.len());
    let mut particles = Vec::new();

    for zone in &self.zones {
      let geometry = build_geometry(&zone.geometry)?;
      let reference = build_mesh(&zone.mesh, &geometry, base_dir)?;
      let material = build_material(&zone.material, self.model.horizon)?;

      let placements = if zone.particles.is_empty() {
        vec![Transform::identity()]
      } else {
        zone
          .particles
          .iter()
          .map(|p| Transform {
            translation: DVec3::from(p.translation),
            axis: if p.axis == [0.0, 0.0, 0.0] { DVec3::Z } else { DVec3::from(p.axis) },
            angle: p.angle,
            scale: p.scale,
          })
          .collect()
      };

      for transform in placements {
        particles.push(ParticleInstanceSpec {
          zone_id: zone.id,
          kind: if zone.is_wall { ParticleKind::Wall } else { ParticleKind::Particle },
          transform,
          all_dofs_constrained: zone.all_dofs_constrained,
        });
      }

      zones.push(ZoneBlueprint { geometry, reference, material });
    }

    let mut loadings = Vec::new();
    for zone in &self.zones {
      for l in &zone.loadings {
        loadings.push(build_loading(l, zone.id)?);
      }
    }

    let mut contact_pairs = Vec::with_capacity(self.contact.len());
    for pair in &self.contact {
      contact_pairs.push(ContactPairSpec {
        zone_i: pair.zone_i,
        zone_j: pair.zone_j,
        r_c: pair.r_c,
        kn: pair.kn,
        mu: pair.friction,
        kappa: pair.bulk_modulus.unwrap_or(pair.kn),
        restitution: pair.restitution,
      });
    }

    let dt = self.model.dt;
    let num_steps = self.model.num_steps.unwrap_or_else(|| {
      let final_time = self.model.final_time.unwrap_or(0.0);
      (final_time / dt).round() as u64
    });

    Ok(SimulationSetup {
      zones,
      particles,
      contact_pairs,
      gravity: DVec3::from(self.model.gravity),
      loadings,
      integrator: if self.model.time_integration == "velocity_verlet" { Integrator::VelocityVerlet } else { Integrator::CentralDifference },
      dt,
      num_steps,
      output_interval: self.output.dt_out,
      neighbor_interval: self.neighbor.update_interval,
      neighbor_s_factor: self.neighbor.s_factor,
      stop: StopCriterion::None,
      n_threads,
    })
  }
}

fn build_geometry(deck: &GeometryDeck) -> Result<Geometry, ConfigError> {
  peridem_geometry::factory::build(&deck.kind, &deck.params).map_err(|e| ConfigError::ClusterFile { path: deck.kind.clone(), reason: e.to_string() })
}

fn build_mesh(deck: &MeshSourceDeck, geometry: &Geometry, base_dir: &Path) -> Result<ReferenceMesh, ConfigError> {
  match deck {
    MeshSourceDeck::FromFile { path } => {
      let full = if path.is_absolute() { path.clone() } else { base_dir.join(path) };
      let parsed = read_node_volume_csv(&full).map_err(|e| ConfigError::ClusterFile { path: full.display().to_string(), reason: e.to_string() })?;
      Ok(ReferenceMesh::new(parsed.nodes, parsed.volumes, Vec::new(), ElementType::Line, 3))
    }
    MeshSourceDeck::Generated { mesh_size } => Ok(generate_point_cloud(geometry, *mesh_size)),
  }
}

/// Fills the geometry's bounding box with a uniform grid at spacing
/// `mesh_size`, keeping only the points that fall inside it. Each point
/// carries volume `mesh_size^dim` (2D boxes collapse to a flat z extent, so
/// a near-zero z span is detected and treated as 2D).
fn generate_point_cloud(geometry: &Geometry, mesh_size: f64) -> ReferenceMesh {
  let bbox = geometry.bounding_box(0.0);
  let is_2d = (bbox.max.z - bbox.min.z).abs() < 1e-12;

  let nx = ((bbox.max.x - bbox.min.x) / mesh_size).round().max(1.0) as i64;
  let ny = ((bbox.max.y - bbox.min.y) / mesh_size).round().max(1.0) as i64;
  let nz = if is_2d { 1 } else { ((bbox.max.z - bbox.min.z) / mesh_size).round().max(1.0) as i64 };

  let mut nodes = Vec::new();
  let mut volumes = Vec::new();
  let volume = if is_2d { mesh_size * mesh_size } else { mesh_size * mesh_size * mesh_size };

  for i in 0..=nx {
    for j in 0..=ny {
      for k in 0..=nz {
        let p = DVec3::new(
          bbox.min.x + i as f64 * mesh_size,
          bbox.min.y + j as f64 * mesh_size,
          if is_2d { bbox.min.z } else { bbox.min.z + k as f64 * mesh_size },
        );
        if geometry.is_inside(p) {
          nodes.push(p);
          volumes.push(volume);
        }
      }
    }
  }

  if nodes.is_empty() {
    nodes.push(bbox.center());
    volumes.push(volume);
  }

  ReferenceMesh::new(nodes, volumes, Vec::new(), ElementType::Line, if is_2d { 2 } else { 3 })
}

/// Derives the bond-based micromodulus `c` from Lame's first parameter and
/// the horizon (`c = 24*lambda / (pi*horizon^3)`, per
/// `original_source/src/material/mparticle/material.h`'s RNP/PMB
/// constructors), and the critical stretch from the fracture energy
/// (`s_c = sqrt(5*Gc*pi / (9*E*horizon))`, the inverse of that file's
/// `Gc = s_c^2 * 9*E*horizon / (5*pi)`).
fn build_material(deck: &MaterialDeck, horizon: f64) -> Result<Material, ConfigError> {
  use peridem_core::material::{ElasticParams, PmbParams, RnpParams, StateParams};

  let nu = deck.poisson_ratio.unwrap_or(0.25);
  let elastic = ElasticConstants::resolve(deck.young_modulus, deck.bulk_modulus, nu, deck.fracture_energy, deck.fracture_toughness)
    .map_err(|_| ConfigError::MissingMaterialParams(0))?;

  let influence = match deck.influence.as_str() {
    "linear" => InfluenceFn::Linear,
    "gaussian" => InfluenceFn::Gaussian { beta: if deck.influence_beta > 0.0 { deck.influence_beta } else { 1.0 } },
    _ => InfluenceFn::Constant,
  };

  let c = 24.0 * elastic.lambda / (std::f64::consts::PI * horizon.powi(3));
  let gc = elastic.gc;
  let s_c = if gc > 0.0 { (5.0 * gc * std::f64::consts::PI / (9.0 * elastic.e * horizon)).sqrt() } else { 0.0 };

  Ok(match deck.kind.as_str() {
    "pmb" => Material::Pmb(PmbParams { horizon, density: deck.density, c, s_c, influence, irreversible: deck.irreversible, elastic }),
    "rnp" => Material::Rnp(RnpParams { horizon, density: deck.density, beta: 1.0, c, factor_sc: 1.0, s_c, influence, irreversible: deck.irreversible, elastic }),
    "elastic" => Material::Elastic(ElasticParams { horizon, density: deck.density, c, influence, elastic }),
    "state" => Material::State(StateParams { horizon, density: deck.density, s_0: s_c, influence, irreversible: deck.irreversible, elastic }),
    other => return Err(ConfigError::InvalidIntegrator(format!("unknown material type '{other}'"))),
  })
}

fn build_loading(deck: &LoadingDeck, _zone_id: u32) -> Result<Loading, ConfigError> {
  let dofs = deck
    .dofs
    .iter()
    .map(|d| match d.as_str() {
      "x" | "X" => Ok(Dof::X),
      "y" | "Y" => Ok(Dof::Y),
      "z" | "Z" => Ok(Dof::Z),
      other => Err(ConfigError::ClusterFile { path: "loading.dofs".to_string(), reason: format!("unknown dof '{other}'") }),
    })
    .collect::<Result<Vec<_>, _>>()?;

  let spatial = match deck.spatial.as_str() {
    "hat_x" => SpatialFn::HatX,
    "hat_y" => SpatialFn::HatY,
    "sin_x" => SpatialFn::SinX,
    "sin_y" => SpatialFn::SinY,
    "linear_x" => SpatialFn::LinearX,
    "linear_y" => SpatialFn::LinearY,
    _ => SpatialFn::Constant,
  };
  let temporal = match deck.temporal.as_str() {
    "linear" => TemporalFn::Linear,
    "quadratic" => TemporalFn::Quadratic,
    "sin" => TemporalFn::Sin,
    "rotation" => TemporalFn::Rotation,
    _ => TemporalFn::Constant,
  };

  let region = match &deck.region {
    Some(g) => Some(build_geometry(g)?),
    None => None,
  };

  Ok(Loading {
    kind: if deck.kind == "force" { BcKind::Force } else { BcKind::Displacement },
    particle_ids: deck.particle_ids.clone(),
    region,
    dofs,
    spatial,
    spatial_params: deck.spatial_params.clone(),
    temporal,
    temporal_params: deck.temporal_params.clone(),
    zero: deck.zero,
    active: true,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn minimal_yaml() -> &'static str {
    r#"
model:
  dimension: 2
  num_steps: 10
  dt: 1.0e-6
  horizon: 0.002
  gravity: [0.0, -9.81, 0.0]
zones:
  - id: 0
    geometry:
      kind: circle
      params: [0.0, 0.0, 0.0, 0.01]
    mesh:
      source: generated
      mesh_size: 0.002
    material:
      type: pmb
      young_modulus: 70.0e9
      density: 1200.0
contact: []
neighbor:
  s_factor: 1.5
  update_interval: 50
output:
  path: ./out
  tags: [Displacement]
  dt_out: 10
"#
  }

  #[test]
  fn parses_a_minimal_deck() {
    let deck: InputDeck = serde_yaml::from_str(minimal_yaml()).unwrap();
    assert_eq!(deck.zones.len(), 1);
    assert!(deck.validate().is_ok());
  }

  #[test]
  fn missing_elastic_constants_is_rejected() {
    let mut deck: InputDeck = serde_yaml::from_str(minimal_yaml()).unwrap();
    deck.zones[0].material.young_modulus = None;
    deck.zones[0].material.bulk_modulus = None;
    assert!(matches!(deck.validate(), Err(ConfigError::MissingMaterialParams(0))));
  }

  #[test]
  fn unknown_integrator_tag_is_rejected() {
    let mut deck: InputDeck = serde_yaml::from_str(minimal_yaml()).unwrap();
    deck.model.time_integration = "leapfrog".to_string();
    assert!(matches!(deck.validate(), Err(ConfigError::InvalidIntegrator(_))));
  }

  #[test]
  fn build_setup_produces_one_zone_and_one_particle() {
    let deck: InputDeck = serde_yaml::from_str(minimal_yaml()).unwrap();
    let setup = deck.build_setup(Path::new("."), 1).unwrap();
    assert_eq!(setup.zones.len(), 1);
    assert_eq!(setup.particles.len(), 1);
    assert_eq!(setup.num_steps, 10);
  }
}
