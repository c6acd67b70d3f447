//! Output tag set (spec §6 Output section): which node-indexed arrays get
//! written to a per-step grid file.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum OutputTag {
  Displacement,
  Velocity,
  Force,
  #[serde(rename = "Force_Density")]
  ForceDensity,
  Fixity,
  #[serde(rename = "Particle_ID")]
  ParticleId,
  #[serde(rename = "Zone_ID")]
  ZoneId,
  #[serde(rename = "Nodal_Volume")]
  NodalVolume,
  #[serde(rename = "Damage_Z")]
  DamageZ,
  Theta,
  #[serde(rename = "Strain_Stress")]
  StrainStress,
  #[serde(rename = "Particle_Locations")]
  ParticleLocations,
}

impl OutputTag {
  pub fn name(&self) -> &'static str {
    match self {
      OutputTag::Displacement => "Displacement",
      OutputTag::Velocity => "Velocity",
      OutputTag::Force => "Force",
      OutputTag::ForceDensity => "Force_Density",
      OutputTag::Fixity => "Fixity",
      OutputTag::ParticleId => "Particle_ID",
      OutputTag::ZoneId => "Zone_ID",
      OutputTag::NodalVolume => "Nodal_Volume",
      OutputTag::DamageZ => "Damage_Z",
      OutputTag::Theta => "Theta",
      OutputTag::StrainStress => "Strain_Stress",
      OutputTag::ParticleLocations => "Particle_Locations",
    }
  }
}

impl std::str::FromStr for OutputTag {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Displacement" => Ok(OutputTag::Displacement),
      "Velocity" => Ok(OutputTag::Velocity),
      "Force" => Ok(OutputTag::Force),
      "Force_Density" => Ok(OutputTag::ForceDensity),
      "Fixity" => Ok(OutputTag::Fixity),
      "Particle_ID" => Ok(OutputTag::ParticleId),
      "Zone_ID" => Ok(OutputTag::ZoneId),
      "Nodal_Volume" => Ok(OutputTag::NodalVolume),
      "Damage_Z" => Ok(OutputTag::DamageZ),
      "Theta" => Ok(OutputTag::Theta),
      "Strain_Stress" => Ok(OutputTag::StrainStress),
      "Particle_Locations" => Ok(OutputTag::ParticleLocations),
      other => Err(format!("unknown output tag '{other}'")),
    }
  }
}
