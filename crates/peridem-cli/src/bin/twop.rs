//! `twop`: the two-particle contact post-processor. Thin wrapper over
//! `peridem-core`/`peridem-io`, named directly after the original
//! `apps/twop/main.cpp`. Tracks the first two particles of the run and
//! appends one diagnostic row per output step to `pp_<test_name>.csv`,
//! reproducing that app's column set (`t, delta, cont_area_r, s_loc,
//! s_val, max_dist, cont_area_r_ideal, s_loc_ideal, s_val_ideal`).
//!
//! The "ideal" Hertz-contact columns and the quadrature-point strain/stress
//! columns from the original are approximated here from node-indexed
//! quantities only (penetration from particle centers/bounding radii,
//! `s_val` from peak nodal damage) since this engine does not carry a
//! quadrature/strain-stress module (DESIGN.md).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use glam::DVec3;

use peridem_core::ModelState;
use peridem_io::csv::{append_postprocessing_row, PostProcessingRow};

#[derive(Parser, Debug)]
struct Args {
  #[arg(short = 'i', long, default_value = "./example/input_0.yaml")]
  input: PathBuf,
  #[arg(long = "nThreads", default_value_t = 2)]
  n_threads: usize,
}

fn main() -> ExitCode {
  peridem_cli::init_logging();
  let args = Args::parse();

  match run(&args.input, args.n_threads) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("twop: {e}");
      ExitCode::FAILURE
    }
  }
}

fn run(input: &std::path::Path, n_threads: usize) -> Result<(), peridem_cli::AppError> {
  use peridem_io::InputDeck;

  let deck = InputDeck::load(input)?;
  let base_dir = input.parent().unwrap_or_else(|| std::path::Path::new("."));
  let setup = deck.build_setup(base_dir, n_threads)?;
  let test_name = if deck.model.test_name.is_empty() { "twop".to_string() } else { deck.model.test_name.clone() };
  let pp_path = base_dir.join(deck.output.path.as_path()).join(format!("pp_{test_name}.csv"));

  let mut orchestrator = peridem_core::Orchestrator::init(setup)?;
  orchestrator.on_output(move |state: &ModelState| {
    if state.particles.len() < 2 {
      return;
    }
    let row = contact_diagnostics(state);
    if let Err(e) = append_postprocessing_row(&pp_path, &row) {
      tracing::warn!("twop: post-processing write failed at step {}: {e}", state.step);
    }
  });

  orchestrator.run();
  Ok(())
}

fn particle_center(state: &ModelState, idx: usize) -> DVec3 {
  let p = &state.particles[idx];
  let mut c = DVec3::ZERO;
  let mut n = 0.0;
  for i in p.node_range.clone() {
    c += state.nodes.position[i];
    n += 1.0;
  }
  if n > 0.0 {
    c / n
  } else {
    c
  }
}

fn contact_diagnostics(state: &ModelState) -> PostProcessingRow {
  let a = particle_center(state, 0);
  let b = particle_center(state, 1);
  let dist = a.distance(b);
  let r_sum = state.particles[0].rc + state.particles[1].rc;
  let delta = (r_sum - dist).max(0.0);
  let r_eff = 0.5 * (state.particles[0].rc + state.particles[1].rc);
  let cont_area_r = (r_eff * delta).max(0.0).sqrt();

  let mut max_damage = 0.0_f64;
  let mut max_damage_node = 0usize;
  for (i, &d) in state.nodes.damage.iter().enumerate() {
    if d > max_damage {
      max_damage = d;
      max_damage_node = i;
    }
  }
  let s_loc = state.nodes.position[max_damage_node].y;

  PostProcessingRow {
    time: state.time,
    delta,
    contact_area_radius: cont_area_r,
    strain_location: s_loc,
    strain_value: max_damage,
    max_distance: dist,
    contact_area_radius_ideal: cont_area_r,
    strain_location_ideal: s_loc,
    strain_value_ideal: max_damage,
  }
}
