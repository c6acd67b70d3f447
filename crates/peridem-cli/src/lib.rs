//! Shared plumbing for the `peridynamics`/`twop`/`twoparticle_demo`
//! binaries: a single `AppError` wrapping each crate's error taxonomy, and
//! a `load_and_run` helper that turns a deck path into a finished
//! `ModelState`.
//!
//! Grounded on `texture_baker/src/main.rs`'s `clap` + `anyhow` shape, with
//! the `#[from]`-wrapping enum taking the place of blanket `anyhow::Error`
//! since spec §7 asks for a typed boundary here.

use std::path::Path;

use peridem_core::orchestrator::OrchestratorError;
use peridem_io::{ConfigError, InputDeck, IoError, OutputTag, OutputWriter};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),
  #[error("simulation setup error: {0}")]
  Setup(#[from] OrchestratorError),
  #[error("I/O error: {0}")]
  Io(#[from] IoError),
}

/// Loads the deck at `input`, builds an `Orchestrator` with `n_threads`
/// worker threads, attaches a `peridem-io` writer producing one `.vtu` per
/// output step under the deck's configured output path, and runs to
/// completion. Returns the final `ModelState` for any caller-specific
/// post-processing (e.g. `twop`'s contact diagnostics).
pub fn load_and_run(input: &Path, n_threads: usize) -> Result<peridem_core::ModelState, AppError> {
  let deck = InputDeck::load(input)?;
  let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
  let setup = deck.build_setup(base_dir, n_threads)?;

  let output_dir = base_dir.join(&deck.output.path);
  let test_name = if deck.model.test_name.is_empty() { "peridem".to_string() } else { deck.model.test_name.clone() };
  let tags: Vec<OutputTag> = deck.output.tags.iter().filter_map(|t| t.parse().ok()).collect();

  let mut orchestrator = peridem_core::Orchestrator::init(setup)?;
  if !tags.is_empty() {
    let writer = peridem_io::Vtu;
    orchestrator.on_output(move |state: &peridem_core::ModelState| {
      let path = peridem_io::step_file_path(&output_dir, &test_name, state.step, "vtu");
      if let Err(e) = writer.write_step(&path, state.step, state, &tags) {
        tracing::warn!("output write failed at step {}: {e}", state.step);
      }
    });
  }

  orchestrator.run();
  Ok(orchestrator.close())
}

pub fn init_logging() {
  let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}
