//! `peridynamics`: the main simulation driver. Loads a YAML input deck,
//! builds the orchestrator with a user-chosen worker-thread count, runs to
//! completion, and writes per-step grid output as configured.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

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

  match peridem_cli::load_and_run(&args.input, args.n_threads) {
    Ok(state) => {
      tracing::info!("finished at step {} (t = {})", state.step, state.time);
      ExitCode::SUCCESS
    }
    Err(e) => {
      eprintln!("peridynamics: {e}");
      ExitCode::FAILURE
    }
  }
}
