//! `twoparticle_demo`: named after the original `apps/twoparticle_demo`,
//! whose own stated purpose is demonstrating that the model driver is easy
//! to specialize for a fixed scenario. Here that specialization is simply
//! running the same `load_and_run` driver under its own binary name and
//! log prefix, since this workspace's orchestrator is already generic
//! over any deck rather than subclassed per scenario.

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
      tracing::info!("twoparticle_demo: finished at step {} (t = {})", state.step, state.time);
      ExitCode::SUCCESS
    }
    Err(e) => {
      eprintln!("twoparticle_demo: {e}");
      ExitCode::FAILURE
    }
  }
}
