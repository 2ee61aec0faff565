//! threecol-supervisor - creates the shared buffer and collects candidates
//!
//! Start this first, then any number of `threecol-generator` processes.
//! Stops on SIGINT/SIGTERM or once a generator finds a proper 3-coloring.

use clap::Parser;
use std::io;
use std::process::ExitCode;
use threecol::{Coordinator, CoordinatorConfig, Error, ResourceNames, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "threecol-supervisor")]
#[command(about = "Collect 3-coloring candidates from generators and report the best")]
#[command(version)]
struct Args {
    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("[supervisor] error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let names = ResourceNames::from_env()?;
    let config = CoordinatorConfig::default().with_names(names);

    let coordinator = Coordinator::create(config)?;

    let stop = coordinator.stop_handle()?;
    ctrlc::set_handler(move || {
        if let Err(e) = stop.request_stop() {
            error!("waking supervisor: {}", e);
        }
    })
    .map_err(|e| Error::Signal(e.to_string()))?;
    info!("waiting for generators");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = coordinator.run(&mut out)?;
    info!(
        candidates = outcome.statistics.candidates_read,
        improvements = outcome.statistics.improvements,
        "supervisor finished"
    );
    Ok(())
}

fn setup_logging(verbose: bool) {
    let default = if verbose {
        "threecol=debug,warn"
    } else {
        "threecol=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
