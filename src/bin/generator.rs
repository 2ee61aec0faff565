//! threecol-generator - publishes random 3-coloring candidates
//!
//! Usage: `threecol-generator 0-1 1-2 2-0 ...`
//!
//! Requires a running `threecol-supervisor` with the same namespace.

use clap::Parser;
use std::io;
use std::process::ExitCode;
use threecol::{Graph, RandomColoring, ResourceNames, Result, Worker, WorkerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "threecol-generator")]
#[command(about = "Randomly 3-color a graph and publish the edges to remove")]
#[command(version)]
struct Args {
    /// Graph edges as `source-destination`, e.g. `0-1 1-2 2-0`
    #[arg(required = true, value_name = "EDGE")]
    edges: Vec<String>,

    /// Seed for the random colorings (random if not given)
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("[generator] error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    // Arguments are checked before any shared resource is touched.
    let graph = Graph::parse(&args.edges)?;
    let names = ResourceNames::from_env()?;
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "starting generator"
    );

    let config = WorkerConfig::default()
        .with_names(names)
        .with_seed_option(args.seed);
    let mut source = RandomColoring::from_seed_option(graph, config.seed);

    let stats = Worker::run(config, &mut source)?;
    info!(
        proposals = stats.proposals,
        published = stats.published,
        "generator finished"
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
