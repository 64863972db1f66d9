//! CLI frontend for Microbe World simulations.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mw",
    about = "Microbe World: a headless two-lane microbe simulation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Show the full event log and more diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session with a player drifting through the world
    Run {
        /// Number of fixed steps to run
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// RNG seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Seconds per step
        #[arg(short, long, default_value = "0.1", allow_negative_numbers = true)]
        delta: f32,

        /// Run every system on the calling thread
        #[arg(long)]
        sequential: bool,

        /// Worker threads to report (0 forces sequential execution)
        #[arg(short, long)]
        workers: Option<usize>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Restore the spawn manager from a saved state before running
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Write the spawn manager's state to this file afterwards
        #[arg(long)]
        save_state: Option<PathBuf>,
    },

    /// Print the compiled lane plan
    Plan {
        /// Use the hand-written layout instead of automatic placement
        #[arg(short, long)]
        layout: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            ticks,
            seed,
            delta,
            sequential,
            workers,
            config,
            load_state,
            save_state,
        } => commands::run::run(&commands::run::RunOptions {
            ticks,
            seed,
            delta,
            sequential,
            workers,
            config,
            load_state,
            save_state,
            verbose: cli.verbose,
        }),
        Commands::Plan { layout } => commands::plan::run(layout),
        Commands::Config => commands::config::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
