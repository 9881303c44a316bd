use anyhow::Result;
use clap::Parser;
use sira_cli::{Cli, Commands};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

mod commands;

use crate::commands::util::configure_threads;
use crate::commands::{inspect, restore, simulate};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let threads = configure_threads(&cli.threads)?;
    info!(threads, "sira {}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Simulate {
            facility,
            out,
            samples,
            seed,
            save_damage_states,
        } => simulate::handle(facility, out, *samples, *seed, *save_damage_states),
        Commands::Restore {
            facility,
            out,
            hazards,
            streams,
        } => restore::handle(facility, out, hazards, streams),
        Commands::Inspect { facility } => inspect::handle(facility),
    }
}
