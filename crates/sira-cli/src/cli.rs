use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Seismic resilience simulation for infrastructure facilities",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Threads for the trial loop (`auto` = all cores)
    #[arg(long, default_value = "auto", global = true)]
    pub threads: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monte-Carlo loss and output simulation over the configured hazard range
    Simulate {
        /// Facility definition (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        facility: PathBuf,
        /// Output directory for the response tables
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        /// Override the configured sample count
        #[arg(long)]
        samples: Option<usize>,
        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,
        /// Also write the sampled damage state of every component per trial
        #[arg(long)]
        save_damage_states: bool,
    },
    /// Restoration prognosis at the configured scenario hazards
    Restore {
        /// Facility definition (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        facility: PathBuf,
        /// Output directory for the prognosis report
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        /// Scenario hazard values (comma separated), replacing the configured ones
        #[arg(long, value_delimiter = ',')]
        hazards: Vec<f64>,
        /// Stream counts (comma separated), replacing the configured ones
        #[arg(long, value_delimiter = ',')]
        streams: Vec<usize>,
    },
    /// Print network statistics and flag unreachable output lines
    Inspect {
        /// Facility definition (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        facility: PathBuf,
    },
}
