//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use dbtrial_core::{
    BatchConfig, ConnectFailurePolicy, PairFailurePolicy, RunDescriptor, DEFAULT_COLD_ITERATIONS,
    DEFAULT_WARM_ITERATIONS,
};

use crate::formatter::OutputFormat;

/// Default output directory for series files.
pub const DEFAULT_OUTPUT_DIR: &str = "results";

/// Default pause between trials in milliseconds.
pub const DEFAULT_PAUSE_MS: u64 = 200;

/// Default pause between (backend, query) pairs in milliseconds.
pub const DEFAULT_PAIR_PAUSE_MS: u64 = 2000;

/// Cold/warm query benchmarks across database backends.
#[derive(Parser, Debug)]
#[command(name = "dbtrial")]
#[command(version, about = "Cold/warm query benchmarks across database backends", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every query of a workload file against its backends.
    Run(RunArgs),
    /// Print summary statistics for persisted series files.
    Summarize(SummarizeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    /// Workload file (JSON) declaring backends and queries.
    #[arg(short, long)]
    pub workload: PathBuf,

    /// Directory for the series CSV files.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Only run these backend ids (repeatable).
    #[arg(short, long = "backend")]
    pub backends: Vec<String>,

    /// Cold trials per query.
    #[arg(long, default_value_t = DEFAULT_COLD_ITERATIONS)]
    pub cold: usize,

    /// Warm trials per query.
    #[arg(long, default_value_t = DEFAULT_WARM_ITERATIONS)]
    pub warm: usize,

    /// Pause after each trial in milliseconds.
    #[arg(long, default_value_t = DEFAULT_PAUSE_MS)]
    pub pause_ms: u64,

    /// Pause between (backend, query) pairs in milliseconds.
    #[arg(long, default_value_t = DEFAULT_PAIR_PAUSE_MS)]
    pub pair_pause_ms: u64,

    /// What to do when a connect fails: abort or sentinel.
    #[arg(long, default_value_t = ConnectFailurePolicy::Abort)]
    pub on_connect_failure: ConnectFailurePolicy,

    /// What to do when a pair fails: abort or continue.
    #[arg(long, default_value_t = PairFailurePolicy::Abort)]
    pub on_pair_failure: PairFailurePolicy,

    /// Remove series already written by a pair that fails.
    #[arg(long)]
    pub remove_partial: bool,

    /// Output format for the final report.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Convert command-line arguments to batch configuration.
    pub fn batch_config(&self) -> BatchConfig {
        // Backend id, label and prefix are filled in per pair.
        let template = RunDescriptor::new("", "")
            .with_cold_iterations(self.cold)
            .with_warm_iterations(self.warm)
            .with_inter_trial_pause(Duration::from_millis(self.pause_ms))
            .with_connect_failure(self.on_connect_failure);

        BatchConfig::new(template)
            .with_pair_pause(Duration::from_millis(self.pair_pause_ms))
            .with_on_failure(self.on_pair_failure)
            .with_remove_partial(self.remove_partial)
    }
}

#[derive(ClapArgs, Debug)]
pub struct SummarizeArgs {
    /// Series CSV files.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Drop this many leading trials (e.g. 1 for the extra cold trial).
    #[arg(long, default_value_t = 0)]
    pub skip_first: usize,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}
