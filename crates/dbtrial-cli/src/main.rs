//! dbtrial command-line runner
//!
//! Runs cold/warm benchmarks described by a workload file and summarizes the
//! resulting series.

mod commands;
mod config;
mod formatter;
mod workload;

use clap::Parser;
use dbtrial_core::CancelHandle;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::{Args, Command};
use formatter::create_formatter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbtrial=info,dbtrial_core=info,dbtrial_backends=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Command::Run(run_args) => {
            let cancel = CancelHandle::new();
            let signal = cancel.signal();

            // Ctrl+C stops the batch after the current trial.
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl+c");
                    return;
                }
                tracing::info!("received interrupt, stopping after current trial");
                cancel.cancel();
            });

            let report = commands::run_workload(&run_args, signal).await?;
            println!("{}", create_formatter(run_args.format).format_batch(&report));

            if !report.is_success() {
                return Err(format!("{} pair(s) failed", report.failures.len()).into());
            }
            Ok(())
        }
        Command::Summarize(summarize_args) => {
            let summaries = commands::summarize(&summarize_args.files, summarize_args.skip_first)?;
            println!(
                "{}",
                create_formatter(summarize_args.format).format_summaries(&summaries)
            );
            Ok(())
        }
    }
}
