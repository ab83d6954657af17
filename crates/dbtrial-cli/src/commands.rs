//! Subcommand implementations.

use std::path::{Path, PathBuf};

use dbtrial_core::{
    read_series, BatchReport, BatchRunner, CancelSignal, CsvSink, Orchestrator, SeriesSummary,
    SinkError,
};

use crate::config::RunArgs;
use crate::formatter::NamedSummary;
use crate::workload::Workload;

/// Run a workload and return the batch report.
pub async fn run_workload(
    args: &RunArgs,
    cancel: CancelSignal,
) -> Result<BatchReport, Box<dyn std::error::Error>> {
    let workload = Workload::load(&args.workload)?;
    let mut backends = workload.into_batch(&args.backends)?;

    let config = args.batch_config();
    tracing::info!(
        workload = %args.workload.display(),
        output_dir = %args.output_dir.display(),
        backends = backends.len(),
        cold = config.template.cold_iterations,
        warm = config.template.warm_iterations,
        "starting workload"
    );

    let orchestrator = Orchestrator::new(CsvSink::new(&args.output_dir)).with_cancel(cancel);
    let mut runner = BatchRunner::new(orchestrator, config);
    let report = runner.run(&mut backends).await?;
    Ok(report)
}

/// Read and summarize series files.
pub fn summarize(files: &[PathBuf], skip_first: usize) -> Result<Vec<NamedSummary>, SinkError> {
    files
        .iter()
        .map(|path| {
            let series = read_series(path)?;
            Ok(NamedSummary {
                series: series_label(path),
                summary: SeriesSummary::from_series(&series, skip_first),
            })
        })
        .collect()
}

fn series_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
