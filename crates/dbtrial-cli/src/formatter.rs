//! Output formatters for run reports and series summaries.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use dbtrial_core::{BatchReport, SeriesSummary};
use serde_json::json;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A summarized series and the file it was read from.
#[derive(Debug, Clone)]
pub struct NamedSummary {
    pub series: String,
    pub summary: SeriesSummary,
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the outcome of a batch run.
    fn format_batch(&self, report: &BatchReport) -> String;

    /// Format series summaries.
    fn format_summaries(&self, summaries: &[NamedSummary]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_batch(&self, report: &BatchReport) -> String {
        let mut output = String::new();

        if !report.completed.is_empty() {
            let mut table = Table::new();
            table.set_header(vec![
                "Backend",
                "Query",
                "Cold avg (ms)",
                "Warm avg (ms)",
                "Speedup",
                "Sentinels",
            ]);
            for run in &report.completed {
                table.add_row(vec![
                    Cell::new(&run.backend_id),
                    Cell::new(&run.query_label),
                    Cell::new(format!("{:.3}", run.cold.avg_ms())),
                    Cell::new(format!("{:.3}", run.warm.avg_ms())),
                    Cell::new(format!("{:.2}x", run.speedup())),
                    Cell::new(run.cold.sentinels + run.warm.sentinels),
                ]);
            }
            output.push_str(&table.to_string());
        }

        if !report.failures.is_empty() {
            if !output.is_empty() {
                output.push_str("\n\n");
            }
            let mut table = Table::new();
            table.set_header(vec!["Backend", "Query", "Error"]);
            for failure in &report.failures {
                table.add_row(vec![
                    &failure.backend_id,
                    &failure.query_label,
                    &failure.error,
                ]);
            }
            output.push_str(&table.to_string());
        }

        if output.is_empty() {
            output = "No runs".to_string();
        }

        output
    }

    fn format_summaries(&self, summaries: &[NamedSummary]) -> String {
        let mut table = Table::new();
        table.set_header(vec![
            "Series",
            "N",
            "Mean (ms)",
            "95% CI (ms)",
            "Min (ms)",
            "Max (ms)",
            "Std dev (ms)",
            "Zeros",
        ]);

        for named in summaries {
            let s = &named.summary;
            table.add_row(vec![
                Cell::new(&named.series),
                Cell::new(s.count),
                Cell::new(format!("{:.3}", s.mean_ms)),
                Cell::new(format!("±{:.3}", s.ci95_ms)),
                Cell::new(format!("{:.3}", s.min_ms)),
                Cell::new(format!("{:.3}", s.max_ms)),
                Cell::new(format!("{:.3}", s.std_dev_ms)),
                Cell::new(s.zero_entries),
            ]);
        }

        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_batch(&self, report: &BatchReport) -> String {
        let completed: Vec<_> = report
            .completed
            .iter()
            .map(|run| {
                json!({
                    "backend": run.backend_id,
                    "query": run.query_label,
                    "cold": {
                        "series": run.cold.series_name.as_str(),
                        "location": run.cold.location,
                        "avg_ms": run.cold.avg_ms(),
                        "sentinels": run.cold.sentinels,
                    },
                    "warm": {
                        "series": run.warm.series_name.as_str(),
                        "location": run.warm.location,
                        "avg_ms": run.warm.avg_ms(),
                        "sentinels": run.warm.sentinels,
                    },
                    "speedup": run.speedup(),
                })
            })
            .collect();
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|failure| {
                json!({
                    "backend": failure.backend_id,
                    "query": failure.query_label,
                    "error": failure.error,
                })
            })
            .collect();

        let value = json!({ "completed": completed, "failures": failures });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_summaries(&self, summaries: &[NamedSummary]) -> String {
        let rows: Vec<_> = summaries
            .iter()
            .map(|named| json!({ "series": named.series, "summary": named.summary }))
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }
}
