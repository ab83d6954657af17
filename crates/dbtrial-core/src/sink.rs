//! Persistence of timing series.
//!
//! A sink receives complete series only. Persisting the same name again
//! replaces the previous artifact.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer};

use crate::error::SinkError;
use crate::series::{SeriesName, TimingSeries};

/// Header of the iteration column.
pub const ITERATION_COLUMN: &str = "iteration";

/// Header of the elapsed time column.
pub const ELAPSED_COLUMN: &str = "execution_time_ms";

/// Destination for completed timing series.
pub trait ResultSink {
    /// Persist a complete series under `name`, replacing any previous one.
    ///
    /// Returns a description of where it landed (a path for file sinks).
    fn persist(&mut self, name: &SeriesName, series: &TimingSeries) -> Result<String, SinkError>;

    /// Remove a previously persisted series. Missing series are ignored.
    fn remove(&mut self, name: &SeriesName) -> Result<(), SinkError>;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn persist(&mut self, name: &SeriesName, series: &TimingSeries) -> Result<String, SinkError> {
        (**self).persist(name, series)
    }

    fn remove(&mut self, name: &SeriesName) -> Result<(), SinkError> {
        (**self).remove(name)
    }
}

/// Writes each series to `{dir}/{name}.csv`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Create a sink writing into `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `name`.
    pub fn path_for(&self, name: &SeriesName) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }
}

impl ResultSink for CsvSink {
    fn persist(&mut self, name: &SeriesName, series: &TimingSeries) -> Result<String, SinkError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        write_series(&path, series)?;
        Ok(path.display().to_string())
    }

    fn remove(&mut self, name: &SeriesName) -> Result<(), SinkError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps persisted series in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    series: HashMap<String, TimingSeries>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a persisted series by name.
    pub fn get(&self, name: &str) -> Option<&TimingSeries> {
        self.series.get(name)
    }

    /// Names of all persisted series, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.series.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl ResultSink for MemorySink {
    fn persist(&mut self, name: &SeriesName, series: &TimingSeries) -> Result<String, SinkError> {
        self.series.insert(name.to_string(), series.clone());
        Ok(format!("memory:{}", name))
    }

    fn remove(&mut self, name: &SeriesName) -> Result<(), SinkError> {
        self.series.remove(name.as_str());
        Ok(())
    }
}

/// Write a series as a two-column CSV table, header first.
pub fn write_series(path: &Path, series: &TimingSeries) -> Result<(), SinkError> {
    let mut writer = Writer::from_writer(File::create(path)?);
    writer.write_record([ITERATION_COLUMN, ELAPSED_COLUMN])?;
    for (iteration, elapsed_ms) in series.entries() {
        writer.write_record([iteration.to_string(), format_elapsed(elapsed_ms)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Render an elapsed time so it always carries a decimal point
/// (`10.0`, `0.0`) and parses back to the same value.
fn format_elapsed(elapsed_ms: f64) -> String {
    format!("{:?}", elapsed_ms)
}

/// Read a series previously written by [`write_series`].
///
/// Rows must be numbered 1, 2, 3, ... without gaps.
pub fn read_series(path: &Path) -> Result<TimingSeries, SinkError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let iteration_col = column_index(&headers, ITERATION_COLUMN, path)?;
    let elapsed_col = column_index(&headers, ELAPSED_COLUMN, path)?;

    let mut series = TimingSeries::default();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let parse_err = |message: String| SinkError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let iteration: usize = record
            .get(iteration_col)
            .unwrap_or_default()
            .parse()
            .map_err(|e| parse_err(format!("invalid iteration: {}", e)))?;
        let elapsed_ms: f64 = record
            .get(elapsed_col)
            .unwrap_or_default()
            .parse()
            .map_err(|e| parse_err(format!("invalid elapsed time: {}", e)))?;

        let expected = series.len() + 1;
        if iteration != expected {
            return Err(parse_err(format!(
                "expected iteration {}, found {}",
                expected, iteration
            )));
        }
        series.push(elapsed_ms);
    }

    Ok(series)
}

fn column_index(headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize, SinkError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| SinkError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: format!("missing column '{}'", column),
        })
}
