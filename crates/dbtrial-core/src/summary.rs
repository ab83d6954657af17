//! Summary statistics over a timing series.
//!
//! Mirrors what the reporting side computes from persisted series: mean,
//! extremes, sample standard deviation and a 95% confidence half-width of
//! `sem * t(0.975, n - 1)`.

use serde::Serialize;

use crate::series::TimingSeries;

/// Two-sided 95% Student t critical values for 1..=30 degrees of freedom.
const T_975: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160,
    2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056,
    2.052, 2.048, 2.045, 2.042,
];

/// Critical value for `df` degrees of freedom. Falls back to the next
/// smaller tabulated df, which widens the interval slightly.
pub fn t_critical_975(df: usize) -> f64 {
    match df {
        0 => f64::NAN,
        1..=30 => T_975[df - 1],
        31..=39 => T_975[29],
        40..=59 => 2.021,
        60..=119 => 2.000,
        120..=999 => 1.980,
        _ => 1.960,
    }
}

/// Descriptive statistics of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub std_dev_ms: f64,
    /// Half-width of the 95% confidence interval around the mean.
    pub ci95_ms: f64,
    /// Number of entries equal to the 0.0 sentinel.
    pub zero_entries: usize,
}

impl SeriesSummary {
    /// Summarize raw samples. An empty slice yields all zeros.
    pub fn from_samples(samples: &[f64]) -> Self {
        let count = samples.len();
        if count == 0 {
            return Self {
                count: 0,
                mean_ms: 0.0,
                min_ms: 0.0,
                max_ms: 0.0,
                std_dev_ms: 0.0,
                ci95_ms: 0.0,
                zero_entries: 0,
            };
        }

        let mean = samples.iter().sum::<f64>() / count as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let (std_dev, ci95) = if count > 1 {
            let variance =
                samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            let std_dev = variance.sqrt();
            let sem = std_dev / (count as f64).sqrt();
            (std_dev, sem * t_critical_975(count - 1))
        } else {
            (0.0, 0.0)
        };

        Self {
            count,
            mean_ms: mean,
            min_ms: min,
            max_ms: max,
            std_dev_ms: std_dev,
            ci95_ms: ci95,
            zero_entries: samples.iter().filter(|&&x| x == 0.0).count(),
        }
    }

    /// Summarize a series, optionally dropping its first `skip_first` trials.
    pub fn from_series(series: &TimingSeries, skip_first: usize) -> Self {
        let times = series.times();
        let start = skip_first.min(times.len());
        Self::from_samples(&times[start..])
    }
}
