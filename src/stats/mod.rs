//! Descriptive statistics.
//!
//! - [`descriptive`] - summary, histogram, percentiles, dispersion, shape
//! - [`measure`] - the `Measure` value that stands in for NaN / ±inf

pub mod descriptive;
pub mod measure;

pub use descriptive::{
    Asymmetry, ColumnSummary, Dispersion, HistogramResult, Kurtosis, PercentileTable, SkewShape,
    Summary, TailShape, compute_asymmetry, compute_dispersion, compute_histogram,
    compute_kurtosis, compute_percentiles, compute_summary,
};
pub use measure::Measure;
