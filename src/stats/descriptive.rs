//! Descriptive statistics over cleaned columns of the observation table.
//!
//! Every operation cleans its column on demand, computes in `f64`, and folds
//! non-finite aggregates into [`Measure::Unavailable`] before returning.

use std::collections::BTreeMap;

use serde::Serialize;

use super::measure::{Measure, round_to};
use crate::data::filter::{cleaned_series, complete_frame};
use crate::data::model::{Column, ObservationTable};
use crate::error::{StatsError, StatsResult};

/// Classification band around zero for skewness and excess kurtosis.
pub const SHAPE_TOLERANCE: f64 = 1e-4;

/// Coefficient of variation is reported only when `|mean|` exceeds this.
pub const MEAN_EPSILON: f64 = 1e-12;

/// Percentile ranks reported by [`compute_percentiles`].
pub const PERCENTILE_RANKS: [u32; 9] = [0, 10, 25, 50, 75, 90, 95, 99, 100];

/// Largest accepted histogram bin count.
pub const MAX_BINS: i64 = 10_000;

/// Decimal places kept on reported skewness.
const SKEWNESS_DECIMALS: usize = 4;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Central tendency and spread of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub mean: Measure,
    pub median: Measure,
    pub mode: Measure,
    pub variance: Measure,
    pub standard_deviation: Measure,
}

pub type Matrix = BTreeMap<Column, BTreeMap<Column, Measure>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub statistics: BTreeMap<Column, ColumnSummary>,
    pub covariance: Matrix,
    pub correlation: Matrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramResult {
    pub column: Column,
    pub bins: Vec<String>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileTable {
    pub column: Column,
    pub percentiles: Vec<u32>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispersion {
    pub column: Column,
    /// Unit of `amplitude` and `standard_deviation`.
    pub unit: &'static str,
    pub amplitude: Measure,
    pub variance: Measure,
    pub standard_deviation: Measure,
    pub coef_var: Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkewShape {
    Positive,
    Negative,
    Symmetric,
    /// Fewer than three observations.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asymmetry {
    pub column: Column,
    pub skewness: Measure,
    pub interpretation: SkewShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TailShape {
    Leptokurtic,
    Platykurtic,
    Mesokurtic,
    /// Fewer than four observations.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kurtosis {
    pub column: Column,
    pub kurtosis: Measure,
    pub interpretation: TailShape,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Per-column summary plus covariance and Pearson correlation matrices.
///
/// Each column's own statistics use all of its non-missing values. The
/// matrices use only rows where every requested column is present, so all
/// pairwise entries share one sample; with fewer than two such rows they are
/// unavailable.
pub fn compute_summary(table: &ObservationTable, columns: &[Column]) -> StatsResult<Summary> {
    if columns.is_empty() {
        return Err(StatsError::invalid_parameter(
            "columns",
            "at least one column is required",
        ));
    }

    let statistics = columns
        .iter()
        .map(|&col| Ok((col, column_summary(&cleaned_series(table, col)?))))
        .collect::<StatsResult<BTreeMap<_, _>>>()?;

    let frame = complete_frame(table, columns)
        .unwrap_or_else(|_| columns.iter().map(|&col| (col, Vec::new())).collect());

    let mut covariance = Matrix::new();
    let mut correlation = Matrix::new();
    for (ci, xi) in &frame {
        for (cj, xj) in &frame {
            covariance
                .entry(*ci)
                .or_default()
                .insert(*cj, Measure::from_f64(sample_covariance(xi, xj)));
            correlation
                .entry(*ci)
                .or_default()
                .insert(*cj, Measure::from_f64(pearson(xi, xj)));
        }
    }

    Ok(Summary {
        statistics,
        covariance,
        correlation,
    })
}

/// Equal-width histogram with `bins` bins over the observed range.
///
/// Bins are right-closed `(l, r]`; the first bin also holds its left edge.
/// Ages are rounded to whole years before binning.
pub fn compute_histogram(
    table: &ObservationTable,
    column: Column,
    bins: i64,
) -> StatsResult<HistogramResult> {
    if !(1..=MAX_BINS).contains(&bins) {
        return Err(StatsError::invalid_parameter(
            "bins",
            format!("must be between 1 and {MAX_BINS}, got {bins}"),
        ));
    }
    let bins = bins as usize;

    let mut series = cleaned_series(table, column)?;
    if column.precision() == 0 {
        series.iter_mut().for_each(|v| *v = v.round());
    }

    let edges = bin_edges(&series, bins);
    let mut counts = vec![0usize; bins];
    for &v in &series {
        // Number of interior right edges strictly below v.
        let idx = edges[1..].partition_point(|&e| e < v).min(bins - 1);
        counts[idx] += 1;
    }

    let p = column.precision();
    let labels = edges
        .windows(2)
        .map(|w| format!("{:.p$}-{:.p$}", round_to(w[0], p), round_to(w[1], p)))
        .collect();

    Ok(HistogramResult {
        column,
        bins: labels,
        counts,
    })
}

/// Percentile table at [`PERCENTILE_RANKS`], linear interpolation between
/// order statistics.
pub fn compute_percentiles(table: &ObservationTable, column: Column) -> StatsResult<PercentileTable> {
    let mut series = cleaned_series(table, column)?;
    series.sort_by(f64::total_cmp);

    let values = PERCENTILE_RANKS
        .iter()
        .map(|&p| round_to(percentile_sorted(&series, p as f64), column.precision()))
        .collect();

    Ok(PercentileTable {
        column,
        percentiles: PERCENTILE_RANKS.to_vec(),
        values,
    })
}

/// Range, unbiased variance, standard deviation and coefficient of variation (%).
pub fn compute_dispersion(table: &ObservationTable, column: Column) -> StatsResult<Dispersion> {
    let series = cleaned_series(table, column)?;

    let (min, max) = min_max(&series);
    let variance = Measure::from_f64(sample_variance(&series));
    let standard_deviation = variance.map(f64::sqrt);
    let m = mean(&series);

    let coef_var = match standard_deviation {
        Measure::Value(sd) if m.abs() >= MEAN_EPSILON => Measure::from_f64(sd / m * 100.0),
        _ => Measure::Unavailable,
    };

    Ok(Dispersion {
        column,
        unit: column.unit(),
        amplitude: Measure::from_f64(max - min),
        variance,
        standard_deviation,
        coef_var,
    })
}

/// Adjusted Fisher–Pearson skewness with a qualitative reading.
pub fn compute_asymmetry(table: &ObservationTable, column: Column) -> StatsResult<Asymmetry> {
    let series = cleaned_series(table, column)?;
    let skew = Measure::from_f64(skewness(&series));

    let interpretation = match skew {
        Measure::Value(s) if s > SHAPE_TOLERANCE => SkewShape::Positive,
        Measure::Value(s) if s < -SHAPE_TOLERANCE => SkewShape::Negative,
        Measure::Value(_) => SkewShape::Symmetric,
        Measure::Unavailable => SkewShape::Undetermined,
    };

    Ok(Asymmetry {
        column,
        skewness: skew.map(|s| round_to(s, SKEWNESS_DECIMALS)),
        interpretation,
    })
}

/// Bias-corrected excess kurtosis (normal = 0) with a qualitative reading.
pub fn compute_kurtosis(table: &ObservationTable, column: Column) -> StatsResult<Kurtosis> {
    let series = cleaned_series(table, column)?;
    let kurt = Measure::from_f64(excess_kurtosis(&series));

    let interpretation = match kurt {
        Measure::Value(k) if k > SHAPE_TOLERANCE => TailShape::Leptokurtic,
        Measure::Value(k) if k < -SHAPE_TOLERANCE => TailShape::Platykurtic,
        Measure::Value(_) => TailShape::Mesokurtic,
        Measure::Unavailable => TailShape::Undetermined,
    };

    Ok(Kurtosis {
        column,
        kurtosis: kurt,
        interpretation,
    })
}

// ---------------------------------------------------------------------------
// Numeric kernels
// ---------------------------------------------------------------------------

fn column_summary(values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let variance = Measure::from_f64(sample_variance(values));

    ColumnSummary {
        mean: Measure::from_f64(mean(values)),
        median: Measure::from_f64(percentile_sorted(&sorted, 50.0)),
        mode: Measure::from(mode_sorted(&sorted)),
        variance,
        standard_deviation: variance.map(f64::sqrt),
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Unbiased (n − 1) variance; NaN when fewer than two values.
pub fn sample_variance(x: &[f64]) -> f64 {
    sample_covariance(x, x)
}

/// Unbiased standard deviation.
pub fn sample_std(x: &[f64]) -> f64 {
    sample_variance(x).sqrt()
}

/// Unbiased covariance of two equally long slices.
pub fn sample_covariance(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let s: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    s / (n - 1) as f64
}

/// Pearson correlation; NaN when either side has zero spread.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Linear-interpolation percentile of an ascending slice, `p` in [0, 100].
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Most frequent value of an ascending slice; ties go to the smallest value.
pub fn mode_sorted(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    for run in sorted.chunk_by(|a, b| a == b) {
        if best.map_or(true, |(_, count)| run.len() > count) {
            best = Some((run[0], run.len()));
        }
    }
    best.map(|(v, _)| v)
}

fn min_max(x: &[f64]) -> (f64, f64) {
    x.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Central moments `(m2, m3, m4)` with divisor `n`.
fn central_moments(x: &[f64]) -> (f64, f64, f64) {
    let n = x.len() as f64;
    let m = mean(x);
    let (mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0);
    for &v in x {
        let d = v - m;
        let d2 = d * d;
        s2 += d2;
        s3 += d2 * d;
        s4 += d2 * d2;
    }
    (s2 / n, s3 / n, s4 / n)
}

/// Adjusted Fisher–Pearson standardized third moment `G1`.
///
/// NaN for fewer than three values; zero for a constant series.
pub fn skewness(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 3 {
        return f64::NAN;
    }
    let (m2, m3, _) = central_moments(x);
    if m2 == 0.0 {
        return 0.0;
    }
    let nf = n as f64;
    let g1 = m3 / m2.powf(1.5);
    g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
}

/// Bias-corrected excess kurtosis `G2`.
///
/// NaN for fewer than four values; zero for a constant series.
pub fn excess_kurtosis(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 4 {
        return f64::NAN;
    }
    let (m2, _, m4) = central_moments(x);
    if m2 == 0.0 {
        return 0.0;
    }
    let nf = n as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    ((nf + 1.0) * g2 + 6.0) * (nf - 1.0) / ((nf - 2.0) * (nf - 3.0))
}

/// `bins + 1` equal-width edges over the range of `series`.
///
/// A constant series is widened by 0.1 % of its magnitude on each side
/// (0.001 absolute at zero) so the bins keep a positive width.
fn bin_edges(series: &[f64], bins: usize) -> Vec<f64> {
    let (mut lo, mut hi) = min_max(series);
    if lo == hi {
        let adj = |v: f64| if v == 0.0 { 0.001 } else { 0.001 * v.abs() };
        lo -= adj(lo);
        hi += adj(hi);
    }
    let width = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    edges[bins] = hi;
    edges
}
