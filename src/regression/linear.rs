use serde::Serialize;

use super::metrics::r_squared;
use crate::data::filter::paired_series;
use crate::data::model::{Column, ObservationTable};
use crate::error::{StatsError, StatsResult};
use crate::stats::measure::{Measure, measures};

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: Measure,
    pub intercept: Measure,
    pub r2: Measure,
    pub x: Vec<f64>,
    pub y_real: Vec<f64>,
    pub y_pred: Vec<Measure>,
    pub latex: String,
}

/// Fit `y_column` against `x_column` over their jointly non-missing rows.
pub fn fit_linear(table: &ObservationTable, x_column: Column, y_column: Column) -> StatsResult<LinearFit> {
    let (x, y) = paired_series(table, x_column, y_column)?;
    fit_linear_xy(x, y)
}

/// Fit on already-paired data.
///
/// A constant `x` has no defined slope; the fit degrades to the horizontal
/// line through the mean of `y`.
pub fn fit_linear_xy(x: Vec<f64>, y: Vec<f64>) -> StatsResult<LinearFit> {
    if x.len() != y.len() {
        return Err(StatsError::invalid_parameter(
            "y",
            format!("expected {} values, got {}", x.len(), y.len()),
        ));
    }
    if x.is_empty() {
        return Err(StatsError::no_valid_data("regression input is empty"));
    }

    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(&y) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx) * (xi - mx);
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = my - slope * mx;

    let y_pred: Vec<f64> = x.iter().map(|&xi| slope * xi + intercept).collect();
    let r2 = Measure::from_f64(r_squared(&y, &y_pred));

    Ok(LinearFit {
        slope: Measure::from_f64(slope),
        intercept: Measure::from_f64(intercept),
        r2,
        latex: linear_latex(slope, intercept),
        y_pred: measures(&y_pred),
        x,
        y_real: y,
    })
}

fn linear_latex(slope: f64, intercept: f64) -> String {
    let sign = if intercept < 0.0 { '-' } else { '+' };
    format!("y = {slope:.3}x {sign} {:.3}", intercept.abs())
}
