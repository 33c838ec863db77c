use std::cmp::Ordering;
use std::fmt;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use super::metrics::{mae, r_squared, rmse};
use super::solver::{
    Bounds, LeastSquaresProblem, SolverOptions, SolverReport, SolverResult, gauss_newton,
    levenberg_marquardt,
};
use crate::data::filter::paired_series;
use crate::data::model::{Column, ObservationTable};
use crate::error::{StatsError, StatsResult};
use crate::stats::measure::{Measure, measures};

/// Paired rows beyond this count are subsampled before fitting.
pub const SUBSAMPLE_CAP: usize = 5_000;

/// Seed of the subsampling generator.
pub const SUBSAMPLE_SEED: u64 = 42;

/// Starting growth rate `b₀`.
pub const INITIAL_RATE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Residuals of `y = a · e^(b·x)` with parameters `[a, b]`.
struct ExponentialProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for ExponentialProblem<'_> {
    fn dim(&self) -> usize {
        2
    }

    fn residuals(&self, p: &[f64]) -> Vec<f64> {
        self.x
            .iter()
            .zip(self.y)
            .map(|(&x, &y)| p[0] * (p[1] * x).exp() - y)
            .collect()
    }

    fn jacobian(&self, p: &[f64]) -> Vec<Vec<f64>> {
        self.x
            .iter()
            .map(|&x| {
                let e = (p[1] * x).exp();
                vec![e, p[0] * x * e]
            })
            .collect()
    }
}

fn predict(x: &[f64], a: f64, b: f64) -> Vec<f64> {
    x.iter().map(|&v| a * (b * v).exp()).collect()
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One optimization configuration tried by [`fit_exponential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    LevenbergMarquardt,
    BoundedLevenbergMarquardt,
    BoundedGaussNewton,
}

/// Attempt order.
pub const STRATEGIES: [FitMethod; 3] = [
    FitMethod::LevenbergMarquardt,
    FitMethod::BoundedLevenbergMarquardt,
    FitMethod::BoundedGaussNewton,
];

impl FitMethod {
    pub fn name(&self) -> &'static str {
        match self {
            FitMethod::LevenbergMarquardt => "levenberg_marquardt",
            FitMethod::BoundedLevenbergMarquardt => "bounded_levenberg_marquardt",
            FitMethod::BoundedGaussNewton => "bounded_gauss_newton",
        }
    }

    fn solve<P: LeastSquaresProblem>(&self, problem: &P, p0: &[f64], options: &SolverOptions) -> SolverResult {
        let bounds = Bounds::non_negative(problem.dim());
        match self {
            FitMethod::LevenbergMarquardt => levenberg_marquardt(problem, p0, None, options),
            FitMethod::BoundedLevenbergMarquardt => levenberg_marquardt(problem, p0, Some(&bounds), options),
            FitMethod::BoundedGaussNewton => gauss_newton(problem, p0, Some(&bounds), options),
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Parameters and error metrics of one converged strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodComparison {
    pub method: FitMethod,
    pub a: f64,
    pub b: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExponentialFit {
    pub a: f64,
    pub b: f64,
    pub r2: Measure,
    pub method: FitMethod,
    /// Every converged strategy, ascending by RMSE; the first is the winner.
    pub comparisons: Vec<MethodComparison>,
    pub x: Vec<f64>,
    pub y_real: Vec<f64>,
    pub y_pred: Vec<Measure>,
    pub latex: String,
}

// ---------------------------------------------------------------------------
// Fit
// ---------------------------------------------------------------------------

pub fn fit_exponential(
    table: &ObservationTable,
    x_column: Column,
    y_column: Column,
) -> StatsResult<ExponentialFit> {
    let (x, y) = paired_series(table, x_column, y_column)?;
    fit_exponential_xy(x, y)
}

/// Fit `y = a · e^(b·x)` with every strategy and keep the lowest RMSE.
///
/// Inputs longer than [`SUBSAMPLE_CAP`] are reduced to a reproducible
/// subsample first; the returned `x`/`y_real` are the rows actually fitted.
pub fn fit_exponential_xy(x: Vec<f64>, y: Vec<f64>) -> StatsResult<ExponentialFit> {
    if x.len() != y.len() {
        return Err(StatsError::invalid_parameter(
            "y",
            format!("expected {} values, got {}", x.len(), y.len()),
        ));
    }
    if x.is_empty() {
        return Err(StatsError::no_valid_data("regression input is empty"));
    }

    let (x, y) = subsample(x, y, SUBSAMPLE_CAP);
    let problem = ExponentialProblem { x: &x, y: &y };
    let a0 = y.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(1.0);
    let p0 = [a0, INITIAL_RATE];
    let options = SolverOptions::default();

    let mut comparisons: Vec<MethodComparison> = STRATEGIES
        .iter()
        .filter_map(|method| match method.solve(&problem, &p0, &options) {
            Ok(report) => evaluate(*method, &report, &x, &y),
            Err(e) => {
                warn!("{method} dropped: {e}");
                None
            }
        })
        .collect();

    comparisons.sort_by(|l, r| l.rmse.partial_cmp(&r.rmse).unwrap_or(Ordering::Equal));

    let Some(best) = comparisons.first() else {
        return Err(StatsError::FitFailed {
            attempted: STRATEGIES.len(),
        });
    };
    let (a, b, r2, method) = (best.a, best.b, best.r2, best.method);
    debug!("exponential fit selected {method} (a={a}, b={b})");

    Ok(ExponentialFit {
        a,
        b,
        r2,
        method,
        comparisons,
        y_pred: measures(&predict(&x, a, b)),
        latex: format!("y = {a:.3} e^{{{b:.3}x}}"),
        x,
        y_real: y,
    })
}

/// Metrics for a solved strategy, or `None` when they are not finite.
fn evaluate(method: FitMethod, report: &SolverReport, x: &[f64], y: &[f64]) -> Option<MethodComparison> {
    let (a, b) = (report.params[0], report.params[1]);
    let y_pred = predict(x, a, b);
    let comparison = MethodComparison {
        method,
        a,
        b,
        rmse: rmse(y, &y_pred),
        mae: mae(y, &y_pred),
        r2: Measure::from_f64(r_squared(y, &y_pred)),
    };
    if !(a.is_finite() && b.is_finite() && comparison.rmse.is_finite() && comparison.mae.is_finite()) {
        warn!("{method} dropped: non-finite fit");
        return None;
    }
    debug!(
        "{method} converged in {} iterations, rmse={}",
        report.iterations, comparison.rmse
    );
    Some(comparison)
}

/// Keep `cap` rows chosen with a fixed seed, in input order.
fn subsample(x: Vec<f64>, y: Vec<f64>, cap: usize) -> (Vec<f64>, Vec<f64>) {
    if x.len() <= cap {
        return (x, y);
    }
    info!("subsampling {} paired rows to {cap}", x.len());
    let mut rng = StdRng::seed_from_u64(SUBSAMPLE_SEED);
    let mut picked = rand::seq::index::sample(&mut rng, x.len(), cap).into_vec();
    picked.sort_unstable();
    picked.iter().map(|&i| (x[i], y[i])).unzip()
}
