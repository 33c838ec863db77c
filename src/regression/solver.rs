//! Nonlinear least-squares solvers used by the curve fits.
//!
//! All solvers minimize `||r(p)||²` for a [`LeastSquaresProblem`] and share
//! [`SolverOptions`]. Bounds, when given, are enforced by freezing parameters
//! pinned at an active bound and projecting every trial point onto the box.

#![allow(clippy::needless_range_loop)]

use thiserror::Error;

/// Threshold for treating pivots and diagonal entries as zero.
const ZERO_THRESHOLD: f64 = 1e-14;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 0.1;
const LAMBDA_MAX: f64 = 1e16;

/// Step halvings tried by the Gauss–Newton line search.
const MAX_BACKTRACKS: usize = 50;

// ---------------------------------------------------------------------------
// Problem definition, options, reports
// ---------------------------------------------------------------------------

/// A residual vector and its Jacobian.
pub trait LeastSquaresProblem {
    /// Number of parameters.
    fn dim(&self) -> usize;
    /// `r_i(p)`, one entry per observation.
    fn residuals(&self, params: &[f64]) -> Vec<f64>;
    /// `J[i][j] = ∂r_i/∂p_j`.
    fn jacobian(&self, params: &[f64]) -> Vec<Vec<f64>>;
}

/// Box constraints, one `(lower, upper)` pair per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    /// Every parameter constrained to `[0, ∞)`.
    pub fn non_negative(dim: usize) -> Self {
        Bounds {
            lower: vec![0.0; dim],
            upper: vec![f64::INFINITY; dim],
        }
    }

    fn project(&self, p: &mut [f64]) {
        for (i, v) in p.iter_mut().enumerate() {
            *v = v.max(self.lower[i]).min(self.upper[i]);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Maximum number of outer iterations.
    pub max_iter: usize,
    /// Relative reduction of the cost below which the solver stops.
    pub f_tol: f64,
    /// Relative step length below which the solver stops.
    pub x_tol: f64,
    /// Infinity norm of the gradient below which the solver stops.
    pub g_tol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            f_tol: 1e-10,
            x_tol: 1e-10,
            g_tol: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("residuals are not finite at iteration {iteration}")]
    NonFinite { iteration: usize },

    #[error("normal equations are singular")]
    Singular,

    #[error("did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },
}

pub type SolverResult = Result<SolverReport, SolverError>;

// ---------------------------------------------------------------------------
// Levenberg–Marquardt
// ---------------------------------------------------------------------------

/// Levenberg–Marquardt with Marquardt diagonal scaling.
///
/// With `bounds`, each trial step is projected onto the box before it is
/// evaluated.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    p0: &[f64],
    bounds: Option<&Bounds>,
    options: &SolverOptions,
) -> SolverResult {
    let mut p = start_point(problem, p0, bounds)?;
    let mut r = problem.residuals(&p);
    let mut cost = finite_cost(&r, 0)?;
    let mut lambda = LAMBDA_INIT;

    for iter in 0..options.max_iter {
        let jac = problem.jacobian(&p);
        let (mut jtj, mut jtr) = normal_equations(&jac, &r);
        if let Some(b) = bounds {
            freeze_active(&p, b, &mut jtj, &mut jtr);
        }

        if norm_inf(&jtr) <= options.g_tol || cost == 0.0 {
            return Ok(report(p, cost, iter));
        }

        for i in 0..jtj.len() {
            jtj[i][i] = (jtj[i][i] * (1.0 + lambda)).max(ZERO_THRESHOLD);
        }

        let neg_jtr: Vec<f64> = jtr.iter().map(|v| -v).collect();
        let Some(dx) = solve_linear_system(&jtj, &neg_jtr) else {
            lambda = (lambda * LAMBDA_UP).min(LAMBDA_MAX);
            continue;
        };

        let mut p_new: Vec<f64> = p.iter().zip(&dx).map(|(a, b)| a + b).collect();
        if let Some(b) = bounds {
            b.project(&mut p_new);
        }
        let step = distance(&p, &p_new);
        let r_new = problem.residuals(&p_new);
        let cost_new = norm_squared(&r_new);

        if cost_new < cost {
            let reduction = cost - cost_new;
            let p_scale = norm(&p_new);
            p = p_new;
            r = r_new;
            cost = cost_new;
            if reduction <= options.f_tol * cost || step <= options.x_tol * (p_scale + options.x_tol) {
                return Ok(report(p, cost, iter + 1));
            }
            lambda = (lambda * LAMBDA_DOWN).max(ZERO_THRESHOLD);
        } else {
            // A rejected step that is already negligible means no further progress is possible.
            if step <= options.x_tol * (norm(&p) + options.x_tol) {
                return Ok(report(p, cost, iter + 1));
            }
            if lambda >= LAMBDA_MAX {
                return Err(SolverError::DidNotConverge { iterations: iter + 1 });
            }
            lambda = (lambda * LAMBDA_UP).min(LAMBDA_MAX);
        }
    }

    Err(SolverError::DidNotConverge {
        iterations: options.max_iter,
    })
}

// ---------------------------------------------------------------------------
// Projected Gauss–Newton
// ---------------------------------------------------------------------------

/// Gauss–Newton with a projected backtracking line search.
///
/// Stops when the cost can no longer be reduced along the projected
/// direction, or on the same relative tolerances as
/// [`levenberg_marquardt`].
pub fn gauss_newton<P: LeastSquaresProblem>(
    problem: &P,
    p0: &[f64],
    bounds: Option<&Bounds>,
    options: &SolverOptions,
) -> SolverResult {
    let mut p = start_point(problem, p0, bounds)?;
    let mut r = problem.residuals(&p);
    let mut cost = finite_cost(&r, 0)?;

    for iter in 0..options.max_iter {
        let jac = problem.jacobian(&p);
        let (mut jtj, mut jtr) = normal_equations(&jac, &r);
        if let Some(b) = bounds {
            freeze_active(&p, b, &mut jtj, &mut jtr);
        }

        if norm_inf(&jtr) <= options.g_tol || cost == 0.0 {
            return Ok(report(p, cost, iter));
        }

        // Tiny ridge keeps rank-deficient systems solvable.
        for i in 0..jtj.len() {
            jtj[i][i] = (jtj[i][i] * (1.0 + 1e-12)).max(ZERO_THRESHOLD);
        }

        let neg_jtr: Vec<f64> = jtr.iter().map(|v| -v).collect();
        let dx = solve_linear_system(&jtj, &neg_jtr).ok_or(SolverError::Singular)?;

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let mut p_new: Vec<f64> = p.iter().zip(&dx).map(|(a, b)| a + alpha * b).collect();
            if let Some(b) = bounds {
                b.project(&mut p_new);
            }
            let r_new = problem.residuals(&p_new);
            let cost_new = norm_squared(&r_new);
            if cost_new < cost {
                accepted = Some((p_new, r_new, cost_new));
                break;
            }
            alpha *= 0.5;
        }

        let Some((p_new, r_new, cost_new)) = accepted else {
            // No descent left along the projected direction.
            return Ok(report(p, cost, iter + 1));
        };

        let step = distance(&p, &p_new);
        let reduction = cost - cost_new;
        p = p_new;
        r = r_new;
        cost = cost_new;

        if reduction <= options.f_tol * cost || step <= options.x_tol * (norm(&p) + options.x_tol) {
            return Ok(report(p, cost, iter + 1));
        }
    }

    Err(SolverError::DidNotConverge {
        iterations: options.max_iter,
    })
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn start_point<P: LeastSquaresProblem>(
    problem: &P,
    p0: &[f64],
    bounds: Option<&Bounds>,
) -> Result<Vec<f64>, SolverError> {
    let n = problem.dim();
    if p0.len() != n || n == 0 {
        return Err(SolverError::InvalidInput(format!(
            "expected {n} initial parameters, got {}",
            p0.len()
        )));
    }
    let mut p = p0.to_vec();
    if let Some(b) = bounds {
        if b.lower.len() != n || b.upper.len() != n {
            return Err(SolverError::InvalidInput("bounds dimension mismatch".to_string()));
        }
        b.project(&mut p);
    }
    Ok(p)
}

fn finite_cost(r: &[f64], iteration: usize) -> Result<f64, SolverError> {
    if r.is_empty() {
        return Err(SolverError::InvalidInput("no residuals".to_string()));
    }
    let cost = norm_squared(r);
    if !cost.is_finite() {
        return Err(SolverError::NonFinite { iteration });
    }
    Ok(cost)
}

fn report(params: Vec<f64>, cost: f64, iterations: usize) -> SolverReport {
    SolverReport {
        params,
        cost,
        iterations,
    }
}

/// Pin parameters that sit on a bound with the gradient pointing outward.
///
/// Their rows and columns are replaced by the identity and their gradient
/// entries zeroed, so the solved step leaves them in place and `jtr` becomes
/// the projected gradient.
fn freeze_active(p: &[f64], bounds: &Bounds, jtj: &mut [Vec<f64>], jtr: &mut [f64]) {
    let n = p.len();
    for i in 0..n {
        let at_lower = p[i] <= bounds.lower[i] && jtr[i] > 0.0;
        let at_upper = p[i] >= bounds.upper[i] && jtr[i] < 0.0;
        if !(at_lower || at_upper) {
            continue;
        }
        for j in 0..n {
            jtj[i][j] = 0.0;
            jtj[j][i] = 0.0;
        }
        jtj[i][i] = 1.0;
        jtr[i] = 0.0;
    }
}

/// `(JᵀJ, Jᵀr)` for an `m × n` Jacobian.
fn normal_equations(jac: &[Vec<f64>], r: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let n = jac.first().map_or(0, Vec::len);
    let mut jtj = vec![vec![0.0; n]; n];
    let mut jtr = vec![0.0; n];
    for (row, &ri) in jac.iter().zip(r) {
        for i in 0..n {
            jtr[i] += row[i] * ri;
            for j in i..n {
                jtj[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n {
        for j in 0..i {
            jtj[i][j] = jtj[j][i];
        }
    }
    (jtj, jtr)
}

#[inline]
fn norm(v: &[f64]) -> f64 {
    norm_squared(v).sqrt()
}

#[inline]
fn norm_squared(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

#[inline]
fn norm_inf(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).fold(0.0, f64::max)
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Solve `Ax = b` by Gaussian elimination with partial pivoting.
///
/// `None` when the matrix is singular or the result is not finite.
fn solve_linear_system(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, &bi)| {
            let mut r = row.clone();
            r.push(bi);
            r
        })
        .collect();

    for col in 0..n {
        let max_row = (col..n)
            .max_by(|&i, &j| aug[i][col].abs().total_cmp(&aug[j][col].abs()))
            .unwrap_or(col);
        if !(aug[max_row][col].abs() > ZERO_THRESHOLD) {
            return None;
        }
        aug.swap(col, max_row);

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// `r_i = p0 + p1 * x_i - y_i`
    struct Line {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for Line {
        fn dim(&self) -> usize {
            2
        }

        fn residuals(&self, p: &[f64]) -> Vec<f64> {
            self.x
                .iter()
                .zip(&self.y)
                .map(|(&x, &y)| p[0] + p[1] * x - y)
                .collect()
        }

        fn jacobian(&self, _p: &[f64]) -> Vec<Vec<f64>> {
            self.x.iter().map(|&x| vec![1.0, x]).collect()
        }
    }

    fn line(intercept: f64, slope: f64) -> Line {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y = x.iter().map(|&v| intercept + slope * v).collect();
        Line { x, y }
    }

    #[test]
    fn test_lm_linear_fit() {
        let report =
            levenberg_marquardt(&line(1.0, 2.0), &[0.0, 0.0], None, &SolverOptions::default())
                .expect("lm failed");
        assert_abs_diff_eq!(report.params[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 2.0, epsilon = 1e-6);
        assert!(report.cost < 1e-10);
    }

    #[test]
    fn test_gauss_newton_linear_fit() {
        let report = gauss_newton(&line(-3.0, 0.5), &[10.0, 10.0], None, &SolverOptions::default())
            .expect("gauss-newton failed");
        assert_abs_diff_eq!(report.params[0], -3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.params[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_bounds_are_respected() {
        // Unconstrained optimum has a negative slope.
        let problem = line(5.0, -1.0);
        let bounds = Bounds::non_negative(2);

        for report in [
            levenberg_marquardt(&problem, &[1.0, 1.0], Some(&bounds), &SolverOptions::default()),
            gauss_newton(&problem, &[1.0, 1.0], Some(&bounds), &SolverOptions::default()),
        ] {
            let report = report.expect("bounded solve failed");
            assert!(report.params.iter().all(|&v| v >= 0.0));
            assert_abs_diff_eq!(report.params[1], 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_iteration_budget() {
        let options = SolverOptions {
            max_iter: 1,
            f_tol: 0.0,
            x_tol: 0.0,
            g_tol: 0.0,
        };
        let err = levenberg_marquardt(&line(1.0, 2.0), &[100.0, -50.0], None, &options).unwrap_err();
        assert!(matches!(err, SolverError::DidNotConverge { .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = gauss_newton(&line(1.0, 2.0), &[0.0], None, &SolverOptions::default()).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }

    #[test]
    fn test_solve_linear_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear_system(&a, &[3.0, 5.0]).unwrap();
        assert_abs_diff_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);
        assert!(solve_linear_system(&[vec![1.0, 2.0], vec![2.0, 4.0]], &[1.0, 2.0]).is_none());
    }
}
