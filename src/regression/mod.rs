//! Regression over pairs of columns.
//!
//! - [`linear`] - closed-form ordinary least squares
//! - [`exponential`] - `y = a·e^(b·x)` tried with several solvers, best by RMSE
//! - [`solver`] - Levenberg–Marquardt and projected Gauss–Newton
//! - [`metrics`] - RMSE, MAE, R²

pub mod exponential;
pub mod linear;
pub mod metrics;
pub mod solver;

pub use exponential::{ExponentialFit, FitMethod, MethodComparison, fit_exponential, fit_exponential_xy};
pub use linear::{LinearFit, fit_linear, fit_linear_xy};
