use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::Serialize;
use statrs::distribution::{ChiSquared, Continuous, Discrete, Normal, Poisson, StudentsT};

use crate::error::{StatsError, StatsResult};
use crate::stats::measure::{Measure, measures};

/// Points on each continuous curve.
pub const CURVE_POINTS: usize = 300;

/// Rate of the Poisson mass curve.
pub const POISSON_RATE: f64 = 4.0;

/// Largest integer shown on the Poisson support (inclusive).
pub const POISSON_MAX_K: u64 = 14;

pub const STUDENT_T_DF: RangeInclusive<i64> = 1..=100;
pub const CHI_SQUARE_DF: RangeInclusive<i64> = 1..=50;

// ---------------------------------------------------------------------------
// Distribution selection
// ---------------------------------------------------------------------------

/// A named theoretical distribution with its shape parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TheoreticalDistribution {
    /// Standard normal density over `[-5, 5]`.
    Normal,
    /// Poisson mass with λ = 4 over `0..=14`.
    Poisson,
    /// Student-t density over `[-5, 5]`.
    StudentT { degrees_of_freedom: i64 },
    /// Chi-square density over `[0, 20]`.
    ChiSquare { degrees_of_freedom: i64 },
}

impl TheoreticalDistribution {
    pub fn name(&self) -> &'static str {
        match self {
            TheoreticalDistribution::Normal => "normal",
            TheoreticalDistribution::Poisson => "poisson",
            TheoreticalDistribution::StudentT { .. } => "t_student",
            TheoreticalDistribution::ChiSquare { .. } => "chi_square",
        }
    }
}

impl fmt::Display for TheoreticalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the parameter-free sample distributions (`normal`, `poisson`).
impl FromStr for TheoreticalDistribution {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(TheoreticalDistribution::Normal),
            "poisson" => Ok(TheoreticalDistribution::Poisson),
            other => Err(StatsError::invalid_parameter(
                "distribution",
                format!("expected normal or poisson, got '{other}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Curve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub distribution: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<i64>,
    pub x: Vec<f64>,
    /// Density (or mass) at each `x`; a pole such as χ²(1) at 0 is unavailable.
    pub y: Vec<Measure>,
    pub description: String,
}

/// Evaluate the density or mass function of `distribution` on its grid.
pub fn theoretical_curve(distribution: TheoreticalDistribution) -> StatsResult<Curve> {
    let (x, y, degrees_of_freedom, description) = match distribution {
        TheoreticalDistribution::Normal => {
            let dist = Normal::new(0.0, 1.0).map_err(|e| bad_shape("normal", e))?;
            let x = linspace(-5.0, 5.0, CURVE_POINTS);
            let y: Vec<f64> = x.iter().map(|&v| dist.pdf(v)).collect();
            (x, y, None, "Normal Distribution (Gauss Curve)".to_string())
        }
        TheoreticalDistribution::Poisson => {
            let dist = Poisson::new(POISSON_RATE).map_err(|e| bad_shape("lambda", e))?;
            let ks: Vec<u64> = (0..=POISSON_MAX_K).collect();
            let y: Vec<f64> = ks.iter().map(|&k| dist.pmf(k)).collect();
            let x = ks.into_iter().map(|k| k as f64).collect();
            (x, y, None, format!("Poisson Distribution (λ={POISSON_RATE})"))
        }
        TheoreticalDistribution::StudentT { degrees_of_freedom } => {
            let df = checked_df(degrees_of_freedom, &STUDENT_T_DF)?;
            let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| bad_shape("degrees_of_freedom", e))?;
            let x = linspace(-5.0, 5.0, CURVE_POINTS);
            let y: Vec<f64> = x.iter().map(|&v| dist.pdf(v)).collect();
            (
                x,
                y,
                Some(degrees_of_freedom),
                format!("Student's t distribution with {degrees_of_freedom} degrees of freedom"),
            )
        }
        TheoreticalDistribution::ChiSquare { degrees_of_freedom } => {
            let df = checked_df(degrees_of_freedom, &CHI_SQUARE_DF)?;
            let dist = ChiSquared::new(df).map_err(|e| bad_shape("degrees_of_freedom", e))?;
            let x = linspace(0.0, 20.0, CURVE_POINTS);
            let y: Vec<f64> = x.iter().map(|&v| dist.pdf(v)).collect();
            (
                x,
                y,
                Some(degrees_of_freedom),
                format!("Chi-square distribution with {degrees_of_freedom} degrees of freedom"),
            )
        }
    };

    Ok(Curve {
        distribution: distribution.name(),
        degrees_of_freedom,
        x,
        y: measures(&y),
        description,
    })
}

fn checked_df(df: i64, range: &RangeInclusive<i64>) -> StatsResult<f64> {
    if !range.contains(&df) {
        return Err(StatsError::invalid_parameter(
            "degrees_of_freedom",
            format!(
                "must be between {} and {}, got {df}",
                range.start(),
                range.end()
            ),
        ));
    }
    Ok(df as f64)
}

fn bad_shape(name: &str, e: impl fmt::Display) -> StatsError {
    StatsError::invalid_parameter(name, e.to_string())
}

/// `n` evenly spaced points from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_linspace() {
        let x = linspace(-5.0, 5.0, 300);
        assert_eq!(x.len(), 300);
        assert_eq!(x[0], -5.0);
        assert_eq!(x[299], 5.0);
        assert!(x.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_normal_curve() {
        let curve = theoretical_curve(TheoreticalDistribution::Normal).unwrap();
        assert_eq!(curve.x.len(), CURVE_POINTS);
        let peak = curve
            .y
            .iter()
            .filter_map(|m| m.value())
            .fold(0.0, f64::max);
        // The grid has no point at exactly 0, so the peak sits just below 1/sqrt(2π).
        assert!(peak < 0.3989422804014327 && peak > 0.398);
        assert_eq!(curve.degrees_of_freedom, None);
    }

    #[test]
    fn test_poisson_curve() {
        let curve = theoretical_curve(TheoreticalDistribution::Poisson).unwrap();
        assert_eq!(curve.x, (0..=14).map(|k| k as f64).collect::<Vec<_>>());
        let p0 = curve.y[0].value().unwrap();
        assert_relative_eq!(p0, (-4.0f64).exp(), epsilon = 1e-12);
        let total: f64 = curve.y.iter().filter_map(|m| m.value()).sum();
        assert!(total > 0.999 && total <= 1.0);
    }

    #[test]
    fn test_student_t_curve_is_symmetric() {
        let curve =
            theoretical_curve(TheoreticalDistribution::StudentT { degrees_of_freedom: 10 }).unwrap();
        let first = curve.y[0].value().unwrap();
        let last = curve.y[CURVE_POINTS - 1].value().unwrap();
        assert_abs_diff_eq!(first, last, epsilon = 1e-12);
        assert_eq!(curve.degrees_of_freedom, Some(10));
        assert!(curve.description.contains("10 degrees of freedom"));
    }

    #[test]
    fn test_chi_square_one_df_never_leaks_infinity() {
        let curve =
            theoretical_curve(TheoreticalDistribution::ChiSquare { degrees_of_freedom: 1 }).unwrap();
        assert_eq!(curve.x[0], 0.0);
        // The density has a pole at 0; it must come out as a marker, not inf.
        let json = serde_json::to_string(&curve).unwrap();
        assert!(!json.contains("inf") && !json.contains("NaN"));
        assert!(curve.y[1..].iter().all(|m| m.is_available()));
        assert!(curve.y[1].value().unwrap() > curve.y[10].value().unwrap());
    }

    #[test]
    fn test_degrees_of_freedom_range() {
        for dist in [
            TheoreticalDistribution::StudentT { degrees_of_freedom: 0 },
            TheoreticalDistribution::StudentT { degrees_of_freedom: 101 },
            TheoreticalDistribution::ChiSquare { degrees_of_freedom: 51 },
            TheoreticalDistribution::ChiSquare { degrees_of_freedom: -2 },
        ] {
            let err = theoretical_curve(dist).unwrap_err();
            assert_eq!(err.kind(), "invalid_parameter");
        }
        assert!(theoretical_curve(TheoreticalDistribution::ChiSquare { degrees_of_freedom: 50 }).is_ok());
    }
}
