use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::error::{StatsError, StatsResult};
use crate::stats::descriptive::pearson;
use crate::stats::measure::{Measure, round_to};

/// Seed for the demonstration pair. Output must be reproducible run to run.
pub const DEMO_SEED: u64 = 42;
pub const DEMO_POINTS: usize = 100;

const X_MEAN: f64 = 50.0;
const X_STD: f64 = 10.0;
const SLOPE: f64 = 2.0;
const NOISE_STD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrelationStrength {
    #[serde(rename = "strong positive")]
    StrongPositive,
    #[serde(rename = "moderate positive")]
    ModeratePositive,
    #[serde(rename = "strong negative")]
    StrongNegative,
    #[serde(rename = "moderate negative")]
    ModerateNegative,
    #[serde(rename = "weak or none")]
    WeakOrNone,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> Self {
        if r >= 0.7 {
            CorrelationStrength::StrongPositive
        } else if r >= 0.3 {
            CorrelationStrength::ModeratePositive
        } else if r <= -0.7 {
            CorrelationStrength::StrongNegative
        } else if r <= -0.3 {
            CorrelationStrength::ModerateNegative
        } else {
            CorrelationStrength::WeakOrNone
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationDemo {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Pearson r, rounded to 4 decimals.
    pub correlation: Measure,
    pub interpretation: CorrelationStrength,
}

/// Fixed-seed pair `x ~ N(50, 10)`, `y = 2x + N(0, 10)` and its Pearson r.
///
/// Uses its own generator so other stochastic operations are unaffected.
pub fn correlation_demo() -> StatsResult<CorrelationDemo> {
    let mut rng = StdRng::seed_from_u64(DEMO_SEED);
    let x_dist = Normal::new(X_MEAN, X_STD).map_err(bad_normal)?;
    let noise = Normal::new(0.0, NOISE_STD).map_err(bad_normal)?;

    let x: Vec<f64> = (0..DEMO_POINTS).map(|_| x_dist.sample(&mut rng)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&xi| SLOPE * xi + noise.sample(&mut rng))
        .collect();

    let r = pearson(&x, &y);
    Ok(CorrelationDemo {
        correlation: Measure::from_f64(r).map(|v| round_to(v, 4)),
        interpretation: CorrelationStrength::classify(r),
        x,
        y,
    })
}

fn bad_normal(e: rand_distr::NormalError) -> StatsError {
    StatsError::invalid_parameter("normal", e.to_string())
}
