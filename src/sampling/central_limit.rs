use std::fmt;
use std::str::FromStr;

use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Exp, Uniform};
use serde::Serialize;

use crate::error::{StatsError, StatsResult};
use crate::stats::descriptive::{mean, sample_std};
use crate::stats::measure::Measure;

/// Size of every generated population.
pub const POPULATION_SIZE: usize = 10_000;

/// Largest accepted number of sample means.
pub const MAX_SAMPLE_COUNT: i64 = 100_000;

/// Largest accepted size of one sample.
pub const MAX_SAMPLE_SIZE: i64 = 100_000;

/// Upper bound on `sample_count * sample_size` population draws.
pub const MAX_TOTAL_DRAWS: usize = 10_000_000;

const UNIFORM_UPPER: f64 = 10.0;
const EXPONENTIAL_MEAN: f64 = 3.0;

// ---------------------------------------------------------------------------
// Population generators
// ---------------------------------------------------------------------------

/// Generator used for the synthetic population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopulationKind {
    /// Uniform over `[0, 10]`.
    Uniform,
    /// Exponential with mean 3.
    Exponential,
}

impl fmt::Display for PopulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationKind::Uniform => f.write_str("uniform"),
            PopulationKind::Exponential => f.write_str("exponential"),
        }
    }
}

impl FromStr for PopulationKind {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(PopulationKind::Uniform),
            "exponential" => Ok(PopulationKind::Exponential),
            other => Err(StatsError::invalid_parameter(
                "distribution",
                format!("expected uniform or exponential, got '{other}'"),
            )),
        }
    }
}

impl PopulationKind {
    fn generate<R: Rng>(self, size: usize, rng: &mut R) -> StatsResult<Vec<f64>> {
        let population = match self {
            PopulationKind::Uniform => {
                let dist = Uniform::new_inclusive(0.0, UNIFORM_UPPER).map_err(bad_distribution)?;
                (0..size).map(|_| dist.sample(rng)).collect()
            }
            PopulationKind::Exponential => {
                let dist = Exp::new(1.0 / EXPONENTIAL_MEAN).map_err(bad_distribution)?;
                (0..size).map(|_| dist.sample(rng)).collect()
            }
        };
        Ok(population)
    }
}

// ---------------------------------------------------------------------------
// SampleDraw
// ---------------------------------------------------------------------------

/// A population, the means of repeated samples drawn from it, and the
/// moments of both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleDraw {
    pub distribution: PopulationKind,
    pub sample_count: usize,
    pub sample_size: usize,
    pub population: Vec<f64>,
    pub sample_means: Vec<f64>,
    pub population_mean: Measure,
    pub population_std: Measure,
    pub sample_mean_mean: Measure,
    pub sample_mean_std: Measure,
}

/// Central-limit demonstration drawn from the thread-local generator.
///
/// Output varies from call to call.
pub fn central_limit(
    kind: PopulationKind,
    sample_count: i64,
    sample_size: i64,
) -> StatsResult<SampleDraw> {
    central_limit_with_rng(kind, sample_count, sample_size, &mut rand::rng())
}

/// Central-limit demonstration drawn from `rng`.
///
/// Samples are taken with replacement from the population.
pub fn central_limit_with_rng<R: Rng>(
    kind: PopulationKind,
    sample_count: i64,
    sample_size: i64,
    rng: &mut R,
) -> StatsResult<SampleDraw> {
    let sample_count = bounded("sample_count", sample_count, MAX_SAMPLE_COUNT)?;
    let sample_size = bounded("sample_size", sample_size, MAX_SAMPLE_SIZE)?;
    match sample_count.checked_mul(sample_size) {
        Some(total) if total <= MAX_TOTAL_DRAWS => {}
        _ => {
            return Err(StatsError::invalid_parameter(
                "sample_size",
                format!(
                    "{sample_count} samples of size {sample_size} exceed {MAX_TOTAL_DRAWS} draws"
                ),
            ));
        }
    }

    let population = kind.generate(POPULATION_SIZE, rng)?;

    let sample_means: Vec<f64> = (0..sample_count)
        .map(|_| {
            let total: f64 = (0..sample_size)
                .map(|_| population[rng.random_range(0..population.len())])
                .sum();
            total / sample_size as f64
        })
        .collect();

    debug!(
        "central limit: {kind} population, {sample_count} samples of size {sample_size}"
    );

    Ok(SampleDraw {
        distribution: kind,
        sample_count,
        sample_size,
        population_mean: Measure::from_f64(mean(&population)),
        population_std: Measure::from_f64(sample_std(&population)),
        sample_mean_mean: Measure::from_f64(mean(&sample_means)),
        sample_mean_std: Measure::from_f64(sample_std(&sample_means)),
        population,
        sample_means,
    })
}

fn bad_distribution(e: impl fmt::Display) -> StatsError {
    StatsError::invalid_parameter("distribution", e.to_string())
}

fn bounded(name: &str, value: i64, max: i64) -> StatsResult<usize> {
    if !(1..=max).contains(&value) {
        return Err(StatsError::invalid_parameter(
            name,
            format!("must be an integer between 1 and {max}, got {value}"),
        ));
    }
    usize::try_from(value).map_err(|e| StatsError::invalid_parameter(name, e.to_string()))
}
