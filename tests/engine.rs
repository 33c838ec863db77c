use std::path::PathBuf;

use approx::assert_relative_eq;
use athlete_stats::data::loader::load_file;
use athlete_stats::query::QueryEngine;
use athlete_stats::regression::exponential::SUBSAMPLE_CAP;
use athlete_stats::regression::{fit_exponential, fit_linear};
use athlete_stats::sampling::{PopulationKind, central_limit, correlation_demo};
use athlete_stats::stats::{
    SkewShape, compute_asymmetry, compute_histogram, compute_percentiles, compute_summary,
};
use athlete_stats::{Column, Measure, Observation, ObservationTable};
use tempfile::TempDir;

const CSV: &str = "\
ID,Name,Sex,Age,Height,Weight,Sport
1,A,M,24,180.0,80.0,Basketball
2,B,F,23,170.0,NA,Judo
3,C,M,,175.5,72.5,Rowing
4,D,F,31,162.0,55.0,Gymnastics
5,E,M,28,,90.0,Rowing
6,F,F,19,168.5,60.5,Swimming
7,G,M,35,185.0,95.0,Weightlifting
8,H,F,22,158.0,50.0,Gymnastics
";

fn write_csv(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("athlete_events.csv");
    std::fs::write(&path, CSV).unwrap();
    path
}

fn linear_table(n: usize, slope: f64, intercept: f64) -> ObservationTable {
    let rows = (0..n)
        .map(|i| {
            let h = 150.0 + i as f64;
            Observation::new(Some(20.0), Some(h), Some(slope * h + intercept))
        })
        .collect();
    ObservationTable::from_observations(rows)
}

#[test]
fn test_csv_load_and_histogram_counts() {
    let dir = TempDir::new().unwrap();
    let table = load_file(&write_csv(&dir)).unwrap();

    assert_eq!(table.len(), 8);
    assert_eq!(table.missing_count(Column::Age), 1);
    assert_eq!(table.missing_count(Column::Height), 1);
    assert_eq!(table.missing_count(Column::Weight), 1);

    for column in Column::ALL {
        let present = table.len() - table.missing_count(column);
        for bins in [1, 3, 7] {
            let hist = compute_histogram(&table, column, bins).unwrap();
            assert_eq!(hist.counts.len(), bins as usize);
            assert_eq!(hist.counts.iter().sum::<usize>(), present);
        }
    }
}

#[test]
fn test_median_matches_fiftieth_percentile() {
    let dir = TempDir::new().unwrap();
    let table = load_file(&write_csv(&dir)).unwrap();

    let percentiles = compute_percentiles(&table, Column::Height).unwrap();
    let p50 = percentiles.percentiles.iter().position(|&p| p == 50).unwrap();

    // Every column requested, so rows missing Age or Weight do not shrink Height.
    let summary = compute_summary(&table, &Column::ALL).unwrap();
    let median = summary.statistics[&Column::Height].median.value().unwrap();

    assert_relative_eq!(percentiles.values[p50], median, epsilon = 1e-9);
    assert_relative_eq!(median, 170.0, epsilon = 1e-9);
    assert_eq!(percentiles.values.first(), Some(&158.0));
    assert_eq!(percentiles.values.last(), Some(&185.0));
}

#[test]
fn test_column_outside_allow_list_is_invalid_column() {
    assert_eq!("Sport".parse::<Column>().unwrap_err().kind(), "invalid_column");

    let dir = TempDir::new().unwrap();
    let mut engine = QueryEngine::new(write_csv(&dir));
    for op in ["histogram", "percentiles", "dispersion", "asymmetry", "kurtosis"] {
        let response = engine.respond(op, &["column=Sport"]).unwrap();
        assert!(!response.ok);
        assert_eq!(response.body["error"], "invalid_column", "{op}");
    }
}

#[test]
fn test_end_to_end_query_over_csv() {
    let dir = TempDir::new().unwrap();
    let mut engine = QueryEngine::new(write_csv(&dir));

    let response = engine.respond("dispersion", &["column=Weight"]).unwrap();
    assert!(response.ok);
    assert_eq!(response.body["column"], "Weight");
    assert_eq!(response.body["unit"], "kg");
    assert_relative_eq!(response.body["amplitude"].as_f64().unwrap(), 45.0, epsilon = 1e-12);

    let response = engine.respond("percentiles", &["column=Height"]).unwrap();
    assert!(response.ok);
    assert_eq!(response.body["values"][0], 158.0);
}

#[test]
fn test_nonlinear_regression_over_realistic_csv() {
    // Weight follows a body-mass index near 22 with a deterministic wobble.
    let mut csv = String::from("ID,Sex,Age,Height,Weight\n");
    for i in 0..200 {
        let height = 150.0 + i as f64 * 0.25;
        let weight = 22.0 * (height / 100.0).powi(2) + 3.0 * (i as f64).sin();
        let age = if i % 17 == 0 { String::new() } else { (18 + i % 20).to_string() };
        csv.push_str(&format!("{},M,{age},{height:.2},{weight:.2}\n", i + 1));
    }
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("athlete_events.csv");
    std::fs::write(&path, csv).unwrap();

    let mut engine = QueryEngine::new(path);
    let response = engine.respond::<&str>("nonlinear_regression", &[]).unwrap();
    assert!(response.ok, "{}", response.body);

    let a = response.body["a"].as_f64().unwrap();
    let b = response.body["b"].as_f64().unwrap();
    assert!(a > 0.0 && b > 0.0);
    assert!(response.body["r2"].as_f64().unwrap() > 0.9);
    assert_eq!(response.body["x"].as_array().unwrap().len(), 200);

    let comparisons = response.body["comparisons"].as_array().unwrap();
    assert!(!comparisons.is_empty());
    let rmse: Vec<f64> = comparisons.iter().map(|c| c["rmse"].as_f64().unwrap()).collect();
    assert!(rmse.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(comparisons[0]["method"], response.body["method"]);
}

#[test]
fn test_exponential_regression_subsamples_large_tables() {
    let rows = (0..6_000)
        .map(|i| {
            let age = i as f64 * 0.005;
            Observation::new(Some(age), None, Some(2.0 * (0.05 * age).exp()))
        })
        .collect();
    let table = ObservationTable::from_observations(rows);

    let fit = fit_exponential(&table, Column::Age, Column::Weight).unwrap();
    assert_eq!(fit.x.len(), SUBSAMPLE_CAP);
    assert_eq!(fit.y_real.len(), SUBSAMPLE_CAP);
    assert!(fit.x.windows(2).all(|w| w[0] < w[1]));
    assert_relative_eq!(fit.a, 2.0, epsilon = 1e-3);
    assert_relative_eq!(fit.b, 0.05, epsilon = 1e-5);

    let again = fit_exponential(&table, Column::Age, Column::Weight).unwrap();
    assert_eq!(fit.x, again.x);
}

#[test]
fn test_linear_regression_recovers_line() {
    let table = linear_table(40, 3.0, 2.0);
    let fit = fit_linear(&table, Column::Height, Column::Weight).unwrap();

    assert_relative_eq!(fit.slope.value().unwrap(), 3.0, epsilon = 1e-9);
    assert_relative_eq!(fit.intercept.value().unwrap(), 2.0, epsilon = 1e-6);
    assert_relative_eq!(fit.r2.value().unwrap(), 1.0, epsilon = 1e-12);
    assert_eq!(fit.y_pred.len(), 40);
}

#[test]
fn test_exponential_regression_over_table() {
    let rows = (0..60)
        .map(|i| {
            let age = 15.0 + i as f64 * 0.5;
            Observation::new(Some(age), None, Some(2.0 * (0.05 * age).exp()))
        })
        .collect();
    let table = ObservationTable::from_observations(rows);

    let fit = fit_exponential(&table, Column::Age, Column::Weight).unwrap();
    assert_relative_eq!(fit.a, 2.0, epsilon = 1e-3);
    assert_relative_eq!(fit.b, 0.05, epsilon = 1e-5);
    assert!(fit.r2.value().unwrap() > 0.9999);
    assert_eq!(fit.comparisons[0].method, fit.method);

    // Height is entirely missing.
    let err = fit_exponential(&table, Column::Height, Column::Weight).unwrap_err();
    assert_eq!(err.kind(), "no_valid_data");
}

#[test]
fn test_correlation_demo_is_reproducible() {
    let first = correlation_demo().unwrap();
    let second = correlation_demo().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.x.len(), 100);
    assert_eq!(
        serde_json::to_value(&first).unwrap()["interpretation"],
        "strong positive"
    );
}

#[test]
fn test_central_limit_spread_shrinks() {
    for kind in [PopulationKind::Uniform, PopulationKind::Exponential] {
        for _ in 0..5 {
            let draw = central_limit(kind, 200, 30).unwrap();
            let population_std = draw.population_std.value().unwrap();
            let spread = draw.sample_mean_std.value().unwrap();
            assert!(spread < population_std);
            // Expected ratio is 1/sqrt(30) ≈ 0.18.
            assert!(spread / population_std < 0.35);
        }
    }
}

#[test]
fn test_skewed_column_reads_positive() {
    let rows = [1.0, 2.0, 3.0, 10.0]
        .into_iter()
        .map(|w| Observation::new(None, None, Some(w)))
        .collect();
    let table = ObservationTable::from_observations(rows);
    let asym = compute_asymmetry(&table, Column::Weight).unwrap();
    assert_eq!(asym.skewness, Measure::Value(1.7636));
    assert_eq!(asym.interpretation, SkewShape::Positive);
}
