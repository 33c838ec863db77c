use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use log::debug;
use serde::Serialize;
use serde_json::{Value, json};

use crate::data::loader::load_shared;
use crate::data::model::{Column, ObservationTable};
use crate::error::{StatsError, StatsResult};
use crate::regression::{fit_exponential, fit_linear};
use crate::sampling::{PopulationKind, TheoreticalDistribution, central_limit, correlation_demo, theoretical_curve};
use crate::stats::{
    compute_asymmetry, compute_dispersion, compute_histogram, compute_kurtosis, compute_percentiles,
    compute_summary,
};

pub const DEFAULT_BINS: i64 = 10;
pub const DEFAULT_SAMPLE_COUNT: i64 = 1000;
pub const DEFAULT_SAMPLE_SIZE: i64 = 30;
pub const DEFAULT_T_DF: i64 = 10;
pub const DEFAULT_CHI_SQUARE_DF: i64 = 4;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// `key=value` parameters of one request.
///
/// Keys match regardless of case, `_` and `-`, so `sampleCount`,
/// `sample_count` and `sample-count` name the same parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn parse<I, S>(pairs: I) -> StatsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(StatsError::invalid_parameter(
                    pair,
                    "expected key=value",
                ));
            };
            map.insert(normalize(key), value.trim().to_string());
        }
        Ok(Params(map))
    }

    /// First value present under any of `keys`.
    fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.0.get(&normalize(k)))
            .map(String::as_str)
    }

    fn parsed<T>(&self, keys: &[&str], default: T) -> StatsResult<T>
    where
        T: FromStr<Err = StatsError>,
    {
        self.get(keys).map_or(Ok(default), str::parse)
    }

    fn int(&self, keys: &[&str], default: i64) -> StatsResult<i64> {
        match self.get(keys) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                StatsError::invalid_parameter(keys[0], format!("expected an integer, got '{raw}'"))
            }),
        }
    }

    fn columns(&self, keys: &[&str]) -> StatsResult<Vec<Column>> {
        match self.get(keys) {
            None => Ok(Column::ALL.to_vec()),
            Some(raw) => raw.split(',').map(str::parse).collect(),
        }
    }
}

fn normalize(key: &str) -> String {
    key.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// A named engine operation with its resolved parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Summary { columns: Vec<Column> },
    Histogram { column: Column, bins: i64 },
    Percentiles { column: Column },
    Dispersion { column: Column },
    Asymmetry { column: Column },
    Kurtosis { column: Column },
    CentralLimit { distribution: PopulationKind, sample_count: i64, sample_size: i64 },
    CorrelationDemo,
    TheoreticalSample { distribution: TheoreticalDistribution },
    TStudentCurve { degrees_of_freedom: i64 },
    ChiSquareCurve { degrees_of_freedom: i64 },
    LinearRegression { x: Column, y: Column },
    NonlinearRegression { x: Column, y: Column },
}

pub const OPERATION_NAMES: [&str; 13] = [
    "summary",
    "histogram",
    "percentiles",
    "dispersion",
    "asymmetry",
    "kurtosis",
    "central_limit",
    "correlation_demo",
    "theoretical_sample",
    "t_student_curve",
    "chi_square_curve",
    "linear_regression",
    "nonlinear_regression",
];

impl Operation {
    /// Resolve `name` and its parameters, filling in defaults.
    pub fn parse(name: &str, params: &Params) -> StatsResult<Self> {
        let column = || params.parsed(&["column"], Column::Height);
        let x = || params.parsed(&["xColumn", "x"], Column::Height);
        let y = || params.parsed(&["yColumn", "y"], Column::Weight);
        let df = |default| params.int(&["degreesOfFreedom", "df"], default);

        let op = match normalize(name).as_str() {
            "summary" => Operation::Summary {
                columns: params.columns(&["columns"])?,
            },
            "histogram" => Operation::Histogram {
                column: column()?,
                bins: params.int(&["bins", "binCount"], DEFAULT_BINS)?,
            },
            "percentiles" => Operation::Percentiles { column: column()? },
            "dispersion" => Operation::Dispersion { column: column()? },
            "asymmetry" => Operation::Asymmetry { column: column()? },
            "kurtosis" => Operation::Kurtosis { column: column()? },
            "centrallimit" => Operation::CentralLimit {
                distribution: params.parsed(&["distribution"], PopulationKind::Uniform)?,
                sample_count: params.int(&["sampleCount"], DEFAULT_SAMPLE_COUNT)?,
                sample_size: params.int(&["sampleSize"], DEFAULT_SAMPLE_SIZE)?,
            },
            "correlationdemo" => Operation::CorrelationDemo,
            "theoreticalsample" => Operation::TheoreticalSample {
                distribution: params.parsed(&["distribution"], TheoreticalDistribution::Normal)?,
            },
            "tstudentcurve" => Operation::TStudentCurve {
                degrees_of_freedom: df(DEFAULT_T_DF)?,
            },
            "chisquarecurve" => Operation::ChiSquareCurve {
                degrees_of_freedom: df(DEFAULT_CHI_SQUARE_DF)?,
            },
            "linearregression" => Operation::LinearRegression { x: x()?, y: y()? },
            "nonlinearregression" => Operation::NonlinearRegression { x: x()?, y: y()? },
            _ => {
                return Err(StatsError::invalid_parameter(
                    "operation",
                    format!("unknown operation '{name}', expected one of {}", OPERATION_NAMES.join(", ")),
                ));
            }
        };
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Summary { .. } => "summary",
            Operation::Histogram { .. } => "histogram",
            Operation::Percentiles { .. } => "percentiles",
            Operation::Dispersion { .. } => "dispersion",
            Operation::Asymmetry { .. } => "asymmetry",
            Operation::Kurtosis { .. } => "kurtosis",
            Operation::CentralLimit { .. } => "central_limit",
            Operation::CorrelationDemo => "correlation_demo",
            Operation::TheoreticalSample { .. } => "theoretical_sample",
            Operation::TStudentCurve { .. } => "t_student_curve",
            Operation::ChiSquareCurve { .. } => "chi_square_curve",
            Operation::LinearRegression { .. } => "linear_regression",
            Operation::NonlinearRegression { .. } => "nonlinear_regression",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Rendered answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// `false` when `body` is an `{error, message}` object.
    pub ok: bool,
    pub body: Value,
}

/// Routes operations to the engine; loads the table on first use.
pub struct QueryEngine {
    data_path: PathBuf,
    table: Option<Arc<ObservationTable>>,
}

impl QueryEngine {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            table: None,
        }
    }

    /// Engine over an already loaded table.
    pub fn with_table(table: Arc<ObservationTable>) -> Self {
        Self {
            data_path: PathBuf::new(),
            table: Some(table),
        }
    }

    fn table(&mut self) -> Result<Arc<ObservationTable>> {
        if let Some(table) = &self.table {
            return Ok(Arc::clone(table));
        }
        let table = load_shared(&self.data_path)?;
        self.table = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Parse and run a request.
    ///
    /// Engine errors come back as an error body; only failures to load the
    /// dataset or to serialize are returned as `Err`.
    pub fn respond<S: AsRef<str>>(&mut self, name: &str, params: &[S]) -> Result<Response> {
        let parsed = Params::parse(params).and_then(|p| Operation::parse(name, &p));
        let outcome = match parsed {
            Ok(op) => self.execute(&op),
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok(body) => Ok(Response { ok: true, body }),
            Err(e) => match e.downcast::<StatsError>() {
                Ok(stats_error) => Ok(Response {
                    ok: false,
                    body: error_body(&stats_error),
                }),
                Err(e) => Err(e),
            },
        }
    }

    pub fn execute(&mut self, op: &Operation) -> Result<Value> {
        debug!("executing {op}");
        match op {
            Operation::Summary { columns } => to_json(compute_summary(&*self.table()?, columns)?),
            Operation::Histogram { column, bins } => {
                to_json(compute_histogram(&*self.table()?, *column, *bins)?)
            }
            Operation::Percentiles { column } => to_json(compute_percentiles(&*self.table()?, *column)?),
            Operation::Dispersion { column } => to_json(compute_dispersion(&*self.table()?, *column)?),
            Operation::Asymmetry { column } => to_json(compute_asymmetry(&*self.table()?, *column)?),
            Operation::Kurtosis { column } => to_json(compute_kurtosis(&*self.table()?, *column)?),
            Operation::CentralLimit {
                distribution,
                sample_count,
                sample_size,
            } => to_json(central_limit(*distribution, *sample_count, *sample_size)?),
            Operation::CorrelationDemo => to_json(correlation_demo()?),
            Operation::TheoreticalSample { distribution } => to_json(theoretical_curve(*distribution)?),
            Operation::TStudentCurve { degrees_of_freedom } => {
                to_json(theoretical_curve(TheoreticalDistribution::StudentT {
                    degrees_of_freedom: *degrees_of_freedom,
                })?)
            }
            Operation::ChiSquareCurve { degrees_of_freedom } => {
                to_json(theoretical_curve(TheoreticalDistribution::ChiSquare {
                    degrees_of_freedom: *degrees_of_freedom,
                })?)
            }
            Operation::LinearRegression { x, y } => to_json(fit_linear(&*self.table()?, *x, *y)?),
            Operation::NonlinearRegression { x, y } => to_json(fit_exponential(&*self.table()?, *x, *y)?),
        }
    }
}

fn to_json<T: Serialize>(result: T) -> Result<Value> {
    Ok(serde_json::to_value(result)?)
}

pub fn error_body(error: &StatsError) -> Value {
    json!({
        "error": error.kind(),
        "message": error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;

    fn table() -> Arc<ObservationTable> {
        let rows = (0..20)
            .map(|i| {
                let i = i as f64;
                Observation::new(Some(20.0 + i), Some(160.0 + i), Some(55.0 + 0.8 * i))
            })
            .collect();
        Arc::new(ObservationTable::from_observations(rows))
    }

    #[test]
    fn test_params_normalize_keys() {
        let params = Params::parse(["sample_count=5", "SampleSize=7"]).unwrap();
        assert_eq!(params.int(&["sampleCount"], 0).unwrap(), 5);
        assert_eq!(params.int(&["sampleSize"], 0).unwrap(), 7);
        assert_eq!(params.int(&["bins"], 10).unwrap(), 10);
    }

    #[test]
    fn test_params_reject_malformed_pairs() {
        let err = Params::parse(["bins"]).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");

        let params = Params::parse(["bins=ten"]).unwrap();
        assert_eq!(params.int(&["bins"], 10).unwrap_err().kind(), "invalid_parameter");
    }

    #[test]
    fn test_operation_defaults() {
        let empty = Params::default();
        assert_eq!(
            Operation::parse("histogram", &empty).unwrap(),
            Operation::Histogram { column: Column::Height, bins: 10 }
        );
        assert_eq!(
            Operation::parse("linearRegression", &empty).unwrap(),
            Operation::LinearRegression { x: Column::Height, y: Column::Weight }
        );
        assert_eq!(
            Operation::parse("chi_square_curve", &empty).unwrap(),
            Operation::ChiSquareCurve { degrees_of_freedom: 4 }
        );
        assert_eq!(
            Operation::parse("centralLimit", &empty).unwrap(),
            Operation::CentralLimit {
                distribution: PopulationKind::Uniform,
                sample_count: 1000,
                sample_size: 30,
            }
        );
    }

    #[test]
    fn test_unknown_operation_and_column() {
        let err = Operation::parse("median", &Params::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");

        let params = Params::parse(["column=Sport"]).unwrap();
        let err = Operation::parse("histogram", &params).unwrap_err();
        assert_eq!(err.kind(), "invalid_column");
    }

    #[test]
    fn test_operation_names_round_trip() {
        for name in OPERATION_NAMES {
            let op = Operation::parse(name, &Params::default()).unwrap();
            assert_eq!(op.to_string(), name);
        }
    }

    #[test]
    fn test_sampling_does_not_load_table() {
        let mut engine = QueryEngine::new("/nonexistent/athlete_events.csv");
        let response = engine.respond("t_student_curve", &["df=5"]).unwrap();
        assert!(response.ok);
        assert_eq!(response.body["degrees_of_freedom"], 5);

        // A table operation against the missing file is a load failure, not an error body.
        assert!(engine.respond("histogram", &["column=Age"]).is_err());
    }

    #[test]
    fn test_engine_errors_render_as_body() {
        let mut engine = QueryEngine::with_table(table());
        let response = engine.respond("histogram", &["bins=0"]).unwrap();
        assert!(!response.ok);
        assert_eq!(response.body["error"], "invalid_parameter");
        assert!(response.body["message"].as_str().unwrap().contains("bins"));
    }

    #[test]
    fn test_oversized_requests_render_as_body() {
        let mut engine = QueryEngine::with_table(table());
        let huge = format!("bins={}", i64::MAX);
        let response = engine.respond("histogram", &[huge.as_str()]).unwrap();
        assert!(!response.ok);
        assert_eq!(response.body["error"], "invalid_parameter");

        let huge = format!("sampleCount={}", i64::MAX);
        let response = engine.respond("central_limit", &[huge.as_str()]).unwrap();
        assert!(!response.ok);
        assert_eq!(response.body["error"], "invalid_parameter");
    }

    #[test]
    fn test_table_operations() {
        let mut engine = QueryEngine::with_table(table());

        let hist = engine.respond("histogram", &["column=Age", "bins=4"]).unwrap();
        assert!(hist.ok);
        let total: u64 = hist.body["counts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_u64().unwrap())
            .sum();
        assert_eq!(total, 20);

        let fit = engine.respond::<&str>("linear_regression", &[]).unwrap();
        assert!(fit.ok);
        let slope = fit.body["slope"].as_f64().unwrap();
        assert!((slope - 0.8).abs() < 1e-9);

        let summary = engine.respond("summary", &["columns=Age,Weight"]).unwrap();
        assert!(summary.ok);
        assert!(summary.body["statistics"]["Age"].is_object());
    }
}
