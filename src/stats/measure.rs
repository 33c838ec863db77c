use std::fmt;

use serde::{Serialize, Serializer};

/// Wire marker for a statistic that could not be computed.
pub const UNAVAILABLE: &str = "unavailable";

/// A statistic that is either a finite number or explicitly unavailable.
///
/// NaN and ±inf never leave the engine: [`Measure::from_f64`] folds them into
/// [`Measure::Unavailable`], which serializes as the string `"unavailable"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Value(f64),
    Unavailable,
}

impl Measure {
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Measure::Value(v)
        } else {
            Measure::Unavailable
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Measure::Value(v) => Some(v),
            Measure::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Measure::Value(_))
    }

    /// Apply `f` to an available value, re-checking finiteness of the result.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Measure::Value(v) => Measure::from_f64(f(v)),
            Measure::Unavailable => Measure::Unavailable,
        }
    }
}

impl From<f64> for Measure {
    fn from(v: f64) -> Self {
        Measure::from_f64(v)
    }
}

impl From<Option<f64>> for Measure {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Measure::Unavailable, Measure::from_f64)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Value(v) => write!(f, "{v}"),
            Measure::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measure::Value(v) => serializer.serialize_f64(*v),
            Measure::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

/// Convert a slice of raw numbers into measures.
pub fn measures(values: &[f64]) -> Vec<Measure> {
    values.iter().copied().map(Measure::from_f64).collect()
}

/// Round half away from zero to `decimals` places.
pub fn round_to(v: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (v * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_becomes_unavailable() {
        assert_eq!(Measure::from_f64(f64::NAN), Measure::Unavailable);
        assert_eq!(Measure::from_f64(f64::INFINITY), Measure::Unavailable);
        assert_eq!(Measure::from_f64(-1.5), Measure::Value(-1.5));
        assert_eq!(Measure::from(None), Measure::Unavailable);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&vec![Measure::Value(2.5), Measure::Unavailable]).unwrap();
        assert_eq!(json, r#"[2.5,"unavailable"]"#);
    }

    #[test]
    fn test_map_rechecks_finiteness() {
        assert_eq!(Measure::Value(0.0).map(|v| 1.0 / v), Measure::Unavailable);
        assert_eq!(Measure::Value(4.0).map(f64::sqrt), Measure::Value(2.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(0.123456, 4), 0.1235);
    }
}
