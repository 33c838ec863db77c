use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::StatsError;

// ---------------------------------------------------------------------------
// Column – the closed allow-list of numeric fields
// ---------------------------------------------------------------------------

/// A numeric field of the athlete table the engine may operate on.
///
/// Anything outside this set is rejected at the boundary with
/// [`StatsError::InvalidColumn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Age,
    Height,
    Weight,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Age, Column::Height, Column::Weight];

    /// Header name used by the source table and on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Column::Age => "Age",
            Column::Height => "Height",
            Column::Weight => "Weight",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Column::Age => "years",
            Column::Height => "cm",
            Column::Weight => "kg",
        }
    }

    /// Decimal places used for bin labels and percentile values.
    /// Ages are whole numbers; body measurements keep one decimal.
    pub fn precision(self) -> usize {
        match self {
            Column::Age => 0,
            Column::Height | Column::Weight => 1,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Column {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StatsError::InvalidColumn(s.to_string()))
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Observation – one row of the source table
// ---------------------------------------------------------------------------

/// A single athlete record restricted to the allow-listed fields.
/// `None` marks a missing cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observation {
    pub age: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl Observation {
    pub fn new(age: Option<f64>, height: Option<f64>, weight: Option<f64>) -> Self {
        Observation {
            age,
            height,
            weight,
        }
    }

    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Age => self.age,
            Column::Height => self.height,
            Column::Weight => self.weight,
        }
    }
}

// ---------------------------------------------------------------------------
// ObservationTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The immutable in-memory table, stored column-wise.
///
/// Built once by the loader and then only ever read; callers share it behind
/// an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    columns: BTreeMap<Column, Vec<Option<f64>>>,
    rows: usize,
}

impl ObservationTable {
    /// Build the column store from loaded rows.
    ///
    /// Non-finite cells (NaN, ±inf) are stored as missing.
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        let rows = observations.len();
        let columns = Column::ALL
            .into_iter()
            .map(|col| {
                let values = observations
                    .iter()
                    .map(|obs| obs.get(col).filter(|v| v.is_finite()))
                    .collect();
                (col, values)
            })
            .collect();
        ObservationTable { columns, rows }
    }

    /// Raw values of a column, missing entries included.
    pub fn column(&self, column: Column) -> &[Option<f64>] {
        self.columns
            .get(&column)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn missing_count(&self, column: Column) -> usize {
        self.column(column).iter().filter(|v| v.is_none()).count()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
