/// Data layer: core types, loading, and missing-value removal.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → ObservationTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ ObservationTable │  column store, Option<f64> per cell
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop missing cells → cleaned series / joint pairs
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;

pub use model::{Column, Observation, ObservationTable};
