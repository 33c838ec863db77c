//! Statistics engine over an athlete observation table (Age, Height, Weight).
//!
//! Each operation is a pure function of its parameters and a shared,
//! read-only [`ObservationTable`]. The [`query`] module maps named
//! operations to engine calls and renders results as JSON.

pub mod config;
pub mod data;
pub mod error;
pub mod query;
pub mod regression;
pub mod sampling;
pub mod stats;

pub use data::{Column, Observation, ObservationTable};
pub use error::{StatsError, StatsResult};
pub use stats::Measure;
