//! Distribution sampling: synthetic populations and theoretical curves.
//!
//! None of these operations read the observation table.

pub mod central_limit;
pub mod correlation;
pub mod curves;

pub use central_limit::{PopulationKind, SampleDraw, central_limit, central_limit_with_rng};
pub use correlation::{CorrelationDemo, CorrelationStrength, correlation_demo};
pub use curves::{Curve, TheoreticalDistribution, theoretical_curve};
