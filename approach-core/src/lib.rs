//! approach-core: flight/weather geometry and classification kernel.
//!
//! No async, no network; just algorithms. Feed adapters live in
//! `approach-feeds`; the CLI, monitor loop, and report writers live in
//! `approach-server`.

pub mod arrival;
pub mod classify;
pub mod config;
pub mod decision;
pub mod echo;
pub mod estimate;
pub mod geo;
pub mod metar;
pub mod radar;
pub mod stats;
pub mod types;
pub mod wind;

// Re-export commonly used types at crate root
pub use arrival::{is_arrival, ArrivalCriteria};
pub use classify::{AirportProfile, Classifier, CycleOutcome, FlightClassification};
pub use decision::{ComplianceLabel, ObservedDecision};
pub use echo::{EchoCategory, RecommendedAction, WeatherSample};
pub use estimate::{IntensityEstimator, WeatherSource};
pub use stats::AvoidanceStats;
pub use types::*;
