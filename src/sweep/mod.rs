//! Parameter sweeps over a base [`crate::config::ScenarioConfig`].

pub mod driver;

pub use driver::{MetricSpec, SweepAxis, SweepJobError, SweepOutcome, SweepSettings, run_sweep};
