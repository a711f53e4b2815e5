//! Error types for configuration validation and simulation execution.
//!
//! Hand-rolled rather than derive-macro based, matching the existing
//! `ConfigError` convention this crate's configuration layer already uses.

use std::fmt;

/// A single configuration problem, tied to the offending field path.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while a simulation is constructed or run.
///
/// `ConfigError` is validated up front and never appears here — by the
/// time a `Simulation` exists, its configuration is already known-good.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// The requested run length exceeds a loaded trace (irradiance, TEG).
    TraceOutOfRange { component: String, message: String },
    /// A load's internal state machine received an event it cannot handle.
    StateMachineViolation { load: String, message: String },
    /// The engine advanced time past a scheduled event. Indicates a bug in
    /// `compute_next_update`, never a user-data problem.
    ThresholdCrossingMiss { at_tick: i64, expected_at: i64 },
    /// A required on-disk data file (trace, LUT) was missing at construction.
    DataFileMissing { path: String },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraceOutOfRange { component, message } => {
                write!(f, "trace out of range in {component}: {message}")
            }
            Self::StateMachineViolation { load, message } => {
                write!(f, "state machine violation in {load}: {message}")
            }
            Self::ThresholdCrossingMiss { at_tick, expected_at } => write!(
                f,
                "threshold crossing missed: engine at tick {at_tick} but event was due at {expected_at}"
            ),
            Self::DataFileMissing { path } => write!(f, "data file missing: {path}"),
        }
    }
}

impl std::error::Error for SimError {}
