//! Per-step scratch state and run-level settings for the engine.

/// Engine-wide settings that don't belong to any single component.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Seconds per integer tick. All component timers operate in ticks;
    /// this is the only place wall-clock seconds enter the core loop.
    pub dt_base: f64,
    /// Upper bound on a single step, in ticks. Caps the gap between
    /// observations when no component reports a nearer event.
    pub max_step: i64,
    /// Emit a log row on every step regardless of whether a watched field
    /// changed (useful for dense plotting, costly for long runs).
    pub force_log: bool,
}

impl EngineConfig {
    pub fn new(dt_base: f64, max_step_seconds: f64, force_log: bool) -> Self {
        let max_step = (max_step_seconds / dt_base).max(1.0) as i64;
        Self {
            dt_base,
            max_step,
            force_log,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(1e-6, 1e-3, false)
    }
}

/// Snapshot of the electrical mixing network computed once per step, kept
/// around for logging and for the tests that check the power balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepResult {
    pub t: i64,
    pub dt: i64,
    pub v_cap: f64,
    pub v_in: f64,
    pub i_in: f64,
    pub eta_in: f64,
    pub v_out: f64,
    pub i_out: f64,
    pub eta_out: f64,
    pub i_leak: f64,
    pub i_net: f64,
}
