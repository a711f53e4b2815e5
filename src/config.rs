//! TOML-based scenario configuration: one tagged-union entry per component
//! family, plus engine-wide timing settings.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::components::{
    AdvancedJitLoad, Application, Artificial, ArtificialShape, Atomic, Bq25570, BuckBoost,
    BuckConverter, Capacitor, Computation, ConstantLoad, Converter, Diode, Harvester, Hysteresis,
    IdealCapacitor, IvCurve, JitLoad, Ldo, Load, SolarPanel, SteppedTrace, TantalumCapacitor,
    Task, TaskLoad, Teg,
};
use crate::error::ConfigError;
use crate::sim::EngineConfig;

/// Top-level scenario configuration parsed from TOML.
///
/// Load with [`ScenarioConfig::from_toml_file`] or pick a built-in preset
/// such as [`ScenarioConfig::diode_task_load`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSettings,
    pub capacitor: CapacitorConfig,
    pub harvester: HarvesterConfig,
    pub converter: ConverterConfig,
    pub load: LoadConfig,
}

/// Engine timing and run-length parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Seconds per integer tick.
    pub dt_base: f64,
    /// Upper bound on a single step, in seconds.
    pub max_step_seconds: f64,
    /// How long to simulate, in seconds.
    pub until_seconds: f64,
    /// Emit a log row on every step, not just on watched-field changes.
    pub force_log: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            dt_base: 1e-6,
            max_step_seconds: 1e-3,
            until_seconds: 10.0,
            force_log: false,
        }
    }
}

impl SimulationSettings {
    pub fn ticks(&self, seconds: f64) -> i64 {
        (seconds / self.dt_base).round() as i64
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.dt_base, self.max_step_seconds, self.force_log)
    }
}

/// `capacitor.type` / `capacitor.settings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "settings")]
pub enum CapacitorConfig {
    IdealCapacitor(IdealCapacitorSettings),
    TantalumCapacitor(TantalumCapacitorSettings),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdealCapacitorSettings {
    pub capacitance: f64,
    pub v_rated: f64,
    pub v_initial: f64,
}

impl Default for IdealCapacitorSettings {
    fn default() -> Self {
        Self {
            capacitance: 1e-4,
            v_rated: 3.3,
            v_initial: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TantalumCapacitorSettings {
    pub capacitance: f64,
    pub v_rated: f64,
    pub v_initial: f64,
}

impl Default for TantalumCapacitorSettings {
    fn default() -> Self {
        Self {
            capacitance: 3300e-6,
            v_rated: 10.0,
            v_initial: 0.0,
        }
    }
}

impl CapacitorConfig {
    fn build(&self) -> Capacitor {
        match self {
            Self::IdealCapacitor(s) => {
                Capacitor::Ideal(IdealCapacitor::new(s.capacitance, s.v_rated, s.v_initial))
            }
            Self::TantalumCapacitor(s) => {
                Capacitor::Tantalum(TantalumCapacitor::new(s.capacitance, s.v_rated, s.v_initial))
            }
        }
    }

    fn validate(&self, errors: &mut Vec<ConfigError>) {
        let (capacitance, v_rated, v_initial) = match self {
            Self::IdealCapacitor(s) => (s.capacitance, s.v_rated, s.v_initial),
            Self::TantalumCapacitor(s) => (s.capacitance, s.v_rated, s.v_initial),
        };
        if capacitance <= 0.0 {
            errors.push(ConfigError::new("capacitor.settings.capacitance", "must be > 0"));
        }
        if v_rated <= 0.0 {
            errors.push(ConfigError::new("capacitor.settings.v_rated", "must be > 0"));
        }
        if !(0.0..=v_rated).contains(&v_initial) {
            errors.push(ConfigError::new(
                "capacitor.settings.v_initial",
                "must be in [0, v_rated]",
            ));
        }
    }
}

/// `harvester.settings.shape` (Artificial only).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "shape")]
pub enum ArtificialShapeConfig {
    #[serde(rename = "const")]
    Const { i_high: f64 },
    #[serde(rename = "square")]
    Square {
        i_high: f64,
        i_low: f64,
        t_high_seconds: f64,
        period_seconds: f64,
    },
    #[serde(rename = "sine")]
    Sine { i_high: f64, period_seconds: f64 },
}

/// `harvester.type` / `harvester.settings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "settings")]
pub enum HarvesterConfig {
    Artificial(ArtificialSettings),
    #[serde(rename = "IVCurve")]
    IvCurve(IvCurveSettings),
    SolarPanel(SolarPanelSettings),
    #[serde(rename = "TEG")]
    Teg(TegSettings),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtificialSettings {
    #[serde(flatten)]
    pub shape: ArtificialShapeConfig,
    pub v_oc: f64,
    pub v_ov: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IvCurveSettings {
    /// Path to a JSON `{voltage: current}` table.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolarPanelSettings {
    /// Path to the irradiance time-series JSON (see the irradiance trace
    /// file format).
    pub irradiance_path: String,
    pub i_sc: f64,
    pub v_oc: f64,
    pub i_mpp: f64,
    pub v_mpp: f64,
    #[serde(default = "one")]
    pub cells_series: f64,
    #[serde(default = "one")]
    pub cells_parallel: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TegSettings {
    /// Path to the MPP-current trace.
    pub path: String,
}

impl HarvesterConfig {
    fn build(&self, dt: &SimulationSettings) -> Result<Harvester, ConfigError> {
        match self {
            Self::Artificial(s) => {
                let shape = match &s.shape {
                    ArtificialShapeConfig::Const { i_high } => ArtificialShape::Const { i_high: *i_high },
                    ArtificialShapeConfig::Square {
                        i_high,
                        i_low,
                        t_high_seconds,
                        period_seconds,
                    } => ArtificialShape::Square {
                        i_high: *i_high,
                        i_low: *i_low,
                        t_high: dt.ticks(*t_high_seconds),
                        period: dt.ticks(*period_seconds),
                    },
                    ArtificialShapeConfig::Sine { i_high, period_seconds } => ArtificialShape::Sine {
                        i_high: *i_high,
                        period: dt.ticks(*period_seconds),
                    },
                };
                Ok(Harvester::Artificial(Artificial {
                    shape,
                    v_oc: s.v_oc,
                    v_ov: s.v_ov,
                }))
            }
            Self::IvCurve(_) => Err(ConfigError::new(
                "harvester.settings.path",
                "IVCurve requires a loaded table; use io::trace::load_iv_curve and Harvester::IvCurve directly",
            )),
            Self::SolarPanel(s) => {
                let i_sc = s.i_sc * s.cells_parallel;
                let i_mpp = s.i_mpp * s.cells_parallel;
                let v_oc = s.v_oc * s.cells_series;
                let v_mpp = s.v_mpp * s.cells_series;
                let trace = SteppedTrace::new(vec![0, dt.ticks(dt.until_seconds)], vec![0.0, 0.0]);
                Ok(Harvester::SolarPanel(SolarPanel::new(i_sc, v_oc, i_mpp, v_mpp, trace)))
            }
            Self::Teg(_) => Err(ConfigError::new(
                "harvester.settings.path",
                "TEG requires a loaded trace; use io::trace::load_teg_trace and Harvester::Teg directly",
            )),
        }
    }

    fn validate(&self, errors: &mut Vec<ConfigError>) {
        if let Self::Artificial(s) = self {
            if s.v_ov <= 0.0 {
                errors.push(ConfigError::new("harvester.settings.v_ov", "must be > 0"));
            }
            if let ArtificialShapeConfig::Square { t_high_seconds, period_seconds, .. } = &s.shape {
                if *t_high_seconds >= *period_seconds {
                    errors.push(ConfigError::new(
                        "harvester.settings.t_high_seconds",
                        "must be < period_seconds",
                    ));
                }
            }
        }
    }
}

/// `converter.type` / `converter.settings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "settings")]
pub enum ConverterConfig {
    Diode(DiodeSettings),
    #[serde(rename = "LDO")]
    Ldo(LdoSettings),
    Hysteresis(HysteresisSettings),
    BuckConverter(BuckConverterSettings),
    BuckBoost(BuckBoostSettings),
    #[serde(rename = "BQ25570")]
    Bq25570(Bq25570Settings),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiodeSettings {
    pub v_ov: f64,
    pub i_quiescent: f64,
}

impl Default for DiodeSettings {
    fn default() -> Self {
        Self { v_ov: 3.3, i_quiescent: 0.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LdoSettings {
    pub v_out: f64,
    pub i_quiescent: f64,
    pub i_quiescent_off: f64,
    pub hysteresis_high: Option<f64>,
    pub hysteresis_low: Option<f64>,
}

impl Default for LdoSettings {
    fn default() -> Self {
        Self {
            v_out: 1.8,
            i_quiescent: 1e-6,
            i_quiescent_off: 0.0,
            hysteresis_high: None,
            hysteresis_low: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HysteresisSettings {
    pub v_ov: f64,
    pub v_high: f64,
    pub v_low: f64,
    pub i_quiescent: f64,
    pub i_quiescent_off: f64,
}

impl Default for HysteresisSettings {
    fn default() -> Self {
        Self {
            v_ov: 5.0,
            v_high: 3.1,
            v_low: 2.4,
            i_quiescent: 1e-6,
            i_quiescent_off: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuckConverterSettings {
    pub v_out: f64,
    pub v_ov: f64,
    pub efficiency: f64,
    pub i_quiescent: f64,
}

impl Default for BuckConverterSettings {
    fn default() -> Self {
        Self {
            v_out: 1.8,
            v_ov: 5.0,
            efficiency: 0.85,
            i_quiescent: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuckBoostSettings {
    pub v_in: f64,
    pub v_out: f64,
    pub efficiency_in: f64,
    pub efficiency_out: f64,
    pub i_quiescent: f64,
    pub v_ov: f64,
}

impl Default for BuckBoostSettings {
    fn default() -> Self {
        Self {
            v_in: 0.0,
            v_out: 3.3,
            efficiency_in: 0.8,
            efficiency_out: 0.85,
            i_quiescent: 1e-6,
            v_ov: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Bq25570Settings {
    pub v_out: f64,
    pub mpp: f64,
    pub v_ov: f64,
    pub v_chgen: f64,
    pub v_uv: f64,
    pub vout_ok_high: f64,
    pub vout_ok_low: f64,
    pub vout_ok_enable: bool,
    pub bypass_boost_converter: bool,
    /// Directory containing the four fixed LUT files (see the BQ25570 LUT
    /// file contract).
    pub lut_dir: String,
}

impl Default for Bq25570Settings {
    fn default() -> Self {
        Self {
            v_out: 3.3,
            mpp: 0.8,
            v_ov: 5.5,
            v_chgen: 1.8,
            v_uv: 1.95,
            vout_ok_high: 3.2,
            vout_ok_low: 2.8,
            vout_ok_enable: true,
            bypass_boost_converter: false,
            lut_dir: "luts/bq25570".to_string(),
        }
    }
}

const BQ25570_V_OUT_CHOICES: [f64; 6] = [1.8, 2.0, 2.2, 2.4, 3.0, 3.3];

impl ConverterConfig {
    fn build(&self) -> Result<Converter, ConfigError> {
        match self {
            Self::Diode(s) => Ok(Converter::Diode(Diode {
                v_ov: s.v_ov,
                i_quiescent: s.i_quiescent,
            })),
            Self::Ldo(s) => {
                let hysteresis = match (s.hysteresis_high, s.hysteresis_low) {
                    (Some(h), Some(l)) => Some((h, l)),
                    (None, None) => None,
                    _ => {
                        return Err(ConfigError::new(
                            "converter.settings.hysteresis_high",
                            "hysteresis_high and hysteresis_low must be set together",
                        ));
                    }
                };
                Ok(Converter::Ldo(Ldo::new(s.v_out, s.i_quiescent, s.i_quiescent_off, hysteresis)))
            }
            Self::Hysteresis(s) => Ok(Converter::Hysteresis(Hysteresis::new(
                s.v_ov,
                s.v_high,
                s.v_low,
                s.i_quiescent,
                s.i_quiescent_off,
            ))),
            Self::BuckConverter(s) => Ok(Converter::Buck(BuckConverter {
                v_out: s.v_out,
                v_ov: s.v_ov,
                efficiency: s.efficiency,
                i_quiescent: s.i_quiescent,
            })),
            Self::BuckBoost(s) => Ok(Converter::BuckBoost(BuckBoost {
                v_in: s.v_in,
                v_out: s.v_out,
                efficiency_in: s.efficiency_in,
                efficiency_out: s.efficiency_out,
                i_quiescent: s.i_quiescent,
                v_ov: s.v_ov,
            })),
            Self::Bq25570(_) => Err(ConfigError::new(
                "converter.settings.lut_dir",
                "BQ25570 requires loaded LUTs; use io::lut::load_bq25570_luts and Converter::Bq25570 directly",
            )),
        }
    }

    fn validate(&self, errors: &mut Vec<ConfigError>) {
        if let Self::Bq25570(s) = self {
            if !BQ25570_V_OUT_CHOICES.contains(&s.v_out) {
                errors.push(ConfigError::new(
                    "converter.settings.v_out",
                    format!("must be one of {BQ25570_V_OUT_CHOICES:?}"),
                ));
            }
            if s.v_chgen >= s.v_uv || s.v_uv >= s.v_ov {
                errors.push(ConfigError::new(
                    "converter.settings.v_chgen",
                    "must satisfy v_chgen < v_uv < v_ov",
                ));
            }
        }
        if let Self::Ldo(s) = self {
            if s.hysteresis_high.is_some() != s.hysteresis_low.is_some() {
                errors.push(ConfigError::new(
                    "converter.settings.hysteresis_high",
                    "hysteresis_high and hysteresis_low must be set together",
                ));
            }
        }
    }
}

/// A single [`TaskLoad`] task entry, duration in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSettings {
    pub name: String,
    pub t_seconds: f64,
    pub current: f64,
}

/// `load.type` / `load.settings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "settings")]
pub enum LoadConfig {
    ConstantLoad(ConstantLoadSettings),
    TaskLoad(TaskLoadSettings),
    #[serde(rename = "JITLoad")]
    JitLoad(JitLoadSettings),
    #[serde(rename = "AdvancedJITLoad")]
    AdvancedJitLoad(AdvancedJitLoadSettings),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstantLoadSettings {
    pub current: f64,
}

impl Default for ConstantLoadSettings {
    fn default() -> Self {
        Self { current: 1e-4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskLoadSettings {
    pub v_on: f64,
    pub v_off: f64,
    #[serde(default)]
    pub i_off: f64,
    pub tasks: Vec<TaskSettings>,
    #[serde(default)]
    pub skip_initial_task: usize,
    #[serde(default)]
    pub shutdown_after_completion: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JitLoadSettings {
    pub v_off: f64,
    pub v_on: f64,
    pub v_checkpoint: f64,
    #[serde(default)]
    pub i_off: f64,
    pub i_restore: f64,
    pub i_compute: f64,
    pub i_checkpoint: f64,
    pub t_restore_seconds: f64,
    pub t_restore_startup_seconds: f64,
    pub t_checkpoint_seconds: f64,
    pub t_checkpoint_period_seconds: f64,
}

/// `load.settings.application` (AdvancedJITLoad only).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum ApplicationConfig {
    Computation { i_active: f64 },
    Atomic { i_active: f64, t_active_seconds: f64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdvancedJitLoadSettings {
    pub v_restore: f64,
    pub v_save: f64,
    pub v_min: f64,
    pub t_restore_seconds: f64,
    pub t_save_seconds: f64,
    #[serde(default)]
    pub i_off: f64,
    pub i_restore: f64,
    pub i_save: f64,
    pub application: ApplicationConfig,
}

impl LoadConfig {
    fn build(&self, dt: &SimulationSettings) -> Load {
        match self {
            Self::ConstantLoad(s) => Load::Constant(ConstantLoad { current: s.current }),
            Self::TaskLoad(s) => {
                let tasks = s
                    .tasks
                    .iter()
                    .map(|t| Task {
                        name: t.name.clone(),
                        t_ticks: dt.ticks(t.t_seconds),
                        current: t.current,
                    })
                    .collect();
                Load::Task(TaskLoad::new(
                    s.v_on,
                    s.v_off,
                    s.i_off,
                    tasks,
                    s.skip_initial_task,
                    s.shutdown_after_completion,
                ))
            }
            Self::JitLoad(s) => Load::Jit(JitLoad::new(
                s.v_off,
                s.v_on,
                s.v_checkpoint,
                s.i_off,
                s.i_restore,
                s.i_compute,
                s.i_checkpoint,
                dt.ticks(s.t_restore_seconds),
                dt.ticks(s.t_restore_startup_seconds),
                dt.ticks(s.t_checkpoint_seconds),
                dt.ticks(s.t_checkpoint_period_seconds),
            )),
            Self::AdvancedJitLoad(s) => {
                let application = match &s.application {
                    ApplicationConfig::Computation { i_active } => Application::Computation(Computation {
                        i_active: *i_active,
                    }),
                    ApplicationConfig::Atomic { i_active, t_active_seconds } => {
                        Application::Atomic(Atomic::new(*i_active, dt.ticks(*t_active_seconds)))
                    }
                };
                Load::AdvancedJit(AdvancedJitLoad::new(
                    s.v_restore,
                    s.v_save,
                    s.v_min,
                    dt.ticks(s.t_restore_seconds),
                    dt.ticks(s.t_save_seconds),
                    s.i_off,
                    s.i_restore,
                    s.i_save,
                    application,
                ))
            }
        }
    }

    fn validate(&self, errors: &mut Vec<ConfigError>) {
        match self {
            Self::TaskLoad(s) => {
                if s.tasks.is_empty() {
                    errors.push(ConfigError::new("load.settings.tasks", "must contain at least one task"));
                }
                if s.v_off >= s.v_on {
                    errors.push(ConfigError::new("load.settings.v_off", "must be < v_on"));
                }
                if s.skip_initial_task >= s.tasks.len().max(1) {
                    errors.push(ConfigError::new(
                        "load.settings.skip_initial_task",
                        "must be a valid index into tasks",
                    ));
                }
            }
            Self::JitLoad(s) => {
                if s.v_off >= s.v_checkpoint {
                    errors.push(ConfigError::new("load.settings.v_checkpoint", "must be > v_off"));
                }
                if s.v_checkpoint >= s.v_on {
                    errors.push(ConfigError::new("load.settings.v_on", "must be > v_checkpoint"));
                }
            }
            Self::AdvancedJitLoad(s) => {
                if s.v_min >= s.v_save || s.v_save >= s.v_restore {
                    errors.push(ConfigError::new(
                        "load.settings.v_restore",
                        "must satisfy v_min < v_save < v_restore",
                    ));
                }
            }
            Self::ConstantLoad(_) => {}
        }
    }
}

impl ScenarioConfig {
    /// Scenario 1: ideal diode, constant harvester, a four-task cycle.
    pub fn diode_task_load() -> Self {
        Self {
            simulation: SimulationSettings {
                until_seconds: 10.0,
                ..SimulationSettings::default()
            },
            capacitor: CapacitorConfig::IdealCapacitor(IdealCapacitorSettings {
                capacitance: 110e-6,
                v_rated: 3.6,
                v_initial: 3.1,
            }),
            harvester: HarvesterConfig::Artificial(ArtificialSettings {
                shape: ArtificialShapeConfig::Const { i_high: 400e-6 },
                v_oc: 5.0,
                v_ov: 5.0,
            }),
            converter: ConverterConfig::Hysteresis(HysteresisSettings {
                v_ov: 5.0,
                v_high: 3.1,
                v_low: 2.4,
                i_quiescent: 1e-6,
                i_quiescent_off: 0.0,
            }),
            load: LoadConfig::TaskLoad(TaskLoadSettings {
                v_on: 2.5,
                v_off: 2.2,
                i_off: 0.0,
                tasks: vec![
                    TaskSettings { name: "INIT".into(), t_seconds: 0.05, current: 300e-6 },
                    TaskSettings { name: "SENSE".into(), t_seconds: 0.1, current: 500e-6 },
                    TaskSettings { name: "SEND".into(), t_seconds: 0.2, current: 1.2e-3 },
                    TaskSettings { name: "BURN".into(), t_seconds: 0.5, current: 800e-6 },
                ],
                skip_initial_task: 1,
                shutdown_after_completion: false,
            }),
        }
    }

    /// Scenario 2: hysteresis LDO draining an un-harvested capacitor.
    pub fn hysteresis_drain() -> Self {
        Self {
            simulation: SimulationSettings {
                until_seconds: 5.0,
                ..SimulationSettings::default()
            },
            capacitor: CapacitorConfig::IdealCapacitor(IdealCapacitorSettings {
                capacitance: 220e-6,
                v_rated: 3.6,
                v_initial: 3.0,
            }),
            harvester: HarvesterConfig::Artificial(ArtificialSettings {
                shape: ArtificialShapeConfig::Const { i_high: 0.0 },
                v_oc: 0.0,
                v_ov: 5.0,
            }),
            converter: ConverterConfig::Hysteresis(HysteresisSettings {
                v_ov: 5.0,
                v_high: 3.1,
                v_low: 2.4,
                i_quiescent: 1e-6,
                i_quiescent_off: 1e-8,
            }),
            load: LoadConfig::ConstantLoad(ConstantLoadSettings { current: 500e-6 }),
        }
    }

    /// Scenario 3: JIT checkpointing on a BQ25570 under steady solar.
    /// The BQ25570/solar settings are illustrative; a real run supplies
    /// `lut_dir`/`irradiance_path` and builds the converter/harvester
    /// directly via `io::lut`/`io::trace` rather than `build()`.
    pub fn jit_solar_bq25570() -> Self {
        Self {
            simulation: SimulationSettings {
                until_seconds: 30.0,
                ..SimulationSettings::default()
            },
            capacitor: CapacitorConfig::IdealCapacitor(IdealCapacitorSettings {
                capacitance: 3300e-6,
                v_rated: 5.5,
                v_initial: 2.0,
            }),
            harvester: HarvesterConfig::SolarPanel(SolarPanelSettings {
                irradiance_path: "traces/solar_13klux.json".into(),
                i_sc: 2e-3,
                v_oc: 0.6,
                i_mpp: 1.8e-3,
                v_mpp: 0.5,
                cells_series: 1.0,
                cells_parallel: 1.0,
            }),
            converter: ConverterConfig::Bq25570(Bq25570Settings::default()),
            load: LoadConfig::JitLoad(JitLoadSettings {
                v_off: 1.9,
                v_on: 2.1,
                v_checkpoint: 3.4,
                i_off: 0.0,
                i_restore: 5e-5,
                i_compute: 2e-4,
                i_checkpoint: 1.5e-4,
                t_restore_seconds: 0.255,
                t_restore_startup_seconds: 0.5,
                t_checkpoint_seconds: 0.033,
                t_checkpoint_period_seconds: 1.0,
            }),
        }
    }

    pub const PRESETS: &'static [&'static str] = &["diode_task_load", "hysteresis_drain", "jit_solar_bq25570"];

    /// Loads a scenario from a named preset.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "diode_task_load" => Ok(Self::diode_task_load()),
            "hysteresis_drain" => Ok(Self::hysteresis_drain()),
            "jit_solar_bq25570" => Ok(Self::jit_solar_bq25570()),
            _ => Err(ConfigError::new(
                "preset",
                format!("unknown preset \"{name}\", available: {}", Self::PRESETS.join(", ")),
            )),
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns every problem found (empty if valid).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.simulation.dt_base <= 0.0 {
            errors.push(ConfigError::new("simulation.dt_base", "must be > 0"));
        }
        if self.simulation.until_seconds <= 0.0 {
            errors.push(ConfigError::new("simulation.until_seconds", "must be > 0"));
        }
        self.capacitor.validate(&mut errors);
        self.harvester.validate(&mut errors);
        self.converter.validate(&mut errors);
        self.load.validate(&mut errors);
        errors
    }

    /// Builds the component set described by this configuration. Variants
    /// that require on-disk data (`IVCurve`, `SolarPanel`, `TEG`,
    /// `BQ25570`) cannot be built this way — load their tables through
    /// `io::trace`/`io::lut` and assemble the `Simulation` directly.
    pub fn build_capacitor(&self) -> Capacitor {
        self.capacitor.build()
    }

    pub fn build_harvester(&self) -> Result<Harvester, ConfigError> {
        self.harvester.build(&self.simulation)
    }

    pub fn build_converter(&self) -> Result<Converter, ConfigError> {
        self.converter.build()
    }

    pub fn build_load(&self) -> Load {
        self.load.build(&self.simulation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap_or_else(|e| panic!("preset \"{name}\" should load: {e}"));
            let errors = cfg.validate();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        assert!(err.unwrap_err().message.contains("unknown preset"));
    }

    #[test]
    fn diode_task_load_builds_components() {
        let cfg = ScenarioConfig::diode_task_load();
        let _capacitor = cfg.build_capacitor();
        let _harvester = cfg.build_harvester().unwrap();
        let _converter = cfg.build_converter().unwrap();
        let _load = cfg.build_load();
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
until_seconds = 3.0

[capacitor]
type = "IdealCapacitor"
settings = { capacitance = 1e-4, v_rated = 3.3, v_initial = 0.0 }

[harvester]
type = "Artificial"
settings = { shape = "const", i_high = 1e-3, v_oc = 5.0, v_ov = 5.0 }

[converter]
type = "Diode"
settings = { v_ov = 3.3, i_quiescent = 0.0 }

[load]
type = "ConstantLoad"
settings = { current = 1e-4 }
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        assert!(cfg.unwrap().validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[capacitor]
type = "IdealCapacitor"
settings = { capacitance = 1e-4, bogus_field = true }

[harvester]
type = "Artificial"
settings = { shape = "const", i_high = 1e-3, v_oc = 5.0, v_ov = 5.0 }

[converter]
type = "Diode"

[load]
type = "ConstantLoad"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn task_load_validation_catches_inverted_thresholds() {
        let mut cfg = ScenarioConfig::diode_task_load();
        if let LoadConfig::TaskLoad(s) = &mut cfg.load {
            s.v_off = s.v_on + 1.0;
        }
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "load.settings.v_off"));
    }

    #[test]
    fn bq25570_validation_catches_bad_v_out() {
        let mut cfg = ScenarioConfig::jit_solar_bq25570();
        if let ConverterConfig::Bq25570(s) = &mut cfg.converter {
            s.v_out = 2.7;
        }
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "converter.settings.v_out"));
    }

    #[test]
    fn ldo_requires_both_hysteresis_bounds() {
        let mut errors = Vec::new();
        let ldo = ConverterConfig::Ldo(LdoSettings {
            hysteresis_high: Some(3.0),
            hysteresis_low: None,
            ..LdoSettings::default()
        });
        ldo.validate(&mut errors);
        assert!(!errors.is_empty());
    }
}
