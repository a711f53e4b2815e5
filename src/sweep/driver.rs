//! Parameter-sweep driver: expands a cartesian grid of configuration
//! overrides into independent simulation jobs and runs them in parallel
//! workers. Workers share no mutable state; a failing job is recorded and
//! never discards the results of the jobs that succeeded.

use std::path::PathBuf;

use crate::config::ScenarioConfig;
use crate::error::{ConfigError, SimError};
use crate::io::export::{self, SweepResultRow};
use crate::sim::Simulation;

/// One swept dimension: a name (for the result table header), the values
/// to try, and the mutation applied to a cloned base config for each one.
pub struct SweepAxis {
    pub name: String,
    pub values: Vec<f64>,
    pub apply: Box<dyn Fn(&mut ScenarioConfig, f64) + Sync + Send>,
}

impl SweepAxis {
    pub fn new(name: impl Into<String>, values: Vec<f64>, apply: impl Fn(&mut ScenarioConfig, f64) + Sync + Send + 'static) -> Self {
        Self { name: name.into(), values, apply: Box::new(apply) }
    }
}

/// A single metric extracted from a completed `Simulation`.
pub struct MetricSpec {
    pub name: String,
    pub extract: Box<dyn Fn(&Simulation) -> f64 + Sync + Send>,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, extract: impl Fn(&Simulation) -> f64 + Sync + Send + 'static) -> Self {
        Self { name: name.into(), extract: Box::new(extract) }
    }
}

/// Engine-level settings recognised by the sweep driver, distinct from the
/// base scenario config (these override it per-job).
#[derive(Debug, Clone, Default)]
pub struct SweepSettings {
    /// Overrides `simulation.max_step_seconds` for every job, if set.
    pub timestep_seconds: Option<f64>,
    /// Dump each job's full step log to `log_dir/job_<n>.csv`.
    pub store_log_data: bool,
    pub log_dir: Option<PathBuf>,
}

/// A job that failed, identified by the axis values that produced it.
#[derive(Debug, Clone)]
pub struct SweepJobError {
    pub params: Vec<(String, f64)>,
    pub message: String,
}

/// Every job's outcome: successful rows, plus any failures, collected in
/// bulk only after every job has settled.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub rows: Vec<SweepResultRow>,
    pub errors: Vec<SweepJobError>,
}

fn cartesian(axes: &[SweepAxis]) -> Vec<Vec<f64>> {
    let mut combos: Vec<Vec<f64>> = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(combos.len() * axis.values.len());
        for combo in &combos {
            for &v in &axis.values {
                let mut extended = combo.clone();
                extended.push(v);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

enum JobOutcome {
    Row(SweepResultRow),
    Err(SweepJobError),
}

fn build_and_run(
    base: &ScenarioConfig,
    axes: &[SweepAxis],
    combo: &[f64],
    metrics: &[MetricSpec],
    settings: &SweepSettings,
    job_index: usize,
) -> JobOutcome {
    let params: Vec<(String, f64)> = axes.iter().zip(combo.iter()).map(|(a, &v)| (a.name.clone(), v)).collect();

    let mut cfg = base.clone();
    for (axis, &value) in axes.iter().zip(combo.iter()) {
        (axis.apply)(&mut cfg, value);
    }
    if let Some(step) = settings.timestep_seconds {
        cfg.simulation.max_step_seconds = step;
    }

    let err = |e: String| JobOutcome::Err(SweepJobError { params: params.clone(), message: e });

    let validation = cfg.validate();
    if !validation.is_empty() {
        let joined = validation.iter().map(ConfigError::to_string).collect::<Vec<_>>().join("; ");
        return err(joined);
    }

    let capacitor = cfg.build_capacitor();
    let harvester = match cfg.build_harvester() {
        Ok(h) => h,
        Err(e) => return err(e.to_string()),
    };
    let converter = match cfg.build_converter() {
        Ok(c) => c,
        Err(e) => return err(e.to_string()),
    };
    let load = cfg.build_load();

    let mut sim = Simulation::new(cfg.simulation.engine_config(), harvester, capacitor, converter, load);
    let until = cfg.simulation.ticks(cfg.simulation.until_seconds);
    if let Err(e) = sim.run(until) {
        return err(match e {
            SimError::ThresholdCrossingMiss { at_tick, expected_at } => {
                format!("threshold crossing missed at {at_tick}, expected {expected_at}")
            }
            other => other.to_string(),
        });
    }

    if settings.store_log_data {
        if let Some(dir) = &settings.log_dir {
            let path = dir.join(format!("job_{job_index}.csv"));
            if let Err(e) = export::export_component_log_csv(sim.log(), &params, cfg.simulation.dt_base, &path) {
                return err(format!("failed to write job log: {e}"));
            }
        }
    }

    let computed_metrics: Vec<(String, f64)> = metrics.iter().map(|m| (m.name.clone(), (m.extract)(&sim))).collect();
    JobOutcome::Row(SweepResultRow { params, metrics: computed_metrics })
}

/// Expands `axes` into a cartesian product of jobs and runs them across up
/// to `min(available_parallelism/2, job_count)` workers (sequentially when
/// the `parallel-sweep` feature is disabled). Determinism within a worker
/// is total; job order never affects a job's own result.
pub fn run_sweep(base: &ScenarioConfig, axes: Vec<SweepAxis>, metrics: Vec<MetricSpec>, settings: SweepSettings) -> SweepOutcome {
    let combos = cartesian(&axes);

    let outcomes: Vec<JobOutcome> = run_jobs(base, &axes, &combos, &metrics, &settings);

    let mut outcome = SweepOutcome::default();
    for o in outcomes {
        match o {
            JobOutcome::Row(row) => outcome.rows.push(row),
            JobOutcome::Err(e) => outcome.errors.push(e),
        }
    }
    outcome
}

#[cfg(feature = "parallel-sweep")]
fn run_jobs(
    base: &ScenarioConfig,
    axes: &[SweepAxis],
    combos: &[Vec<f64>],
    metrics: &[MetricSpec],
    settings: &SweepSettings,
) -> Vec<JobOutcome> {
    use rayon::prelude::*;

    let worker_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).max(2) / 2;
    let worker_count = worker_count.max(1).min(combos.len().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .expect("building sweep worker pool");

    pool.install(|| {
        combos
            .par_iter()
            .enumerate()
            .map(|(i, combo)| build_and_run(base, axes, combo, metrics, settings, i))
            .collect()
    })
}

#[cfg(not(feature = "parallel-sweep"))]
fn run_jobs(
    base: &ScenarioConfig,
    axes: &[SweepAxis],
    combos: &[Vec<f64>],
    metrics: &[MetricSpec],
    settings: &SweepSettings,
) -> Vec<JobOutcome> {
    combos
        .iter()
        .enumerate()
        .map(|(i, combo)| build_and_run(base, axes, combo, metrics, settings, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapacitorConfig;

    fn capacitance_axis(values: Vec<f64>) -> SweepAxis {
        SweepAxis::new("capacitance", values, |cfg, v| {
            if let CapacitorConfig::IdealCapacitor(s) = &mut cfg.capacitor {
                s.capacitance = v;
            }
        })
    }

    fn v_cap_metric() -> MetricSpec {
        MetricSpec::new("v_cap_final", |sim: &Simulation| sim.log().last().map(|r| r.v_cap).unwrap_or(0.0))
    }

    #[test]
    fn cartesian_product_covers_every_combination() {
        let base = ScenarioConfig::diode_task_load();
        let axes = vec![capacitance_axis(vec![1e-4, 2e-4]), capacitance_axis(vec![3.3, 3.6])];
        let outcome = run_sweep(&base, axes, vec![v_cap_metric()], SweepSettings::default());
        assert_eq!(outcome.rows.len() + outcome.errors.len(), 4);
    }

    #[test]
    fn sweep_is_order_independent() {
        let base = ScenarioConfig::diode_task_load();
        let axes = vec![capacitance_axis(vec![1e-4, 2e-4, 3e-4])];
        let forward = run_sweep(&base, axes, vec![v_cap_metric()], SweepSettings::default());

        let axes_rev = vec![capacitance_axis(vec![3e-4, 2e-4, 1e-4])];
        let backward = run_sweep(&base, axes_rev, vec![v_cap_metric()], SweepSettings::default());

        let mut forward_sorted: Vec<f64> = forward.rows.iter().map(|r| r.metrics[0].1).collect();
        let mut backward_sorted: Vec<f64> = backward.rows.iter().map(|r| r.metrics[0].1).collect();
        forward_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        backward_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(forward_sorted, backward_sorted);
    }

    #[test]
    fn invalid_job_is_recorded_without_discarding_the_rest() {
        let base = ScenarioConfig::diode_task_load();
        let axes = vec![capacitance_axis(vec![1e-4, -1.0])];
        let outcome = run_sweep(&base, axes, vec![v_cap_metric()], SweepSettings::default());
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
    }
}
