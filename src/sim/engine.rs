//! The discrete-event loop: couples harvester, capacitor, converter, and
//! load through a power-conserving current balance at the capacitor node,
//! and advances time only as far as the nearest predicted event.

use crate::components::{
    Capacitor, CapacitorModel, Converter, ConverterModel, Harvester, HarvesterModel, Load,
    LoadModel, LoadSignal,
};
use crate::error::SimError;
use crate::sim::types::{EngineConfig, StepResult};

/// Owns the four component instances and the main loop. One `Simulation`
/// corresponds to one sweep job.
pub struct Simulation {
    pub config: EngineConfig,
    pub harvester: Harvester,
    pub capacitor: Capacitor,
    pub converter: Converter,
    pub load: Load,
    t: i64,
    log: Vec<StepResult>,
    last_logged: Option<StepResult>,
}

const EPS: f64 = 1e-12;

fn changed(a: f64, b: f64) -> bool {
    (a - b).abs() > EPS
}

fn row_changed(a: &StepResult, b: &StepResult) -> bool {
    changed(a.v_cap, b.v_cap)
        || changed(a.v_in, b.v_in)
        || changed(a.i_in, b.i_in)
        || changed(a.eta_in, b.eta_in)
        || changed(a.v_out, b.v_out)
        || changed(a.i_out, b.i_out)
        || changed(a.eta_out, b.eta_out)
        || changed(a.i_leak, b.i_leak)
        || changed(a.i_net, b.i_net)
}

impl Simulation {
    pub fn new(config: EngineConfig, harvester: Harvester, capacitor: Capacitor, converter: Converter, load: Load) -> Self {
        let mut sim = Self {
            config,
            harvester,
            capacitor,
            converter,
            load,
            t: 0,
            log: Vec::new(),
            last_logged: None,
        };
        sim.reset();
        sim
    }

    pub fn log(&self) -> &[StepResult] {
        &self.log
    }

    /// Re-initializes every sub-component and clears the log accumulator.
    pub fn reset(&mut self) {
        self.t = 0;
        self.log.clear();
        self.last_logged = None;
        self.capacitor.reset();
        let v_cap = self.capacitor.voltage();
        self.converter.reset(v_cap);
        let v_out = self.converter.output_v(v_cap);
        self.load.reset(v_out, v_cap);
    }

    /// Runs the loop until `t` reaches `until` ticks (or the harvester/load
    /// schedule nothing further and the max-step cap would run past it).
    pub fn run(&mut self, until: i64) -> Result<(), SimError> {
        while self.t < until {
            self.step(until)?;
        }
        self.force_log();
        Ok(())
    }

    fn mix(&mut self, t: i64) -> StepResult {
        let v_cap = self.capacitor.voltage();

        let ocv = self.harvester.ocv(t);
        let v_in = self.converter.input_v(v_cap, ocv, t);
        let i_in = self.harvester.current(t, v_in);
        let eta_in = self.converter.input_eta(v_in, i_in);

        let v_out = self.converter.output_v(v_cap);
        let i_out = self.load.current(v_out);
        let eta_out = self.converter.output_eta(v_cap, i_out);

        let i_leak = self.converter.quiescent(v_cap);

        let (in_ratio, out_ratio) = if v_cap == 0.0 { (1.0, 1.0) } else { (v_in / v_cap, v_out / v_cap) };
        let i_net = i_in * in_ratio * eta_in - i_out * out_ratio / eta_out - i_leak;

        StepResult {
            t,
            dt: 0,
            v_cap,
            v_in,
            i_in,
            eta_in,
            v_out,
            i_out,
            eta_out,
            i_leak,
            i_net,
        }
    }

    /// Minimum of every component's predicted next event, clamped to
    /// `max_step`. `None` from any source is treated as +infinity.
    fn compute_next_update(&self, step: &StepResult) -> i64 {
        let v_cap = step.v_cap;
        let i_net = step.i_net;

        let candidates = [
            self.harvester.next_change(step.t),
            self.load.next_change(step.t),
            self.capacitor
                .next_change(self.config.dt_base, i_net, self.load.next_threshold(v_cap, i_net)),
            self.capacitor
                .next_change(self.config.dt_base, i_net, self.converter.next_threshold(v_cap, i_net)),
            Some(self.config.max_step),
        ];

        candidates.into_iter().flatten().min().unwrap_or(self.config.max_step).max(1)
    }

    fn log_data(&mut self, step: StepResult) {
        let should_log = self.config.force_log
            || match self.last_logged {
                None => true,
                Some(prev) => row_changed(&prev, &step),
            };
        if should_log {
            self.log.push(step);
            self.last_logged = Some(step);
        }
    }

    fn force_log(&mut self) {
        let step = self.mix(self.t);
        self.log.push(step);
        self.last_logged = Some(step);
    }

    /// Runs a single event step, never advancing past `until`.
    fn step(&mut self, until: i64) -> Result<(), SimError> {
        let t = self.t;
        let mut step = self.mix(t);

        let mut dt = self.compute_next_update(&step);
        dt = dt.min(until - t);
        step.dt = dt;

        self.log_data(step);

        let v_cap = step.v_cap;
        self.harvester.update(t, dt, step.v_in);
        self.capacitor.update(dt, self.config.dt_base, step.i_net);
        self.converter.update(t + dt, dt, self.capacitor.voltage());
        let signal = self.load.update(t + dt, dt, step.v_out, self.capacitor.voltage());
        if signal == Some(LoadSignal::ForceOff) {
            self.converter.turn_off(v_cap);
        }

        if self.t + dt > until {
            return Err(SimError::ThresholdCrossingMiss {
                at_tick: self.t + dt,
                expected_at: until,
            });
        }

        self.t += dt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ConstantLoad, Diode, IdealCapacitor};

    fn simple_sim(i_h: f64, until_v: f64) -> Simulation {
        let harvester = Harvester::Artificial(crate::components::Artificial {
            shape: crate::components::ArtificialShape::Const { i_high: i_h },
            v_oc: 5.0,
            v_ov: 5.0,
        });
        let capacitor = Capacitor::Ideal(IdealCapacitor::new(1e-6, 3.3, 0.0));
        let converter = Converter::Diode(Diode { v_ov: 5.0, i_quiescent: 0.0 });
        let load = Load::Constant(ConstantLoad { current: 0.0 });
        let _ = until_v;
        Simulation::new(EngineConfig::new(1e-6, 1e-3, false), harvester, capacitor, converter, load)
    }

    #[test]
    fn capacitor_charges_toward_steady_state_under_constant_current() {
        let mut sim = simple_sim(1e-3, 3.3);
        sim.run(10_000).unwrap();
        assert!(sim.capacitor.voltage() > 0.0);
        assert!(sim.capacitor.voltage() <= 3.3 + 1e-9);
    }

    #[test]
    fn run_never_advances_past_the_requested_end() {
        let mut sim = simple_sim(1e-6, 3.3);
        sim.run(5_000).unwrap();
        assert!(sim.log().last().unwrap().t <= 5_000);
    }

    #[test]
    fn log_is_appended_each_time_a_watched_field_changes() {
        let mut sim = simple_sim(1e-3, 3.3);
        sim.run(2_000).unwrap();
        assert!(sim.log().len() >= 2);
    }

    #[test]
    fn zero_current_never_advances_by_more_than_max_step() {
        let mut sim = simple_sim(0.0, 3.3);
        sim.run(100_000).unwrap();
        let gaps: Vec<i64> = sim.log().windows(2).map(|w| w[1].t - w[0].t).collect();
        assert!(gaps.iter().all(|&g| g <= sim.config.max_step));
    }
}
