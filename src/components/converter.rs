//! Power converters sitting between harvester, capacitor, and load.

use crate::components::voltage_monitor::{Edge, VoltageMonitor};

/// Shared behavior of the converter family.
pub trait ConverterModel {
    fn input_v(&self, v_cap: f64, ocv: Option<f64>, t: i64) -> f64;
    fn input_eta(&mut self, v_in: f64, i_in: f64) -> f64;
    fn output_v(&self, v_cap: f64) -> f64;
    fn output_eta(&mut self, v_cap: f64, i_out: f64) -> f64;
    fn quiescent(&self, v_cap: f64) -> f64;
    /// Requested by a load to force the output rail down. A no-op for
    /// converters with no latch.
    fn turn_off(&mut self, v_cap: f64);
    fn update(&mut self, t: i64, dt: i64, v_cap: f64);

    /// Re-initializes any latch/state-machine state from the capacitor's
    /// voltage at the start of a run. A no-op for stateless converters.
    fn reset(&mut self, v_cap: f64);

    /// Next threshold the converter's embedded monitor would cross given the
    /// sign of the driving current. `None` for variants with no thresholds.
    fn next_threshold(&self, _v_cap: f64, _current_sign: f64) -> Option<f64> {
        None
    }
}

/// Direct harvester-capacitor-load coupling with overvoltage cutoff.
#[derive(Debug, Clone)]
pub struct Diode {
    pub v_ov: f64,
    pub i_quiescent: f64,
}

impl ConverterModel for Diode {
    fn input_v(&self, v_cap: f64, _ocv: Option<f64>, _t: i64) -> f64 {
        v_cap
    }

    fn input_eta(&mut self, v_in: f64, _i_in: f64) -> f64 {
        if v_in >= self.v_ov { 0.0 } else { 1.0 }
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        v_cap
    }

    fn output_eta(&mut self, _v_cap: f64, _i_out: f64) -> f64 {
        1.0
    }

    fn quiescent(&self, _v_cap: f64) -> f64 {
        self.i_quiescent
    }

    fn turn_off(&mut self, _v_cap: f64) {}

    fn update(&mut self, _t: i64, _dt: i64, _v_cap: f64) {}

    fn reset(&mut self, _v_cap: f64) {}
}

/// Output latch with no input-side conversion: on above `v_high`, off
/// below `v_low`.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    pub v_ov: f64,
    pub v_high: f64,
    pub v_low: f64,
    pub i_quiescent: f64,
    pub i_quiescent_off: f64,
    on: bool,
    vm: VoltageMonitor,
}

impl Hysteresis {
    pub fn new(v_ov: f64, v_high: f64, v_low: f64, i_quiescent: f64, i_quiescent_off: f64) -> Self {
        let vm = VoltageMonitor::with_thresholds(&[
            ("ON", v_high, Edge::Rising),
            ("OFF", v_low, Edge::Falling),
        ]);
        Self {
            v_ov,
            v_high,
            v_low,
            i_quiescent,
            i_quiescent_off,
            on: false,
            vm,
        }
    }
}

impl ConverterModel for Hysteresis {
    fn input_v(&self, v_cap: f64, _ocv: Option<f64>, _t: i64) -> f64 {
        v_cap
    }

    fn input_eta(&mut self, v_in: f64, _i_in: f64) -> f64 {
        if v_in >= self.v_ov { 0.0 } else { 1.0 }
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        if self.on { v_cap } else { 0.0 }
    }

    fn output_eta(&mut self, _v_cap: f64, _i_out: f64) -> f64 {
        1.0
    }

    fn quiescent(&self, _v_cap: f64) -> f64 {
        if self.on {
            self.i_quiescent
        } else {
            self.i_quiescent_off
        }
    }

    fn turn_off(&mut self, v_cap: f64) {
        if v_cap < self.v_high {
            self.on = false;
        }
    }

    fn update(&mut self, _t: i64, _dt: i64, v_cap: f64) {
        if self.on && v_cap <= self.v_low {
            self.on = false;
        } else if !self.on && v_cap >= self.v_high {
            self.on = true;
        }
    }

    fn next_threshold(&self, v_cap: f64, current_sign: f64) -> Option<f64> {
        self.vm.next_threshold(v_cap, current_sign)
    }

    fn reset(&mut self, v_cap: f64) {
        self.on = v_cap >= self.v_low;
    }
}

/// Linear regulator: dissipates `v_cap - v_out` as heat, optionally
/// latched by hysteresis.
#[derive(Debug, Clone)]
pub struct Ldo {
    pub v_out: f64,
    pub i_quiescent: f64,
    pub i_quiescent_off: f64,
    pub hysteresis: Option<(f64, f64)>,
    on: bool,
    vm: VoltageMonitor,
}

impl Ldo {
    pub fn new(v_out: f64, i_quiescent: f64, i_quiescent_off: f64, hysteresis: Option<(f64, f64)>) -> Self {
        let mut vm = VoltageMonitor::new();
        if let Some((v_high, v_low)) = hysteresis {
            vm.register("ON", v_high, Edge::Rising);
            vm.register("OFF", v_low, Edge::Falling);
        }
        vm.register("OUT", v_out, Edge::Both);
        Self {
            v_out,
            i_quiescent,
            i_quiescent_off,
            hysteresis,
            on: true,
            vm,
        }
    }
}

impl ConverterModel for Ldo {
    fn input_v(&self, v_cap: f64, _ocv: Option<f64>, _t: i64) -> f64 {
        v_cap
    }

    fn input_eta(&mut self, _v_in: f64, _i_in: f64) -> f64 {
        1.0
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        if self.on { v_cap.min(self.v_out) } else { 0.0 }
    }

    fn output_eta(&mut self, v_cap: f64, _i_out: f64) -> f64 {
        if v_cap > self.v_out {
            self.v_out / v_cap
        } else {
            1.0
        }
    }

    fn quiescent(&self, _v_cap: f64) -> f64 {
        if self.on {
            self.i_quiescent
        } else {
            self.i_quiescent_off
        }
    }

    fn turn_off(&mut self, v_cap: f64) {
        if let Some((v_high, _)) = self.hysteresis {
            if v_cap < v_high {
                self.on = false;
            }
        }
    }

    fn update(&mut self, _t: i64, _dt: i64, v_cap: f64) {
        if let Some((v_high, v_low)) = self.hysteresis {
            if self.on && v_cap < v_low {
                self.on = false;
            } else if !self.on && v_cap > v_high {
                self.on = true;
            }
        }
    }

    fn next_threshold(&self, v_cap: f64, current_sign: f64) -> Option<f64> {
        self.vm.next_threshold(v_cap, current_sign)
    }

    fn reset(&mut self, v_cap: f64) {
        self.on = match self.hysteresis {
            Some((_, v_low)) => v_cap >= v_low,
            None => true,
        };
    }
}

/// Fixed-efficiency buck converter clamping the output rail.
#[derive(Debug, Clone)]
pub struct BuckConverter {
    pub v_out: f64,
    pub v_ov: f64,
    pub efficiency: f64,
    pub i_quiescent: f64,
}

impl ConverterModel for BuckConverter {
    fn input_v(&self, v_cap: f64, _ocv: Option<f64>, _t: i64) -> f64 {
        v_cap
    }

    fn input_eta(&mut self, v_in: f64, _i_in: f64) -> f64 {
        if v_in >= self.v_ov { 0.0 } else { 1.0 }
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        if v_cap < self.v_out {
            v_cap
        } else if v_cap > self.v_ov {
            self.v_ov
        } else {
            self.v_out
        }
    }

    fn output_eta(&mut self, _v_cap: f64, _i_out: f64) -> f64 {
        self.efficiency
    }

    fn quiescent(&self, _v_cap: f64) -> f64 {
        self.i_quiescent
    }

    fn turn_off(&mut self, _v_cap: f64) {}

    fn update(&mut self, _t: i64, _dt: i64, _v_cap: f64) {}

    fn reset(&mut self, _v_cap: f64) {}
}

/// Ideal bidirectional converter with independently configurable
/// input/output set-points and fixed efficiencies.
#[derive(Debug, Clone)]
pub struct BuckBoost {
    pub v_in: f64,
    pub v_out: f64,
    pub efficiency_in: f64,
    pub efficiency_out: f64,
    pub i_quiescent: f64,
    pub v_ov: f64,
}

impl ConverterModel for BuckBoost {
    fn input_v(&self, v_cap: f64, _ocv: Option<f64>, _t: i64) -> f64 {
        if self.v_in == 0.0 || v_cap < self.v_in {
            v_cap
        } else {
            self.v_in
        }
    }

    fn input_eta(&mut self, v_in: f64, _i_in: f64) -> f64 {
        if v_in >= self.v_ov {
            0.0
        } else {
            self.efficiency_in
        }
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        if self.v_out == 0.0 || v_cap < self.v_out {
            v_cap
        } else {
            self.v_out
        }
    }

    fn output_eta(&mut self, _v_cap: f64, _i_out: f64) -> f64 {
        self.efficiency_out
    }

    fn quiescent(&self, _v_cap: f64) -> f64 {
        self.i_quiescent
    }

    fn turn_off(&mut self, _v_cap: f64) {}

    fn update(&mut self, _t: i64, _dt: i64, _v_cap: f64) {}

    fn reset(&mut self, _v_cap: f64) {}
}

/// Boost-converter efficiency row: `(v_in, v_stor, i_in_µA, eta_pct)`.
pub type BoostRow = (f64, f64, f64, f64);
/// Buck-converter efficiency row: `(v_stor, i_out, eta)`.
pub type BuckRow = (f64, f64, f64);
/// Quiescent-current row: `(v_stor, i_quiescent)`.
pub type QuiescentRow = (f64, f64);

fn closest_by<T: Copy>(rows: &[T], key: impl Fn(T) -> f64, target: f64) -> usize {
    rows.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (key(**a) - target)
                .abs()
                .partial_cmp(&(key(**b) - target).abs())
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap()
}

/// Four-state MPPT charger. Input/output efficiencies are drawn from
/// measured lookup tables and cached by their last query key to avoid
/// repeated linear scans when neither input changes between steps.
#[derive(Debug, Clone)]
pub struct Bq25570 {
    pub v_out: f64,
    pub mpp: f64,
    pub v_ov: f64,
    pub v_chgen: f64,
    pub v_uv: f64,
    pub vout_ok_high: f64,
    pub vout_ok_low: f64,
    pub vout_ok_enable: bool,
    pub bypass_boost_converter: bool,
    boost_data: Vec<BoostRow>,
    buck_data: Vec<BuckRow>,
    quiescent_active: Vec<QuiescentRow>,
    quiescent_standby: Vec<QuiescentRow>,
    v_stor: f64,
    vout_on: bool,
    boost_cache: Option<(f64, f64, f64)>,
    buck_cache: Option<(f64, f64, f64)>,
    vm: VoltageMonitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bq25570State {
    ColdStart,
    Undervoltage,
    Charging,
    Overvoltage,
}

impl Bq25570 {
    pub fn new(
        v_out: f64,
        mpp: f64,
        v_ov: f64,
        v_chgen: f64,
        v_uv: f64,
        vout_ok_high: f64,
        vout_ok_low: f64,
        vout_ok_enable: bool,
        bypass_boost_converter: bool,
        boost_data: Vec<BoostRow>,
        buck_data: Vec<BuckRow>,
        quiescent_active: Vec<QuiescentRow>,
        quiescent_standby: Vec<QuiescentRow>,
    ) -> Self {
        let mut vm = VoltageMonitor::new();
        vm.register("OUTPUT_OFF", v_ov, Edge::Both);
        vm.register("OUTPUT_ON", v_chgen, Edge::Both);
        vm.register("COLD_START_UV", v_uv, Edge::Both);
        if vout_ok_enable {
            vm.register("VOUT_HIGH", vout_ok_high, Edge::Both);
            vm.register("VOUT_LOW", vout_ok_low, Edge::Both);
        }
        Self {
            v_out,
            mpp,
            v_ov,
            v_chgen,
            v_uv,
            vout_ok_high,
            vout_ok_low,
            vout_ok_enable,
            bypass_boost_converter,
            boost_data,
            buck_data,
            quiescent_active,
            quiescent_standby,
            v_stor: 0.0,
            vout_on: false,
            boost_cache: None,
            buck_cache: None,
            vm,
        }
    }

    fn state(&self) -> Bq25570State {
        if self.v_stor < self.v_chgen {
            Bq25570State::ColdStart
        } else if self.v_stor < self.v_uv {
            Bq25570State::Undervoltage
        } else if self.v_stor < self.v_ov {
            Bq25570State::Charging
        } else {
            Bq25570State::Overvoltage
        }
    }

    fn boost_efficiency(&mut self, v_in: f64, i_in: f64) -> f64 {
        if v_in == 0.0 || i_in == 0.0 || self.boost_data.is_empty() {
            return 1.0;
        }
        if let Some((cv, ci, eta)) = self.boost_cache {
            if cv == v_in && ci == i_in {
                return eta;
            }
        }
        let i_micro = i_in * 1_000_000.0;
        let idx = closest_by(&self.boost_data, |r| r.2, i_micro);
        let target_i = self.boost_data[idx].2;
        let v_stor = self.v_stor;
        let best = self
            .boost_data
            .iter()
            .filter(|r| r.2 == target_i)
            .min_by(|a, b| {
                let ea = (v_in - a.0).abs() + (v_stor - a.1).abs();
                let eb = (v_in - b.0).abs() + (v_stor - b.1).abs();
                ea.partial_cmp(&eb).unwrap()
            })
            .unwrap();
        let eta = best.3 / 100.0;
        self.boost_cache = Some((v_in, i_in, eta));
        eta
    }

    fn buck_efficiency(&mut self, v_stor: f64, i_out: f64) -> f64 {
        if v_stor == 0.0 || i_out == 0.0 || self.buck_data.is_empty() {
            return 1.0;
        }
        if let Some((cv, ci, eta)) = self.buck_cache {
            if cv == v_stor && ci == i_out {
                return eta;
            }
        }
        let idx = closest_by(&self.buck_data, |r| r.1, i_out);
        let target_i = self.buck_data[idx].1;
        let best = self
            .buck_data
            .iter()
            .filter(|r| r.1 == target_i)
            .min_by(|a, b| (v_stor - a.0).abs().partial_cmp(&(v_stor - b.0).abs()).unwrap())
            .unwrap();
        let eta = best.2;
        self.buck_cache = Some((v_stor, i_out, eta));
        eta
    }

    fn quiescent_lookup(&self, rows: &[QuiescentRow], v: f64) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let idx = closest_by(rows, |r| r.0, v);
        rows[idx].1
    }
}

impl ConverterModel for Bq25570 {
    fn input_v(&self, v_cap: f64, ocv: Option<f64>, _t: i64) -> f64 {
        if self.bypass_boost_converter {
            return v_cap;
        }
        match self.state() {
            Bq25570State::ColdStart => 0.33,
            Bq25570State::Charging | Bq25570State::Undervoltage => ocv.unwrap_or(0.0) * self.mpp,
            Bq25570State::Overvoltage => 0.0,
        }
    }

    fn input_eta(&mut self, v_in: f64, i_in: f64) -> f64 {
        if self.bypass_boost_converter {
            return 1.0;
        }
        match self.state() {
            Bq25570State::ColdStart => 0.06,
            Bq25570State::Charging | Bq25570State::Undervoltage => self.boost_efficiency(v_in, i_in),
            Bq25570State::Overvoltage => 1.0,
        }
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        match self.state() {
            Bq25570State::ColdStart | Bq25570State::Undervoltage => 0.0,
            Bq25570State::Charging | Bq25570State::Overvoltage => {
                if self.vout_on { v_cap.min(self.v_out) } else { 0.0 }
            }
        }
    }

    fn output_eta(&mut self, v_cap: f64, i_out: f64) -> f64 {
        match self.state() {
            Bq25570State::ColdStart | Bq25570State::Undervoltage => 1.0,
            Bq25570State::Charging | Bq25570State::Overvoltage => self.buck_efficiency(v_cap, i_out),
        }
    }

    fn quiescent(&self, v_cap: f64) -> f64 {
        match self.state() {
            Bq25570State::ColdStart => 0.0,
            Bq25570State::Undervoltage => self.quiescent_lookup(&self.quiescent_standby, v_cap),
            Bq25570State::Charging | Bq25570State::Overvoltage => {
                self.quiescent_lookup(&self.quiescent_active, v_cap)
            }
        }
    }

    fn turn_off(&mut self, _v_cap: f64) {}

    fn update(&mut self, _t: i64, _dt: i64, v_cap: f64) {
        self.v_stor = v_cap;
        if self.vout_ok_enable {
            if self.vout_on && v_cap <= self.vout_ok_low {
                self.vout_on = false;
            } else if !self.vout_on && v_cap >= self.vout_ok_high {
                self.vout_on = true;
            }
        }
    }

    fn next_threshold(&self, v_cap: f64, current_sign: f64) -> Option<f64> {
        self.vm.next_threshold(v_cap, current_sign)
    }

    fn reset(&mut self, v_cap: f64) {
        self.v_stor = v_cap;
        self.vout_on = v_cap > self.vout_ok_high;
        self.boost_cache = None;
        self.buck_cache = None;
    }
}

/// Tagged union over the converter variants, dispatched via `ConverterModel`.
#[derive(Debug, Clone)]
pub enum Converter {
    Diode(Diode),
    Hysteresis(Hysteresis),
    Ldo(Ldo),
    Buck(BuckConverter),
    BuckBoost(BuckBoost),
    Bq25570(Bq25570),
}

impl ConverterModel for Converter {
    fn input_v(&self, v_cap: f64, ocv: Option<f64>, t: i64) -> f64 {
        match self {
            Self::Diode(c) => c.input_v(v_cap, ocv, t),
            Self::Hysteresis(c) => c.input_v(v_cap, ocv, t),
            Self::Ldo(c) => c.input_v(v_cap, ocv, t),
            Self::Buck(c) => c.input_v(v_cap, ocv, t),
            Self::BuckBoost(c) => c.input_v(v_cap, ocv, t),
            Self::Bq25570(c) => c.input_v(v_cap, ocv, t),
        }
    }

    fn input_eta(&mut self, v_in: f64, i_in: f64) -> f64 {
        match self {
            Self::Diode(c) => c.input_eta(v_in, i_in),
            Self::Hysteresis(c) => c.input_eta(v_in, i_in),
            Self::Ldo(c) => c.input_eta(v_in, i_in),
            Self::Buck(c) => c.input_eta(v_in, i_in),
            Self::BuckBoost(c) => c.input_eta(v_in, i_in),
            Self::Bq25570(c) => c.input_eta(v_in, i_in),
        }
    }

    fn output_v(&self, v_cap: f64) -> f64 {
        match self {
            Self::Diode(c) => c.output_v(v_cap),
            Self::Hysteresis(c) => c.output_v(v_cap),
            Self::Ldo(c) => c.output_v(v_cap),
            Self::Buck(c) => c.output_v(v_cap),
            Self::BuckBoost(c) => c.output_v(v_cap),
            Self::Bq25570(c) => c.output_v(v_cap),
        }
    }

    fn output_eta(&mut self, v_cap: f64, i_out: f64) -> f64 {
        match self {
            Self::Diode(c) => c.output_eta(v_cap, i_out),
            Self::Hysteresis(c) => c.output_eta(v_cap, i_out),
            Self::Ldo(c) => c.output_eta(v_cap, i_out),
            Self::Buck(c) => c.output_eta(v_cap, i_out),
            Self::BuckBoost(c) => c.output_eta(v_cap, i_out),
            Self::Bq25570(c) => c.output_eta(v_cap, i_out),
        }
    }

    fn quiescent(&self, v_cap: f64) -> f64 {
        match self {
            Self::Diode(c) => c.quiescent(v_cap),
            Self::Hysteresis(c) => c.quiescent(v_cap),
            Self::Ldo(c) => c.quiescent(v_cap),
            Self::Buck(c) => c.quiescent(v_cap),
            Self::BuckBoost(c) => c.quiescent(v_cap),
            Self::Bq25570(c) => c.quiescent(v_cap),
        }
    }

    fn turn_off(&mut self, v_cap: f64) {
        match self {
            Self::Diode(c) => c.turn_off(v_cap),
            Self::Hysteresis(c) => c.turn_off(v_cap),
            Self::Ldo(c) => c.turn_off(v_cap),
            Self::Buck(c) => c.turn_off(v_cap),
            Self::BuckBoost(c) => c.turn_off(v_cap),
            Self::Bq25570(c) => c.turn_off(v_cap),
        }
    }

    fn update(&mut self, t: i64, dt: i64, v_cap: f64) {
        match self {
            Self::Diode(c) => c.update(t, dt, v_cap),
            Self::Hysteresis(c) => c.update(t, dt, v_cap),
            Self::Ldo(c) => c.update(t, dt, v_cap),
            Self::Buck(c) => c.update(t, dt, v_cap),
            Self::BuckBoost(c) => c.update(t, dt, v_cap),
            Self::Bq25570(c) => c.update(t, dt, v_cap),
        }
    }

    fn next_threshold(&self, v_cap: f64, current_sign: f64) -> Option<f64> {
        match self {
            Self::Diode(c) => c.next_threshold(v_cap, current_sign),
            Self::Hysteresis(c) => c.next_threshold(v_cap, current_sign),
            Self::Ldo(c) => c.next_threshold(v_cap, current_sign),
            Self::Buck(c) => c.next_threshold(v_cap, current_sign),
            Self::BuckBoost(c) => c.next_threshold(v_cap, current_sign),
            Self::Bq25570(c) => c.next_threshold(v_cap, current_sign),
        }
    }

    fn reset(&mut self, v_cap: f64) {
        match self {
            Self::Diode(c) => c.reset(v_cap),
            Self::Hysteresis(c) => c.reset(v_cap),
            Self::Ldo(c) => c.reset(v_cap),
            Self::Buck(c) => c.reset(v_cap),
            Self::BuckBoost(c) => c.reset(v_cap),
            Self::Bq25570(c) => c.reset(v_cap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diode_cuts_off_above_v_ov() {
        let mut d = Diode {
            v_ov: 3.3,
            i_quiescent: 0.0,
        };
        assert_eq!(d.input_eta(3.0, 0.0), 1.0);
        assert_eq!(d.input_eta(3.3, 0.0), 0.0);
    }

    #[test]
    fn hysteresis_latches() {
        let mut h = Hysteresis::new(5.0, 3.0, 2.0, 1e-6, 0.0);
        h.reset(0.0);
        assert_eq!(h.output_v(2.5), 0.0);
        h.update(0, 1, 3.1);
        assert_eq!(h.output_v(3.1), 3.1);
        h.update(0, 1, 1.9);
        assert_eq!(h.output_v(1.9), 0.0);
    }

    #[test]
    fn ldo_dissipates_excess_voltage() {
        let mut ldo = Ldo::new(1.8, 1e-6, 0.0, None);
        ldo.reset(3.3);
        assert_eq!(ldo.output_v(3.3), 1.8);
        assert!((ldo.output_eta(3.3, 0.0) - 1.8 / 3.3).abs() < 1e-9);
    }

    #[test]
    fn buckboost_uses_consistent_efficiency_names() {
        let mut bb = BuckBoost {
            v_in: 0.0,
            v_out: 0.0,
            efficiency_in: 0.8,
            efficiency_out: 0.9,
            i_quiescent: 0.0,
            v_ov: 4.0,
        };
        assert_eq!(bb.input_eta(3.0, 0.0), 0.8);
        assert_eq!(bb.output_eta(3.0, 0.0), 0.9);
    }

    #[test]
    fn bq25570_state_transitions() {
        let mut bq = Bq25570::new(
            1.8, 0.8, 5.0, 1.8, 1.95, 0.0, 0.0, false, false, vec![], vec![], vec![], vec![],
        );
        bq.reset(1.5);
        assert_eq!(bq.state(), Bq25570State::ColdStart);
        bq.update(0, 1, 2.0);
        assert_eq!(bq.state(), Bq25570State::Undervoltage);
        bq.update(0, 1, 3.0);
        assert_eq!(bq.state(), Bq25570State::Charging);
        bq.update(0, 1, 6.0);
        assert_eq!(bq.state(), Bq25570State::Overvoltage);
    }

    #[test]
    fn bq25570_boost_efficiency_cached() {
        let mut bq = Bq25570::new(
            1.8,
            0.8,
            5.0,
            1.8,
            1.95,
            0.0,
            0.0,
            false,
            false,
            vec![(0.3, 2.0, 50.0, 60.0), (0.3, 2.0, 200.0, 70.0)],
            vec![],
            vec![],
            vec![],
        );
        bq.reset(2.0);
        let eta = bq.boost_efficiency(0.3, 0.00005);
        assert!((eta - 0.60).abs() < 1e-9);
    }
}
