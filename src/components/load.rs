//! Load models: current demanded from the rail as a function of voltage
//! and, for the stateful variants, an internal checkpoint/restore or task
//! automaton.

use crate::components::voltage_monitor::{Edge, VoltageMonitor};

/// External signal a load can hand back to the engine from `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSignal {
    ForceOff,
}

/// Shared behavior of the load family.
pub trait LoadModel {
    fn reset(&mut self, v_out_initial: f64, v_cap_initial: f64);
    fn current(&self, v: f64) -> f64;
    fn next_change(&self, t: i64) -> Option<i64>;
    fn update(&mut self, t: i64, dt: i64, v_out: f64, v_cap: f64) -> Option<LoadSignal>;

    /// Next threshold the load's embedded monitor would cross given the
    /// sign of the driving current. `None` for variants with no thresholds.
    fn next_threshold(&self, _v: f64, _current_sign: f64) -> Option<f64> {
        None
    }
}

/// Fixed current whenever the rail is powered.
#[derive(Debug, Clone)]
pub struct ConstantLoad {
    pub current: f64,
}

impl LoadModel for ConstantLoad {
    fn reset(&mut self, _v_out_initial: f64, _v_cap_initial: f64) {}

    fn current(&self, v: f64) -> f64 {
        if v == 0.0 { 0.0 } else { self.current }
    }

    fn next_change(&self, _t: i64) -> Option<i64> {
        None
    }

    fn update(&mut self, _t: i64, _dt: i64, _v_out: f64, _v_cap: f64) -> Option<LoadSignal> {
        None
    }
}

/// A single entry in a [`TaskLoad`]'s task list.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub t_ticks: i64,
    pub current: f64,
}

/// Finite ordered list of tasks, wrapping back to `skip_initial_task` once
/// the list is exhausted.
#[derive(Debug, Clone)]
pub struct TaskLoad {
    pub v_on: f64,
    pub v_off: f64,
    pub i_off: f64,
    pub tasks: Vec<Task>,
    pub skip_initial_task: usize,
    pub shutdown_after_completion: bool,
    state: TaskLoadState,
    current_task: usize,
    next_event_at: Option<i64>,
    task_start: i64,
    vm: VoltageMonitor,
    old_voltage: f64,
    pub stats: TaskLoadStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskLoadState {
    Off,
    Running,
}

#[derive(Debug, Clone, Default)]
pub struct TaskLoadStats {
    pub num_success: u64,
    pub num_fail: u64,
    pub time_wasted: f64,
}

impl TaskLoad {
    pub fn new(
        v_on: f64,
        v_off: f64,
        i_off: f64,
        tasks: Vec<Task>,
        skip_initial_task: usize,
        shutdown_after_completion: bool,
    ) -> Self {
        let mut vm = VoltageMonitor::new();
        vm.register("ON", v_on, Edge::Rising);
        vm.register("OFF", v_off, Edge::Falling);
        Self {
            v_on,
            v_off,
            i_off,
            tasks,
            skip_initial_task,
            shutdown_after_completion,
            state: TaskLoadState::Off,
            current_task: 0,
            next_event_at: None,
            task_start: 0,
            vm,
            old_voltage: 0.0,
            stats: TaskLoadStats::default(),
        }
    }
}

impl LoadModel for TaskLoad {
    fn reset(&mut self, v_out_initial: f64, _v_cap_initial: f64) {
        self.old_voltage = v_out_initial;
        self.current_task = 0;
        self.stats = TaskLoadStats::default();
        if v_out_initial <= self.v_off {
            self.state = TaskLoadState::Off;
            self.next_event_at = None;
        } else {
            self.state = TaskLoadState::Running;
            self.task_start = 0;
            self.next_event_at = Some(self.tasks[0].t_ticks);
        }
    }

    fn current(&self, _v: f64) -> f64 {
        match self.state {
            TaskLoadState::Off => self.i_off,
            TaskLoadState::Running => self.tasks[self.current_task].current,
        }
    }

    fn next_change(&self, t: i64) -> Option<i64> {
        self.next_event_at.map(|at| at - t)
    }

    fn update(&mut self, t: i64, _dt: i64, v_out: f64, _v_cap: f64) -> Option<LoadSignal> {
        let voltage_event = self.vm.event(self.old_voltage, v_out);
        let timer_fired = self.next_event_at == Some(t);
        self.old_voltage = v_out;

        if voltage_event.is_none() && !timer_fired {
            return None;
        }

        if voltage_event.as_deref() == Some("OFF") {
            if !timer_fired {
                self.stats.num_fail += 1;
                self.stats.time_wasted += (t - self.task_start) as f64;
            } else {
                self.stats.num_success += 1;
            }
            self.state = TaskLoadState::Off;
            self.next_event_at = None;
            self.vm.unregister_name("OFF");
            self.vm.register("ON", self.v_on, Edge::Rising);
            return None;
        }

        if voltage_event.as_deref() == Some("ON") {
            self.vm.unregister_name("ON");
            self.vm.register("OFF", self.v_off, Edge::Falling);
            self.current_task = 0;
            self.state = TaskLoadState::Running;
            self.task_start = t;
            self.next_event_at = Some(t + self.tasks[0].t_ticks);
            return None;
        }

        if timer_fired {
            let last = self.current_task == self.tasks.len() - 1;
            if last && self.shutdown_after_completion {
                self.stats.num_success += 1;
                self.state = TaskLoadState::Off;
                self.next_event_at = None;
                self.vm.unregister_name("OFF");
                self.vm.register("ON", self.v_on, Edge::Rising);
                return Some(LoadSignal::ForceOff);
            }
            self.stats.num_success += 1;
            self.current_task = if last { self.skip_initial_task } else { self.current_task + 1 };
            self.task_start = t;
            self.next_event_at = Some(t + self.tasks[self.current_task].t_ticks);
        }
        None
    }

    fn next_threshold(&self, v: f64, current_sign: f64) -> Option<f64> {
        self.vm.next_threshold(v, current_sign)
    }
}

/// States of the checkpoint/restore automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitState {
    Off,
    Restore,
    Compute,
    Checkpoint,
}

#[derive(Debug, Clone, Default)]
pub struct JitLoadStats {
    pub time_off: f64,
    pub time_restore: f64,
    pub time_compute: f64,
    pub time_checkpoint: f64,
    pub time_compute_useful: f64,
    pub num_checkpoint_successful: u64,
    pub num_checkpoint_failed: u64,
    pub num_restore_successful: u64,
    pub num_restore_failed: u64,
}

impl JitLoadStats {
    pub fn forward_progress(&self) -> f64 {
        let denom = self.time_compute + self.time_checkpoint + self.time_restore + self.time_off;
        if denom == 0.0 { 0.0 } else { self.time_compute_useful / denom }
    }
}

/// The checkpoint/restore automaton central to intermittent-computing
/// devices. Currents are keyed by state; `v_checkpoint` is read against
/// the capacitor voltage, not the delivered rail voltage.
#[derive(Debug, Clone)]
pub struct JitLoad {
    pub v_off: f64,
    pub v_on: f64,
    pub v_checkpoint: f64,
    pub i_off: f64,
    pub i_restore: f64,
    pub i_compute: f64,
    pub i_checkpoint: f64,
    pub t_restore: i64,
    pub t_restore_startup: i64,
    pub t_checkpoint: i64,
    pub t_checkpoint_period: i64,
    state: JitState,
    next_event_at: Option<i64>,
    initial_checkpoint_done: bool,
    old_voltage: f64,
    pending_compute_time: f64,
    vm: VoltageMonitor,
    pub stats: JitLoadStats,
}

impl JitLoad {
    pub fn new(
        v_off: f64,
        v_on: f64,
        v_checkpoint: f64,
        i_off: f64,
        i_restore: f64,
        i_compute: f64,
        i_checkpoint: f64,
        t_restore: i64,
        t_restore_startup: i64,
        t_checkpoint: i64,
        t_checkpoint_period: i64,
    ) -> Self {
        Self {
            v_off,
            v_on,
            v_checkpoint,
            i_off,
            i_restore,
            i_compute,
            i_checkpoint,
            t_restore,
            t_restore_startup,
            t_checkpoint,
            t_checkpoint_period,
            state: JitState::Off,
            next_event_at: None,
            initial_checkpoint_done: false,
            old_voltage: 0.0,
            pending_compute_time: 0.0,
            vm: VoltageMonitor::new(),
            stats: JitLoadStats::default(),
        }
    }

    fn register_off_state_thresholds(&mut self) {
        self.vm = VoltageMonitor::new();
        self.vm.register("ON", self.v_on, Edge::Rising);
    }

    fn register_running_thresholds(&mut self, watch_checkpoint: bool) {
        self.vm.unregister_name("ON");
        self.vm.register("OFF", self.v_off, Edge::Falling);
        if watch_checkpoint {
            self.vm.register("CHECKPOINT", self.v_checkpoint, Edge::Falling);
        }
    }
}

impl LoadModel for JitLoad {
    fn reset(&mut self, v_out_initial: f64, _v_cap_initial: f64) {
        self.old_voltage = v_out_initial;
        self.initial_checkpoint_done = false;
        self.pending_compute_time = 0.0;
        self.stats = JitLoadStats::default();
        if v_out_initial > self.v_off {
            self.state = JitState::Restore;
            self.vm = VoltageMonitor::new();
            self.vm.register("OFF", self.v_off, Edge::Falling);
            self.next_event_at = Some(self.t_restore);
        } else {
            self.state = JitState::Off;
            self.register_off_state_thresholds();
            self.next_event_at = None;
        }
    }

    fn current(&self, _v: f64) -> f64 {
        match self.state {
            JitState::Off => self.i_off,
            JitState::Restore => self.i_restore,
            JitState::Compute => self.i_compute,
            JitState::Checkpoint => self.i_checkpoint,
        }
    }

    fn next_change(&self, t: i64) -> Option<i64> {
        self.next_event_at.map(|at| at - t)
    }

    fn update(&mut self, t: i64, dt: i64, v_out: f64, v_cap: f64) -> Option<LoadSignal> {
        let dt_f = dt as f64;
        match self.state {
            JitState::Off => self.stats.time_off += dt_f,
            JitState::Restore => self.stats.time_restore += dt_f,
            JitState::Compute => {
                self.stats.time_compute += dt_f;
                self.pending_compute_time += dt_f;
            }
            JitState::Checkpoint => self.stats.time_checkpoint += dt_f,
        }

        let voltage_event = self.vm.event(self.old_voltage, v_out);
        let timer_fired = self.next_event_at == Some(t);
        self.old_voltage = v_out;

        // A checkpoint is due from the capacitor voltage dropping to the
        // threshold, not from the delivered rail, so that regulated
        // converters (whose output is clamped well below v_checkpoint)
        // still trigger it.
        let checkpoint_due = self.state == JitState::Compute && (timer_fired || v_cap <= self.v_checkpoint);

        if voltage_event.is_none() && !timer_fired && !checkpoint_due {
            return None;
        }

        if voltage_event.as_deref() == Some("OFF") {
            match self.state {
                JitState::Checkpoint => self.stats.num_checkpoint_failed += 1,
                JitState::Restore => self.stats.num_restore_failed += 1,
                _ => {}
            }
            self.pending_compute_time = 0.0;
            self.state = JitState::Off;
            self.register_off_state_thresholds();
            self.next_event_at = None;
            return None;
        }

        if voltage_event.as_deref() == Some("ON") {
            self.register_running_thresholds(false);
            self.state = JitState::Restore;
            let restore_ticks = if self.initial_checkpoint_done {
                self.t_restore
            } else {
                self.t_restore_startup
            };
            self.next_event_at = Some(t + restore_ticks);
            return None;
        }

        if checkpoint_due {
            self.state = JitState::Checkpoint;
            self.next_event_at = Some(t + self.t_checkpoint);
            return None;
        }

        if timer_fired {
            match self.state {
                JitState::Restore => {
                    self.initial_checkpoint_done = true;
                    self.stats.num_restore_successful += 1;
                    self.state = JitState::Compute;
                    self.register_running_thresholds(true);
                    if v_cap <= self.v_checkpoint {
                        self.next_event_at = Some(t + 1);
                    } else {
                        self.next_event_at = None;
                    }
                }
                JitState::Checkpoint => {
                    self.stats.num_checkpoint_successful += 1;
                    self.stats.time_compute_useful += self.pending_compute_time;
                    self.pending_compute_time = 0.0;
                    self.state = JitState::Compute;
                    self.vm.unregister_name("CHECKPOINT");
                    self.next_event_at = Some(t + self.t_checkpoint_period);
                }
                _ => {}
            }
        }
        None
    }

    fn next_threshold(&self, v: f64, current_sign: f64) -> Option<f64> {
        self.vm.next_threshold(v, current_sign)
    }
}

/// Finite-duration task that must complete within `t_task` ticks of being
/// started or it counts as a failure.
#[derive(Debug, Clone)]
pub struct Atomic {
    pub i_active: f64,
    pub t_active: i64,
    next_update: Option<i64>,
    pub num_successful: u64,
    pub num_failed: u64,
}

impl Atomic {
    pub fn new(i_active: f64, t_active: i64) -> Self {
        Self {
            i_active,
            t_active,
            next_update: None,
            num_successful: 0,
            num_failed: 0,
        }
    }
}

/// Idle-constant background task, never completes or fails.
#[derive(Debug, Clone)]
pub struct Computation {
    pub i_active: f64,
}

/// The nested application an [`AdvancedJitLoad`] hosts while `ON`.
#[derive(Debug, Clone)]
pub enum Application {
    Computation(Computation),
    Atomic(Atomic),
}

impl Application {
    fn current(&self) -> f64 {
        match self {
            Self::Computation(c) => c.i_active,
            Self::Atomic(a) => a.i_active,
        }
    }

    fn start(&mut self, t: i64) {
        if let Self::Atomic(a) = self {
            a.next_update = Some(t + a.t_active);
        }
    }

    fn stop(&mut self, t: i64) {
        if let Self::Atomic(a) = self {
            if let Some(next) = a.next_update {
                if t >= next {
                    a.num_successful += 1;
                } else {
                    a.num_failed += 1;
                }
            }
            a.next_update = None;
        }
    }

    fn proceed(&mut self, t: i64) {
        if let Self::Atomic(a) = self {
            if let Some(next) = a.next_update {
                if t > next {
                    a.num_successful += 1;
                    a.next_update = Some(t + a.t_active);
                }
            }
        }
    }

    fn next_change(&self, _t: i64) -> Option<i64> {
        match self {
            Self::Computation(_) => None,
            Self::Atomic(a) => a.next_update,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvancedJitState {
    Off,
    On,
    Restore,
    Save,
}

/// Three-phase automaton (`OFF / RESTORE / ON / SAVE`) hosting a nested
/// [`Application`]; board-voltage thresholds take priority over whatever
/// the application was about to do.
#[derive(Debug, Clone)]
pub struct AdvancedJitLoad {
    pub v_restore: f64,
    pub v_save: f64,
    pub v_min: f64,
    pub t_restore: i64,
    pub t_save: i64,
    pub i_off: f64,
    pub i_restore: f64,
    pub i_save: f64,
    pub application: Application,
    state: AdvancedJitState,
    next_event_at: Option<i64>,
    old_voltage: f64,
    old_cap_voltage: f64,
    vm: VoltageMonitor,
    pub max_off_time: f64,
    off_start: i64,
}

impl AdvancedJitLoad {
    pub fn new(
        v_restore: f64,
        v_save: f64,
        v_min: f64,
        t_restore: i64,
        t_save: i64,
        i_off: f64,
        i_restore: f64,
        i_save: f64,
        application: Application,
    ) -> Self {
        let mut vm = VoltageMonitor::new();
        vm.register("RESTORE", v_restore, Edge::Rising);
        vm.register("SAVE", v_save, Edge::Falling);
        vm.register("OFF", v_min, Edge::Falling);
        Self {
            v_restore,
            v_save,
            v_min,
            t_restore,
            t_save,
            i_off,
            i_restore,
            i_save,
            application,
            state: AdvancedJitState::Off,
            next_event_at: None,
            old_voltage: 0.0,
            old_cap_voltage: 0.0,
            vm,
            max_off_time: 0.0,
            off_start: 0,
        }
    }
}

impl LoadModel for AdvancedJitLoad {
    fn reset(&mut self, v_out_initial: f64, v_cap_initial: f64) {
        self.old_voltage = v_out_initial;
        self.old_cap_voltage = v_cap_initial;
        self.max_off_time = 0.0;
        self.state = AdvancedJitState::Off;
        self.next_event_at = None;
        self.off_start = 0;
    }

    fn current(&self, _v: f64) -> f64 {
        match self.state {
            AdvancedJitState::Off => self.i_off,
            AdvancedJitState::On => self.application.current(),
            AdvancedJitState::Restore => self.i_restore,
            AdvancedJitState::Save => self.i_save,
        }
    }

    fn next_change(&self, t: i64) -> Option<i64> {
        match self.state {
            AdvancedJitState::On => self.application.next_change(t).map(|at| at - t),
            _ => self.next_event_at.map(|at| at - t),
        }
    }

    fn update(&mut self, t: i64, _dt: i64, v_out: f64, v_cap: f64) -> Option<LoadSignal> {
        let cap_event = if v_out > self.v_min {
            let ev = self.vm.event(self.old_cap_voltage, v_cap);
            self.old_cap_voltage = v_cap;
            ev
        } else {
            self.old_cap_voltage = 0.0;
            None
        };
        let board_events = self.vm.events(self.old_voltage, v_out);
        let board_event = board_events.last().cloned();
        self.old_voltage = v_out;
        let timer_fired = self.next_event_at == Some(t);

        if cap_event.is_none() && board_event.is_none() && !timer_fired {
            return None;
        }

        match self.state {
            AdvancedJitState::Restore => {
                if board_event.as_deref() == Some("OFF") {
                    self.state = AdvancedJitState::Off;
                    self.next_event_at = None;
                    self.off_start = t;
                    return Some(LoadSignal::ForceOff);
                }
                if cap_event.as_deref() == Some("SAVE") {
                    self.state = AdvancedJitState::Save;
                    self.next_event_at = Some(t + self.t_save);
                } else if timer_fired {
                    self.state = AdvancedJitState::On;
                    self.application.start(t);
                    self.next_event_at = self.application.next_change(t);
                    let off_elapsed = (t - self.off_start) as f64;
                    if off_elapsed > self.max_off_time {
                        self.max_off_time = off_elapsed;
                    }
                }
            }
            AdvancedJitState::Save => {
                if timer_fired || board_event.as_deref() == Some("OFF") {
                    self.state = AdvancedJitState::Off;
                    self.next_event_at = None;
                    self.off_start = t;
                }
            }
            AdvancedJitState::Off => {
                if board_event.as_deref() == Some("RESTORE") {
                    self.state = AdvancedJitState::Restore;
                    self.next_event_at = Some(t + self.t_restore);
                }
            }
            AdvancedJitState::On => {
                if timer_fired {
                    self.application.proceed(t);
                    self.next_event_at = self.application.next_change(t);
                }
                if board_event.as_deref() == Some("OFF") {
                    self.application.stop(t);
                    self.state = AdvancedJitState::Off;
                    self.next_event_at = None;
                    self.off_start = t;
                    return Some(LoadSignal::ForceOff);
                }
                if cap_event.as_deref() == Some("SAVE") {
                    self.application.stop(t);
                    self.state = AdvancedJitState::Save;
                    self.next_event_at = Some(t + self.t_save);
                    self.off_start = t;
                }
            }
        }
        None
    }

    fn next_threshold(&self, v: f64, current_sign: f64) -> Option<f64> {
        self.vm.next_threshold(v, current_sign)
    }
}

/// Tagged union over the load variants, dispatched via `LoadModel`.
#[derive(Debug, Clone)]
pub enum Load {
    Constant(ConstantLoad),
    Task(TaskLoad),
    Jit(JitLoad),
    AdvancedJit(AdvancedJitLoad),
}

impl LoadModel for Load {
    fn reset(&mut self, v_out_initial: f64, v_cap_initial: f64) {
        match self {
            Self::Constant(l) => l.reset(v_out_initial, v_cap_initial),
            Self::Task(l) => l.reset(v_out_initial, v_cap_initial),
            Self::Jit(l) => l.reset(v_out_initial, v_cap_initial),
            Self::AdvancedJit(l) => l.reset(v_out_initial, v_cap_initial),
        }
    }

    fn current(&self, v: f64) -> f64 {
        match self {
            Self::Constant(l) => l.current(v),
            Self::Task(l) => l.current(v),
            Self::Jit(l) => l.current(v),
            Self::AdvancedJit(l) => l.current(v),
        }
    }

    fn next_change(&self, t: i64) -> Option<i64> {
        match self {
            Self::Constant(l) => l.next_change(t),
            Self::Task(l) => l.next_change(t),
            Self::Jit(l) => l.next_change(t),
            Self::AdvancedJit(l) => l.next_change(t),
        }
    }

    fn update(&mut self, t: i64, dt: i64, v_out: f64, v_cap: f64) -> Option<LoadSignal> {
        match self {
            Self::Constant(l) => l.update(t, dt, v_out, v_cap),
            Self::Task(l) => l.update(t, dt, v_out, v_cap),
            Self::Jit(l) => l.update(t, dt, v_out, v_cap),
            Self::AdvancedJit(l) => l.update(t, dt, v_out, v_cap),
        }
    }

    fn next_threshold(&self, v: f64, current_sign: f64) -> Option<f64> {
        match self {
            Self::Constant(l) => l.next_threshold(v, current_sign),
            Self::Task(l) => l.next_threshold(v, current_sign),
            Self::Jit(l) => l.next_threshold(v, current_sign),
            Self::AdvancedJit(l) => l.next_threshold(v, current_sign),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_load_zero_when_unpowered() {
        let l = ConstantLoad { current: 1e-3 };
        assert_eq!(l.current(0.0), 0.0);
        assert_eq!(l.current(3.0), 1e-3);
    }

    #[test]
    fn task_load_advances_through_tasks() {
        let tasks = vec![
            Task { name: "A".into(), t_ticks: 10, current: 1e-3 },
            Task { name: "B".into(), t_ticks: 20, current: 2e-3 },
        ];
        let mut load = TaskLoad::new(2.0, 1.0, 0.0, tasks, 0, false);
        load.reset(3.0, 3.0);
        assert_eq!(load.next_change(0), Some(10));
        load.update(10, 10, 3.0, 3.0);
        assert_eq!(load.current(3.0), 2e-3);
    }

    #[test]
    fn task_load_records_failure_on_voltage_drop() {
        let tasks = vec![Task { name: "A".into(), t_ticks: 100, current: 1e-3 }];
        let mut load = TaskLoad::new(2.0, 1.0, 0.0, tasks, 0, false);
        load.reset(3.0, 3.0);
        load.update(50, 50, 0.5, 0.5);
        assert_eq!(load.stats.num_fail, 1);
    }

    #[test]
    fn jit_load_restores_then_computes() {
        let mut load = JitLoad::new(1.0, 2.0, 1.5, 0.0, 1e-4, 5e-4, 2e-4, 10, 20, 5, 100);
        load.reset(0.0, 0.0);
        assert_eq!(load.current(0.0), load.i_off);
        load.update(0, 0, 0.0, 0.0);
        load.update(1, 1, 2.5, 2.5);
        assert_eq!(load.next_change(1), Some(19));
        load.update(20, 19, 2.5, 2.5);
        assert_eq!(load.stats.num_restore_successful, 1);
    }

    #[test]
    fn jit_load_counts_restore_failure_on_dropout() {
        let mut load = JitLoad::new(1.0, 2.0, 1.5, 0.0, 1e-4, 5e-4, 2e-4, 10, 20, 5, 100);
        load.reset(0.0, 0.0);
        load.update(0, 0, 2.5, 2.5);
        load.update(5, 5, 0.5, 0.5);
        assert_eq!(load.stats.num_restore_failed, 1);
    }

    #[test]
    fn atomic_application_fails_late_proceed() {
        let mut app = Atomic::new(1e-3, 10);
        app.start(0);
        app.proceed(15);
        assert_eq!(app.num_successful, 1);
    }
}
