//! Ordered rising/falling threshold registry shared by capacitors,
//! converters, and loads.
//!
//! Backed by `BTreeMap` rather than a hash map because the contract needs
//! ordered predecessor/successor queries in O(log n); `ordered_float`
//! supplies `Ord` for the `f64` voltage keys.

use std::collections::Bound::{Excluded, Unbounded};
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

/// Which direction(s) a threshold should fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// Tracks named voltage thresholds and answers next-crossing queries.
///
/// Each direction's map holds at most one entry per registered event name;
/// re-registering a name removes any prior entry for it in that direction.
#[derive(Debug, Clone, Default)]
pub struct VoltageMonitor {
    rising: BTreeMap<OrderedFloat<f64>, String>,
    falling: BTreeMap<OrderedFloat<f64>, String>,
}

impl VoltageMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor mirroring the source's `default_thresholds`
    /// list of `(name, voltage, edge)` triples.
    pub fn with_thresholds(thresholds: &[(&str, f64, Edge)]) -> Self {
        let mut monitor = Self::new();
        for &(name, v, edge) in thresholds {
            monitor.register(name, v, edge);
        }
        monitor
    }

    pub fn register(&mut self, name: &str, v: f64, edge: Edge) {
        if matches!(edge, Edge::Rising | Edge::Both) {
            self.rising.insert(OrderedFloat(v), name.to_string());
        }
        if matches!(edge, Edge::Falling | Edge::Both) {
            self.falling.insert(OrderedFloat(v), name.to_string());
        }
    }

    /// Removes every threshold (in both directions) registered under `name`.
    pub fn unregister_name(&mut self, name: &str) {
        self.rising.retain(|_, n| n != name);
        self.falling.retain(|_, n| n != name);
    }

    /// Removes the threshold at exactly `v`, in both directions.
    pub fn unregister_voltage(&mut self, v: f64) {
        self.rising.remove(&OrderedFloat(v));
        self.falling.remove(&OrderedFloat(v));
    }

    /// Next threshold reachable from `v` given the sign of the driving
    /// current: strictly greater (rising) if positive, strictly smaller
    /// (falling) if negative. `None` for a zero sign or an empty map.
    pub fn next_threshold(&self, v: f64, current_sign: f64) -> Option<f64> {
        if current_sign > 0.0 {
            self.rising
                .range((Excluded(OrderedFloat(v)), Unbounded))
                .next()
                .map(|(k, _)| k.0)
        } else if current_sign < 0.0 {
            self.falling
                .range((Unbounded, Excluded(OrderedFloat(v))))
                .next_back()
                .map(|(k, _)| k.0)
        } else {
            None
        }
    }

    /// The single threshold crossed moving from `v_old` to `v_new`, if any.
    /// Only the first crossing is reported — callers that need every
    /// crossed threshold should use [`events`](Self::events).
    pub fn event(&self, v_old: f64, v_new: f64) -> Option<String> {
        if v_new > v_old {
            let nt = self.next_threshold(v_old, 1.0)?;
            if v_new >= nt {
                return self.rising.get(&OrderedFloat(nt)).cloned();
            }
        } else if v_new < v_old {
            let nt = self.next_threshold(v_old, -1.0)?;
            if v_new <= nt {
                return self.falling.get(&OrderedFloat(nt)).cloned();
            }
        }
        None
    }

    /// Every threshold crossed moving from `v_old` to `v_new`, in the order
    /// they were crossed.
    pub fn events(&self, v_old: f64, v_new: f64) -> Vec<String> {
        let mut out = Vec::new();
        if v_new > v_old {
            let mut cur = v_old;
            while let Some(nt) = self.next_threshold(cur, 1.0) {
                if v_new < nt {
                    break;
                }
                out.push(self.rising[&OrderedFloat(nt)].clone());
                cur = nt;
            }
        } else if v_new < v_old {
            let mut cur = v_old;
            while let Some(nt) = self.next_threshold(cur, -1.0) {
                if v_new > nt {
                    break;
                }
                out.push(self.falling[&OrderedFloat(nt)].clone());
                cur = nt;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VoltageMonitor {
        VoltageMonitor::with_thresholds(&[("ON", 3.0, Edge::Rising), ("OFF", 2.4, Edge::Falling)])
    }

    #[test]
    fn events_rising_and_falling() {
        let vm = sample();
        assert_eq!(vm.events(2.0, 3.5), vec!["ON".to_string()]);
        assert_eq!(vm.events(3.5, 2.0), vec!["OFF".to_string()]);
    }

    #[test]
    fn next_threshold_both_directions() {
        let vm = sample();
        assert_eq!(vm.next_threshold(2.5, 1.0), Some(3.0));
        assert_eq!(vm.next_threshold(2.5, -1.0), Some(2.4));
    }

    #[test]
    fn tie_at_exact_threshold_counts_as_crossed() {
        let vm = sample();
        assert_eq!(vm.event(2.0, 3.0), Some("ON".to_string()));
    }

    #[test]
    fn unregister_by_name_clears_both_directions() {
        let mut vm = VoltageMonitor::with_thresholds(&[("BOTH", 2.8, Edge::Both)]);
        vm.unregister_name("BOTH");
        assert_eq!(vm.next_threshold(2.0, 1.0), None);
        assert_eq!(vm.next_threshold(3.0, -1.0), None);
    }

    #[test]
    fn no_crossing_when_staying_below_threshold() {
        let vm = sample();
        assert!(vm.events(2.0, 2.5).is_empty());
    }

    #[test]
    fn multiple_thresholds_crossed_in_one_jump() {
        let mut vm = VoltageMonitor::new();
        vm.register("A", 1.0, Edge::Rising);
        vm.register("B", 2.0, Edge::Rising);
        vm.register("C", 3.0, Edge::Rising);
        assert_eq!(
            vm.events(0.0, 3.5),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
    }
}
