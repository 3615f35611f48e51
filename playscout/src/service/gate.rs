//! Network trigger throttle.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::geo::{distance_m, GeoPoint};

/// Throttles actual network triggers during continuous panning.
///
/// A trigger is admitted when the minimum interval since the last admitted
/// trigger has elapsed AND the center has moved at least the minimum
/// distance. The first trigger always passes. This sits behind the UI
/// layer's debounce; the gate bounds network load, the debounce bounds
/// event churn.
pub struct TriggerGate {
    min_interval: Duration,
    min_movement_m: f64,
    last: Mutex<Option<(Instant, GeoPoint)>>,
}

impl TriggerGate {
    pub fn new(min_interval: Duration, min_movement_m: f64) -> Self {
        Self {
            min_interval,
            min_movement_m,
            last: Mutex::new(None),
        }
    }

    /// Decides whether a fetch for this center should go out now, and if
    /// so records it as the last admitted trigger.
    pub fn should_trigger(&self, center: GeoPoint) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            None => {
                *last = Some((now, center));
                true
            }
            Some((at, from)) => {
                if now.duration_since(at) < self.min_interval {
                    return false;
                }
                if distance_m(from, center) < self.min_movement_m {
                    return false;
                }
                *last = Some((now, center));
                true
            }
        }
    }

    /// Clears the gate (e.g. after the user explicitly refreshes).
    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_first_trigger_always_passes() {
        let gate = TriggerGate::new(Duration::from_secs(3), 100.0);
        assert!(gate.should_trigger(point(38.7, -9.1)));
    }

    #[test]
    fn test_rapid_retrigger_is_blocked() {
        let gate = TriggerGate::new(Duration::from_secs(3), 100.0);
        assert!(gate.should_trigger(point(38.7, -9.1)));
        // Well within the interval, even with large movement.
        assert!(!gate.should_trigger(point(39.7, -9.1)));
    }

    #[test]
    fn test_small_movement_is_blocked_after_interval() {
        let gate = TriggerGate::new(Duration::ZERO, 100.0);
        assert!(gate.should_trigger(point(38.7, -9.1)));
        // ~11m north: under the movement threshold.
        assert!(!gate.should_trigger(point(38.7001, -9.1)));
    }

    #[test]
    fn test_sufficient_movement_passes_after_interval() {
        let gate = TriggerGate::new(Duration::ZERO, 100.0);
        assert!(gate.should_trigger(point(38.7, -9.1)));
        // ~1.1km north.
        assert!(gate.should_trigger(point(38.71, -9.1)));
    }

    #[test]
    fn test_reset_clears_state() {
        let gate = TriggerGate::new(Duration::from_secs(3600), 100.0);
        assert!(gate.should_trigger(point(38.7, -9.1)));
        assert!(!gate.should_trigger(point(38.7, -9.1)));
        gate.reset();
        assert!(gate.should_trigger(point(38.7, -9.1)));
    }

    #[test]
    fn test_blocked_trigger_does_not_advance_baseline() {
        let gate = TriggerGate::new(Duration::ZERO, 100.0);
        assert!(gate.should_trigger(point(38.7, -9.1)));
        // Two ~60m steps: each alone is under the threshold, but the
        // second is ~120m from the last ADMITTED trigger and passes.
        assert!(!gate.should_trigger(point(38.70055, -9.1)));
        assert!(gate.should_trigger(point(38.7011, -9.1)));
    }
}
