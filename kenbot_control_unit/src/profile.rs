//! Stepped triangle-wave setpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::clock::{Clock, MonotonicClock};
use crate::control::io::SetpointSource;

/// Setpoint that climbs from `min` to `max` in `steps` equal steps and back
/// down again, holding each level for `period`.
pub struct SetpointProfile {
    steps: u32,
    period: Duration,
    min: f64,
    max: f64,
    clock: Arc<dyn Clock>,
    start: Instant,
}

impl SetpointProfile {
    /// Profile on the system clock, starting now.
    pub fn new(steps: u32, period: Duration, min: f64, max: f64) -> Self {
        Self::with_clock(steps, period, min, max, Arc::new(MonotonicClock))
    }

    /// Profile measured on `clock`, starting at its current instant.
    ///
    /// `steps` below one is treated as one; a zero `period` holds `min`.
    pub fn with_clock(
        steps: u32,
        period: Duration,
        min: f64,
        max: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let start = clock.now();
        Self {
            steps: steps.max(1),
            period,
            min,
            max,
            clock,
            start,
        }
    }

    /// Index of the current step in `0..2 * steps`.
    pub fn step_index(&self) -> u64 {
        if self.period.is_zero() {
            return 0;
        }
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        let step = elapsed.as_nanos() / self.period.as_nanos();
        (step % (2 * u128::from(self.steps))) as u64
    }

    /// Setpoint for the current instant.
    pub fn value(&self) -> f64 {
        let steps = u64::from(self.steps);
        let k = self.step_index();
        let level = if k <= steps { k } else { 2 * steps - k };
        self.min + (self.max - self.min) * level as f64 / steps as f64
    }
}

impl SetpointSource for SetpointProfile {
    fn read_sp(&self) -> f64 {
        self.value()
    }
}
