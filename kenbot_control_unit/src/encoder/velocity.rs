//! Pulse-rate velocity estimate.
//!
//! Differences an encoder's pulse count between successive reads. Intended
//! to be sampled by the PID once per compute cycle, so the averaging window
//! equals the compute period.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::control::clock::{Clock, MonotonicClock};
use crate::control::io::ProcessVariableSource;

use super::RotaryEncoder;

struct Sample {
    at: Instant,
    pulses: i64,
    rate: f64,
}

/// Velocity in `units_per_pulse` units per second, derived from a shared encoder.
///
/// The first read only establishes a baseline and returns `0.0`. Resetting
/// the encoder between two reads shows up as one spurious sample.
pub struct PulseVelocity {
    encoder: Arc<dyn RotaryEncoder>,
    clock: Arc<dyn Clock>,
    units_per_pulse: f64,
    last: Mutex<Option<Sample>>,
}

impl PulseVelocity {
    /// Pulses per second on the system clock.
    pub fn new<E: RotaryEncoder + 'static>(encoder: Arc<E>) -> Self {
        Self::with_clock(encoder, Arc::new(MonotonicClock))
    }

    /// Pulses per second measured on `clock`.
    pub fn with_clock<E>(encoder: Arc<E>, clock: Arc<dyn Clock>) -> Self
    where
        E: RotaryEncoder + 'static,
    {
        Self {
            encoder,
            clock,
            units_per_pulse: 1.0,
            last: Mutex::new(None),
        }
    }

    /// Scale each pulse to `units` (e.g. millimetres of wheel travel).
    pub fn with_units_per_pulse(mut self, units: f64) -> Self {
        self.units_per_pulse = units;
        self
    }

    /// Sample the encoder and return the rate since the previous sample.
    pub fn sample(&self) -> f64 {
        let now = self.clock.now();
        let pulses = self.encoder.pulses();
        let mut last = self.last.lock();

        let rate = match last.as_ref() {
            None => 0.0,
            Some(prev) => {
                let dt = now.saturating_duration_since(prev.at).as_secs_f64();
                if dt > 0.0 {
                    pulses.wrapping_sub(prev.pulses) as f64 * self.units_per_pulse / dt
                } else {
                    prev.rate
                }
            }
        };

        *last = Some(Sample {
            at: now,
            pulses,
            rate,
        });
        rate
    }
}

impl ProcessVariableSource for PulseVelocity {
    fn read_pv(&self) -> f64 {
        self.sample()
    }
}
