//! Simulated PWM output stage.

use std::sync::atomic::{AtomicU64, Ordering};

use kenbot_common::hal::PwmOutput;

/// Lock-free duty-cycle register.
///
/// The duty cycle is stored as `f64` bits and clamped to `[-1, 1]` on write;
/// non-finite writes are treated as zero drive.
#[derive(Debug)]
pub struct SimulatedPwm {
    duty_bits: AtomicU64,
}

impl SimulatedPwm {
    /// Create a stage with zero drive.
    pub fn new() -> Self {
        Self {
            duty_bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }
}

impl Default for SimulatedPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmOutput for SimulatedPwm {
    fn set_duty_cycle(&self, duty: f64) {
        let duty = if duty.is_finite() {
            duty.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        self.duty_bits.store(duty.to_bits(), Ordering::Release);
    }

    fn duty_cycle(&self) -> f64 {
        f64::from_bits(self.duty_bits.load(Ordering::Acquire))
    }
}
