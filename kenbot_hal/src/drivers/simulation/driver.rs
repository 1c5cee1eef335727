//! Simulation driver.
//!
//! Couples a [`SimulatedPwm`], a [`MotorSimulator`] and a [`SimulatedEncoder`]
//! and advances them on a background tick thread, so that edge callbacks
//! arrive asynchronously just like pin interrupts on the robot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use kenbot_common::hal::PwmOutput;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{MotorConfig, MotorSimulator, SimulatedEncoder, SimulatedPwm};

/// Error types for the simulation driver.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// Invalid simulation parameter.
    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    /// `start()` called while the tick thread is running.
    #[error("Simulation already running")]
    AlreadyRunning,

    /// Failed to spawn the tick thread.
    #[error("Failed to spawn simulation thread: {0}")]
    Spawn(String),
}

struct TickThread {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Motor + encoder + PWM simulation with an optional free-running tick thread.
pub struct SimulationDriver {
    pwm: Arc<SimulatedPwm>,
    encoder: Arc<SimulatedEncoder>,
    motor: Arc<Mutex<MotorSimulator>>,
    tick: Mutex<Option<TickThread>>,
}

impl SimulationDriver {
    /// Build a driver from motor geometry and an edge-bounce probability.
    pub fn new(config: MotorConfig, bounce_probability: f64) -> Result<Self, SimError> {
        let motor = MotorSimulator::new(config)?;
        let encoder = SimulatedEncoder::new().with_bounce(bounce_probability)?;
        Ok(Self {
            pwm: Arc::new(SimulatedPwm::new()),
            encoder: Arc::new(encoder),
            motor: Arc::new(Mutex::new(motor)),
            tick: Mutex::new(None),
        })
    }

    /// PWM stage driving the simulated motor.
    pub fn pwm(&self) -> Arc<SimulatedPwm> {
        Arc::clone(&self.pwm)
    }

    /// Encoder attached to the simulated shaft.
    pub fn encoder(&self) -> Arc<SimulatedEncoder> {
        Arc::clone(&self.encoder)
    }

    /// Current shaft speed in encoder edges per second.
    pub fn edge_rate(&self) -> f64 {
        self.motor.lock().edge_rate()
    }

    /// Advance the simulation by one step of `dt` on the caller's thread.
    ///
    /// Returns the number of edges emitted.
    pub fn cycle(&self, dt: Duration) -> i64 {
        Self::cycle_inner(&self.pwm, &self.motor, &self.encoder, dt)
    }

    fn cycle_inner(
        pwm: &SimulatedPwm,
        motor: &Mutex<MotorSimulator>,
        encoder: &SimulatedEncoder,
        dt: Duration,
    ) -> i64 {
        let edges = motor.lock().update(pwm.duty_cycle(), dt);
        encoder.advance(edges);
        edges
    }

    /// Start the background tick thread with period `tick`.
    pub fn start(&self, tick: Duration) -> Result<(), SimError> {
        let mut slot = self.tick.lock();
        if slot.is_some() {
            return Err(SimError::AlreadyRunning);
        }
        if tick.is_zero() {
            return Err(SimError::InvalidConfig("tick must be > 0".to_string()));
        }

        let running = Arc::new(AtomicBool::new(true));
        let r = Arc::clone(&running);
        let pwm = Arc::clone(&self.pwm);
        let motor = Arc::clone(&self.motor);
        let encoder = Arc::clone(&self.encoder);

        let handle = std::thread::Builder::new()
            .name("sim-tick".to_string())
            .spawn(move || {
                let mut last = Instant::now();
                while r.load(Ordering::Acquire) {
                    std::thread::sleep(tick);
                    let now = Instant::now();
                    Self::cycle_inner(&pwm, &motor, &encoder, now - last);
                    last = now;
                }
                debug!("simulation tick thread exiting");
            })
            .map_err(|e| SimError::Spawn(e.to_string()))?;

        info!(tick_us = tick.as_micros() as u64, "simulation started");
        *slot = Some(TickThread { running, handle });
        Ok(())
    }

    /// Stop the tick thread and wait for it to exit. No-op if not running.
    pub fn stop(&self) {
        let Some(thread) = self.tick.lock().take() else {
            return;
        };
        thread.running.store(false, Ordering::Release);
        if thread.handle.join().is_err() {
            warn!("simulation tick thread panicked");
        }
        info!("simulation stopped");
    }

    /// Whether the tick thread is running.
    pub fn is_running(&self) -> bool {
        self.tick.lock().is_some()
    }
}

impl Drop for SimulationDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
