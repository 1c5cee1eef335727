//! DC motor physics simulator.
//!
//! First-order speed response to the applied duty cycle:
//!
//! ```text
//! target = duty · max_speed_rps
//! speed += (target − speed) · dt / (τ + dt)
//! ```
//!
//! Shaft rotation is converted into whole encoder edges (four per encoder
//! cycle); fractional edges carry over to the next update.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

use super::SimError;

/// Motor and encoder geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Encoder cycles (4 edges each) per shaft revolution.
    pub counts_per_rev: u32,
    /// Free-running speed at full duty [rev/s].
    pub max_speed_rps: f64,
    /// Mechanical time constant τ [s].
    pub time_constant_s: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            counts_per_rev: 48,
            max_speed_rps: 5.0,
            time_constant_s: 0.3,
        }
    }
}

impl MotorConfig {
    /// Validate geometry and dynamics.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.counts_per_rev == 0 {
            return Err(SimError::InvalidConfig(
                "counts_per_rev must be > 0".to_string(),
            ));
        }
        if !self.max_speed_rps.is_finite() || self.max_speed_rps <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "max_speed_rps {} must be finite and > 0",
                self.max_speed_rps
            )));
        }
        if !self.time_constant_s.is_finite() || self.time_constant_s < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "time_constant_s {} must be finite and >= 0",
                self.time_constant_s
            )));
        }
        Ok(())
    }

    /// Encoder edges per shaft revolution.
    pub fn edges_per_rev(&self) -> f64 {
        f64::from(self.counts_per_rev) * 4.0
    }
}

/// Motor plant state.
#[derive(Debug, Clone)]
pub struct MotorSimulator {
    config: MotorConfig,
    /// Current shaft speed [rev/s], positive is counter-clockwise.
    speed_rps: f64,
    /// Fractional edges not yet emitted.
    edge_remainder: f64,
}

impl MotorSimulator {
    /// Create a motor at rest.
    pub fn new(config: MotorConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            speed_rps: 0.0,
            edge_remainder: 0.0,
        })
    }

    /// Current speed [rev/s].
    pub fn speed_rps(&self) -> f64 {
        self.speed_rps
    }

    /// Current speed in encoder edges per second.
    pub fn edge_rate(&self) -> f64 {
        self.speed_rps * self.config.edges_per_rev()
    }

    /// Motor configuration.
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Advance the plant by `dt` under `duty` and return the signed number
    /// of encoder edges produced.
    pub fn update(&mut self, duty: f64, dt: Duration) -> i64 {
        let dt_s = dt.as_secs_f64();
        if dt_s <= 0.0 {
            return 0;
        }

        let target = duty.clamp(-1.0, 1.0) * self.config.max_speed_rps;
        let alpha = dt_s / (self.config.time_constant_s + dt_s);
        self.speed_rps += alpha * (target - self.speed_rps);

        self.edge_remainder += self.edge_rate() * dt_s;
        let edges = self.edge_remainder.trunc();
        self.edge_remainder -= edges;

        trace!(
            speed_rps = self.speed_rps,
            edges,
            "motor update"
        );
        edges as i64
    }
}
