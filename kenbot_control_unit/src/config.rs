//! Control-unit configuration file (`cu.toml`).
//!
//! Every section is optional and falls back to its defaults; unknown keys are
//! rejected. [`load_config`] parses and validates in one step.

use std::path::Path;

use kenbot_common::config::{ConfigError, ConfigLoader, SharedConfig};
use kenbot_common::consts::{COMPUTE_HZ_MAX, COMPUTE_HZ_MIN, DEFAULT_COMPUTE_HZ};
use kenbot_hal::MotorConfig;
use serde::{Deserialize, Serialize};

use crate::control::pid::PidParameters;
use crate::encoder::EncodingMode;

// ─── Sections ───────────────────────────────────────────────────────

/// `[encoder]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Decoding resolution.
    pub mode: EncodingMode,
    /// Scale applied to each pulse by the velocity source.
    pub units_per_pulse: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: EncodingMode::default(),
            units_per_pulse: 1.0,
        }
    }
}

/// `[pid]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub pv_min: f64,
    pub pv_max: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Compute rate [Hz].
    pub compute_hz: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        let p = PidParameters::default();
        Self {
            kp: p.kp,
            ki: p.ki,
            kd: p.kd,
            pv_min: p.pv_min,
            pv_max: p.pv_max,
            out_min: p.out_min,
            out_max: p.out_max,
            compute_hz: DEFAULT_COMPUTE_HZ,
        }
    }
}

impl PidConfig {
    /// Gains and bounds as controller parameters.
    pub fn parameters(&self) -> PidParameters {
        PidParameters {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            pv_min: self.pv_min,
            pv_max: self.pv_max,
            out_min: self.out_min,
            out_max: self.out_max,
        }
    }
}

/// `[simulation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub counts_per_rev: u32,
    pub max_speed_rps: f64,
    pub time_constant_s: f64,
    /// Probability that an emitted edge is followed by a spurious glitch pair.
    pub bounce_probability: f64,
    /// Simulation tick period [ms].
    pub tick_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let m = MotorConfig::default();
        Self {
            counts_per_rev: m.counts_per_rev,
            max_speed_rps: m.max_speed_rps,
            time_constant_s: m.time_constant_s,
            bounce_probability: 0.0,
            tick_ms: 1,
        }
    }
}

impl SimulationConfig {
    /// Motor model parameters.
    pub fn motor(&self) -> MotorConfig {
        MotorConfig {
            counts_per_rev: self.counts_per_rev,
            max_speed_rps: self.max_speed_rps,
            time_constant_s: self.time_constant_s,
        }
    }
}

/// `[profile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Time each setpoint level is held [ms].
    pub period_ms: u64,
    /// Levels between the bottom and the top of the ramp.
    pub steps: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            steps: 20,
        }
    }
}

// ─── Root ───────────────────────────────────────────────────────────

/// Root of `cu.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlUnitConfig {
    pub shared: SharedConfig,
    pub encoder: EncoderConfig,
    pub pid: PidConfig,
    pub simulation: SimulationConfig,
    pub profile: ProfileConfig,
}

impl ControlUnitConfig {
    /// Check every section.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let upp = self.encoder.units_per_pulse;
        if !upp.is_finite() || upp == 0.0 {
            return Err(invalid(format!(
                "encoder.units_per_pulse must be finite and non-zero, got {upp}"
            )));
        }

        self.pid
            .parameters()
            .validate()
            .map_err(|e| invalid(format!("pid: {e}")))?;
        let hz = self.pid.compute_hz;
        if !hz.is_finite() || !(COMPUTE_HZ_MIN..=COMPUTE_HZ_MAX).contains(&hz) {
            return Err(invalid(format!(
                "pid.compute_hz must be in [{COMPUTE_HZ_MIN}, {COMPUTE_HZ_MAX}], got {hz}"
            )));
        }

        self.simulation
            .motor()
            .validate()
            .map_err(|e| invalid(format!("simulation: {e}")))?;
        let p = self.simulation.bounce_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid(format!(
                "simulation.bounce_probability must be in [0, 1], got {p}"
            )));
        }
        if self.simulation.tick_ms == 0 {
            return Err(invalid("simulation.tick_ms must be > 0".to_string()));
        }

        if self.profile.period_ms == 0 {
            return Err(invalid("profile.period_ms must be > 0".to_string()));
        }
        if self.profile.steps == 0 {
            return Err(invalid("profile.steps must be > 0".to_string()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

/// Load and validate a control-unit config file.
pub fn load_config(path: &Path) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
