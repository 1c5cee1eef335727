//! System-wide constants for the Kenbot workspace.
//!
//! Single source of truth for numeric defaults shared between the control
//! unit and the simulation driver.

/// Default PID compute rate [Hz].
pub const DEFAULT_COMPUTE_HZ: f64 = 1.0;

/// Lowest accepted PID compute rate [Hz].
pub const COMPUTE_HZ_MIN: f64 = 0.01;

/// Highest accepted PID compute rate [Hz].
pub const COMPUTE_HZ_MAX: f64 = 10_000.0;

/// Elapsed time below which the derivative term is skipped [s].
pub const DERIVATIVE_DT_EPSILON: f64 = 1e-6;

/// Lower bound of the normalized control range.
pub const NORMALIZED_MIN: f64 = -1.0;

/// Upper bound of the normalized control range.
pub const NORMALIZED_MAX: f64 = 1.0;

/// Default configuration file path for the control unit binary.
pub const DEFAULT_CONFIG_PATH: &str = "kenbot_control_unit/config/cu.toml";
