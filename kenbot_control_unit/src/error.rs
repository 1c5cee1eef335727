//! Error types for the control unit.
//!
//! Decoder operations never fail; everything here belongs to the PID path.

use thiserror::Error;

/// Errors raised by PID configuration and compute cycles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PidError {
    /// A min/max pair is degenerate or inverted.
    #[error("Invalid {name} range: min {min} must be below max {max}")]
    InvalidRange {
        /// Which range (`pv` or `output`).
        name: &'static str,
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },

    /// A gain or bound is NaN or infinite.
    #[error("Parameter {name} is not finite: {value}")]
    NonFiniteParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// An accessor returned NaN or infinity.
    #[error("{input} reading is not finite: {value}")]
    NonFiniteReading {
        /// Which accessor produced the reading.
        input: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Compute rate outside the accepted band.
    #[error("Compute rate {hz} Hz out of range [{min}, {max}]")]
    InvalidRate {
        /// Requested rate.
        hz: f64,
        /// Lowest accepted rate.
        min: f64,
        /// Highest accepted rate.
        max: f64,
    },

    /// The compute thread could not be started.
    #[error("Failed to spawn compute thread: {0}")]
    Spawn(String),
}

/// Result type for PID operations.
pub type PidResult<T> = Result<T, PidError>;
