//! # Kenbot Control Unit Library
//!
//! Drive-wheel control for the Kenbot robot: a quadrature decoder turns
//! encoder edges into a signed pulse count, and a fixed-rate PID controller
//! turns a measured velocity and a setpoint into a motor duty cycle.
//!
//! ## Concurrency Domains
//!
//! 1. **Edge callbacks**: [`encoder::QuadratureDecoder::process_readings`]
//!    runs in the driver's signal context. Short, allocation-free, guarded by
//!    a single mutex shared with every reader.
//! 2. **Periodic compute**: [`cycle::PidController`] owns one dedicated
//!    thread per enable that wakes on a fixed cadence and runs one compute
//!    step per tick until a cooperative stop flag is cleared.
//!
//! The two components never reference each other. The composition layer
//! (see the `kenbot_control_unit` binary) connects them through
//! [`encoder::PulseVelocity`], which implements the PID's
//! process-variable capability on top of a shared decoder.

pub mod config;
pub mod control;
pub mod cycle;
pub mod encoder;
pub mod error;
pub mod profile;
