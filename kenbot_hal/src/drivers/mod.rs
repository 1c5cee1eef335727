//! HAL driver implementations.
//!
//! - [`simulation`] - Software simulation driver for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `DigitalInput`, `EdgeSource` and `PwmOutput` from `kenbot_common::hal`
//! 3. Add export and documentation

pub mod simulation;
