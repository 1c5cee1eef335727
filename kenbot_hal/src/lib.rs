//! # Kenbot HAL Library
//!
//! Hardware drivers implementing the contracts in `kenbot_common::hal`.
//!
//! # Module Structure
//!
//! - [`drivers`] - Driver implementations (currently only [`drivers::simulation`])
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  SimulationDriver (tick thread)              │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────────┐  │
//! │  │ SimulatedPwm │──►│ MotorSimulator │──►│ SimulatedEnc.  │──┼──► edge callbacks
//! │  │ (duty cycle) │   │ (1st-order)    │   │ (A/B channels) │  │
//! │  └──────────────┘   └────────────────┘   └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod drivers;

pub use crate::drivers::simulation::{
    MotorConfig, MotorSimulator, SimError, SimulatedEncoder, SimulatedPwm, SimulationDriver,
};
