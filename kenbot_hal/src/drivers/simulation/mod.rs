//! Simulation driver module.
//!
//! Software stand-ins for the encoder pins, the motor and its PWM stage, so
//! the control loop can run on a host without physical hardware.

mod driver;
mod encoder;
mod motor;
mod pwm;

pub use driver::{SimError, SimulationDriver};
pub use encoder::{SimulatedChannel, SimulatedEncoder};
pub use motor::{MotorConfig, MotorSimulator};
pub use pwm::SimulatedPwm;
