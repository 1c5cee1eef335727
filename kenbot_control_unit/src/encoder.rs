//! Encoder root.
//!
//! Quadrature decoding, edge-callback wiring, and the pulse-rate velocity
//! source that feeds the decoder into the PID.

pub mod decoder;
pub mod velocity;
pub mod wiring;

pub use decoder::{EncoderSnapshot, EncoderState, EncodingMode, QuadratureDecoder, RotaryEncoder};
pub use velocity::PulseVelocity;
pub use wiring::EncoderInput;
