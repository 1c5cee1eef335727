//! Hardware abstraction contracts.
//!
//! This module defines the collaborators the control core talks to:
//! - `DigitalInput` - a logic-level input that can be sampled
//! - `EdgeSource` - registration for "notify on any edge" callbacks
//! - `PwmOutput` - a duty-cycle output driving the motor
//!
//! Implementations live in driver crates (`kenbot_hal` ships a simulation
//! driver). Every trait is object safe and `Send + Sync` because callbacks
//! fire on whatever context the driver delivers edges from.

use std::fmt;
use std::sync::Arc;

/// One of the two quadrature encoder channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Leading channel, packed into bit 1 of the encoder state.
    A,
    /// Trailing channel, packed into bit 0 of the encoder state.
    B,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Edge notification handler: receives the channel that changed and its new level.
///
/// Runs in the driver's signal context. Must return quickly and must not block.
pub type EdgeCallback = Box<dyn Fn(Channel, bool) + Send + Sync>;

/// A sampled logic-level input.
pub trait DigitalInput: Send + Sync {
    /// Current logic level (`true` = high).
    fn read(&self) -> bool;
}

/// A source of edge notifications for encoder channels.
pub trait EdgeSource: Send + Sync {
    /// Register `callback` to be invoked on every rising or falling edge of `channel`.
    fn subscribe(&self, channel: Channel, callback: EdgeCallback);
}

/// A PWM output stage.
pub trait PwmOutput: Send + Sync {
    /// Set the signed duty cycle. Sign selects direction, magnitude is in `[0, 1]`.
    fn set_duty_cycle(&self, duty: f64);

    /// Last duty cycle written.
    fn duty_cycle(&self) -> f64;
}

impl<T: DigitalInput + ?Sized> DigitalInput for Arc<T> {
    fn read(&self) -> bool {
        (**self).read()
    }
}

impl<T: EdgeSource + ?Sized> EdgeSource for Arc<T> {
    fn subscribe(&self, channel: Channel, callback: EdgeCallback) {
        (**self).subscribe(channel, callback)
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Arc<T> {
    fn set_duty_cycle(&self, duty: f64) {
        (**self).set_duty_cycle(duty)
    }

    fn duty_cycle(&self) -> f64 {
        (**self).duty_cycle()
    }
}
