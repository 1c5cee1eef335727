//! Control engine root.
//!
//! PID math on normalized signals, the capability traits the controller
//! talks through, and the time source it measures elapsed time with.

pub mod clock;
pub mod io;
pub mod pid;
pub mod scaling;
