//! Capability interfaces between the PID controller and the outside world.
//!
//! The controller never sees hardware: it reads a process variable and a
//! setpoint and writes an output through these traits. Closures implement
//! them directly, so a composition layer can write
//! `PidIo::new(|| velocity(), || 0.5, move |duty| pwm.set_duty_cycle(duty))`.

use std::fmt;
use std::sync::Arc;

/// Supplies the measured process variable.
pub trait ProcessVariableSource: Send + Sync {
    /// Sample the process variable in engineering units.
    fn read_pv(&self) -> f64;
}

/// Supplies the target value.
pub trait SetpointSource: Send + Sync {
    /// Sample the setpoint in the same units as the process variable.
    fn read_sp(&self) -> f64;
}

/// Receives the computed control output.
pub trait OutputSink: Send + Sync {
    /// Apply `value`, already scaled to the output range.
    fn write_output(&self, value: f64);
}

impl<F: Fn() -> f64 + Send + Sync> ProcessVariableSource for F {
    fn read_pv(&self) -> f64 {
        self()
    }
}

impl<F: Fn() -> f64 + Send + Sync> SetpointSource for F {
    fn read_sp(&self) -> f64 {
        self()
    }
}

impl<F: Fn(f64) + Send + Sync> OutputSink for F {
    fn write_output(&self, value: f64) {
        self(value)
    }
}

/// The three accessors a controller computes through.
///
/// Any of them may be absent; a compute cycle with a missing accessor is
/// skipped.
#[derive(Clone, Default)]
pub struct PidIo {
    /// Measured value source.
    pub process_variable: Option<Arc<dyn ProcessVariableSource>>,
    /// Target value source.
    pub setpoint: Option<Arc<dyn SetpointSource>>,
    /// Output destination.
    pub output: Option<Arc<dyn OutputSink>>,
}

impl PidIo {
    /// Bundle all three accessors.
    pub fn new<P, S, O>(process_variable: P, setpoint: S, output: O) -> Self
    where
        P: ProcessVariableSource + 'static,
        S: SetpointSource + 'static,
        O: OutputSink + 'static,
    {
        Self {
            process_variable: Some(Arc::new(process_variable)),
            setpoint: Some(Arc::new(setpoint)),
            output: Some(Arc::new(output)),
        }
    }

    /// Whether every accessor is present.
    pub fn is_complete(&self) -> bool {
        self.process_variable.is_some() && self.setpoint.is_some() && self.output.is_some()
    }
}

impl fmt::Debug for PidIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PidIo")
            .field("process_variable", &self.process_variable.is_some())
            .field("setpoint", &self.setpoint.is_some())
            .field("output", &self.output.is_some())
            .finish()
    }
}
