//! Fixed-rate PID execution: enable/disable lifecycle and the compute loop.
//!
//! ## Loop
//! One dedicated thread per enable. It sleeps until an absolute deadline
//! (drift-free pacing; an overrun resynchronizes to `now + interval`), checks
//! its stop flag, runs one compute step, and repeats.
//!
//! ## Disable
//! Cooperative: the stop flag is cleared and the thread is unparked so it
//! exits at its next check. A step already in flight completes. The output
//! is not driven to zero; that is the composition layer's call.
//!
//! ## Failures
//! A cycle with a missing accessor is skipped. A non-finite reading or a
//! panicking accessor fails the cycle: it is logged and counted, and the loop
//! waits for the next tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kenbot_common::consts::{COMPUTE_HZ_MAX, COMPUTE_HZ_MIN, DEFAULT_COMPUTE_HZ};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::control::clock::{Clock, MonotonicClock};
use crate::control::io::{OutputSink, PidIo, ProcessVariableSource, SetpointSource};
use crate::control::pid::{PidCycle, PidParameters, PidRunningState, pid_compute};
use crate::error::{PidError, PidResult};

// ─── Loop Statistics ────────────────────────────────────────────────

/// Snapshot of the controller's loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Compute threads started over the controller's lifetime.
    pub loops_started: u64,
    /// Cycles that wrote an output.
    pub cycles_computed: u64,
    /// Cycles skipped because an accessor was absent.
    pub cycles_skipped: u64,
    /// Cycles that failed (non-finite reading or panicking accessor).
    pub cycles_failed: u64,
}

#[derive(Debug, Default)]
struct LoopCounters {
    loops_started: AtomicU64,
    cycles_computed: AtomicU64,
    cycles_skipped: AtomicU64,
    cycles_failed: AtomicU64,
}

impl LoopCounters {
    fn snapshot(&self) -> LoopStats {
        LoopStats {
            loops_started: self.loops_started.load(Ordering::Relaxed),
            cycles_computed: self.cycles_computed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
        }
    }
}

// ─── Shared Core ────────────────────────────────────────────────────

/// State reachable from both the owning handle and the compute thread.
struct Shared {
    params: RwLock<PidParameters>,
    io: RwLock<PidIo>,
    state: Mutex<PidRunningState>,
    clock: Arc<dyn Clock>,
    counters: LoopCounters,
}

impl Shared {
    /// One compute step: read, compute, write.
    fn run_cycle(&self) {
        let io = self.io.read().clone();
        let (Some(pv_source), Some(sp_source), Some(sink)) =
            (io.process_variable, io.setpoint, io.output)
        else {
            self.counters.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            trace!("PID cycle skipped: accessor missing");
            return;
        };
        let params = *self.params.read();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.compute(&params, &*pv_source, &*sp_source, &*sink)
        }));

        match result {
            Ok(Ok(cycle)) => {
                self.counters.cycles_computed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    error = cycle.error,
                    p = cycle.p_term,
                    i = cycle.i_term,
                    d = cycle.d_term,
                    dt = cycle.dt,
                    output = cycle.output,
                    "PID cycle"
                );
            }
            Ok(Err(e)) => {
                self.counters.cycles_failed.fetch_add(1, Ordering::Relaxed);
                error!("PID cycle failed: {e}");
            }
            Err(payload) => {
                self.counters.cycles_failed.fetch_add(1, Ordering::Relaxed);
                error!("PID cycle panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }

    fn compute(
        &self,
        params: &PidParameters,
        pv_source: &dyn ProcessVariableSource,
        sp_source: &dyn SetpointSource,
        sink: &dyn OutputSink,
    ) -> PidResult<PidCycle> {
        let pv = pv_source.read_pv();
        let sp = sp_source.read_sp();
        let now = self.clock.now();
        let cycle = pid_compute(&mut self.state.lock(), params, pv, sp, now)?;
        sink.write_output(cycle.output);
        Ok(cycle)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Body of the compute thread.
fn run_loop(shared: &Shared, running: &AtomicBool, interval: Duration) {
    debug!(interval_ms = interval.as_millis() as u64, "PID compute loop started");
    let mut deadline = Instant::now() + interval;

    loop {
        loop {
            if !running.load(Ordering::Acquire) {
                debug!("PID compute loop stopped");
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }

        shared.run_cycle();

        deadline += interval;
        let now = Instant::now();
        if deadline < now {
            warn!("PID cycle overran its period, resynchronizing");
            deadline = now + interval;
        }
    }
}

fn interval_for(hz: f64) -> PidResult<Duration> {
    if !hz.is_finite() || !(COMPUTE_HZ_MIN..=COMPUTE_HZ_MAX).contains(&hz) {
        return Err(PidError::InvalidRate {
            hz,
            min: COMPUTE_HZ_MIN,
            max: COMPUTE_HZ_MAX,
        });
    }
    Ok(Duration::from_secs_f64(1.0 / hz))
}

// ─── Controller ─────────────────────────────────────────────────────

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Closed-loop PID controller running on its own periodic thread.
///
/// Constructed disabled. Gains, bounds, accessors and the compute rate may be
/// changed at any time; each compute cycle works from one consistent
/// snapshot, and a new rate applies from the next enable.
pub struct PidController {
    shared: Arc<Shared>,
    interval: Mutex<Duration>,
    worker: Mutex<Option<Worker>>,
}

impl PidController {
    /// Create a disabled controller computing at `compute_hz` on the system clock.
    ///
    /// # Errors
    /// Invalid parameters ([`PidParameters::validate`]) or an out-of-range rate.
    pub fn new(params: PidParameters, io: PidIo, compute_hz: f64) -> PidResult<Self> {
        Self::with_clock(params, io, compute_hz, Arc::new(MonotonicClock))
    }

    /// Create a disabled controller at the default rate (1 Hz).
    pub fn with_default_rate(params: PidParameters, io: PidIo) -> PidResult<Self> {
        Self::new(params, io, DEFAULT_COMPUTE_HZ)
    }

    /// Create a disabled controller that measures elapsed time on `clock`.
    pub fn with_clock(
        params: PidParameters,
        io: PidIo,
        compute_hz: f64,
        clock: Arc<dyn Clock>,
    ) -> PidResult<Self> {
        params.validate()?;
        let interval = interval_for(compute_hz)?;
        Ok(Self {
            shared: Arc::new(Shared {
                params: RwLock::new(params),
                io: RwLock::new(io),
                state: Mutex::new(PidRunningState::default()),
                clock,
                counters: LoopCounters::default(),
            }),
            interval: Mutex::new(interval),
            worker: Mutex::new(None),
        })
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Reset the running state and start the compute thread. No-op if running.
    pub fn enable(&self) -> PidResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        self.shared.state.lock().reset();

        let running = Arc::new(AtomicBool::new(true));
        let r = Arc::clone(&running);
        let shared = Arc::clone(&self.shared);
        let interval = *self.interval.lock();

        let handle = thread::Builder::new()
            .name("pid-compute".to_string())
            .spawn(move || run_loop(&shared, &r, interval))
            .map_err(|e| PidError::Spawn(e.to_string()))?;

        self.shared
            .counters
            .loops_started
            .fetch_add(1, Ordering::Relaxed);
        info!(
            rate_hz = 1.0 / interval.as_secs_f64(),
            "PID controller enabled"
        );
        *worker = Some(Worker { running, handle });
        Ok(())
    }

    /// Ask the compute thread to stop. No-op if not running. Does not join.
    pub fn disable(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        worker.running.store(false, Ordering::Release);
        worker.handle.thread().unpark();
        info!("PID controller disabled");
    }

    /// Whether a compute thread has been started and not disabled.
    pub fn is_enabled(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Zero the integral and restart elapsed-time measurement.
    ///
    /// Safe to call while running. The timestamp is cleared rather than set
    /// to the current instant, so the next cycle is proportional-only and
    /// only records the baseline; no `dt` is measured across the reset.
    pub fn reset(&self) {
        self.shared.state.lock().reset();
        debug!("PID running state reset");
    }

    /// Loop counters.
    pub fn stats(&self) -> LoopStats {
        self.shared.counters.snapshot()
    }

    /// Copy of the running state (integral sum, last update, last pv).
    pub fn running_state(&self) -> PidRunningState {
        *self.shared.state.lock()
    }

    // ── Parameters ──────────────────────────────────────────

    /// Current gains and bounds.
    pub fn parameters(&self) -> PidParameters {
        *self.shared.params.read()
    }

    /// Replace all gains and bounds. Rejected values leave the old set in place.
    pub fn set_parameters(&self, params: PidParameters) -> PidResult<()> {
        params.validate()?;
        *self.shared.params.write() = params;
        Ok(())
    }

    fn update_parameters(&self, f: impl FnOnce(&mut PidParameters)) -> PidResult<()> {
        let mut params = self.shared.params.write();
        let mut candidate = *params;
        f(&mut candidate);
        candidate.validate()?;
        *params = candidate;
        Ok(())
    }

    /// Proportional gain.
    pub fn kp(&self) -> f64 {
        self.shared.params.read().kp
    }

    /// Integral gain.
    pub fn ki(&self) -> f64 {
        self.shared.params.read().ki
    }

    /// Derivative gain.
    pub fn kd(&self) -> f64 {
        self.shared.params.read().kd
    }

    /// Set the proportional gain.
    pub fn set_kp(&self, kp: f64) -> PidResult<()> {
        self.update_parameters(|p| p.kp = kp)
    }

    /// Set the integral gain.
    pub fn set_ki(&self, ki: f64) -> PidResult<()> {
        self.update_parameters(|p| p.ki = ki)
    }

    /// Set the derivative gain.
    pub fn set_kd(&self, kd: f64) -> PidResult<()> {
        self.update_parameters(|p| p.kd = kd)
    }

    /// Set all three gains at once.
    pub fn set_gains(&self, kp: f64, ki: f64, kd: f64) -> PidResult<()> {
        self.update_parameters(|p| {
            p.kp = kp;
            p.ki = ki;
            p.kd = kd;
        })
    }

    /// Process-variable bounds `(min, max)`.
    pub fn pv_range(&self) -> (f64, f64) {
        let p = self.shared.params.read();
        (p.pv_min, p.pv_max)
    }

    /// Set the process-variable bounds.
    pub fn set_pv_range(&self, min: f64, max: f64) -> PidResult<()> {
        self.update_parameters(|p| {
            p.pv_min = min;
            p.pv_max = max;
        })
    }

    /// Output bounds `(min, max)`.
    pub fn output_range(&self) -> (f64, f64) {
        let p = self.shared.params.read();
        (p.out_min, p.out_max)
    }

    /// Set the output bounds.
    pub fn set_output_range(&self, min: f64, max: f64) -> PidResult<()> {
        self.update_parameters(|p| {
            p.out_min = min;
            p.out_max = max;
        })
    }

    /// Compute period in use for the next enable.
    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    /// Change the compute rate. Applies from the next enable.
    pub fn set_compute_hz(&self, hz: f64) -> PidResult<()> {
        *self.interval.lock() = interval_for(hz)?;
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────

    /// Replace or clear the process-variable source.
    pub fn set_process_variable_source(&self, source: Option<Arc<dyn ProcessVariableSource>>) {
        self.shared.io.write().process_variable = source;
    }

    /// Replace or clear the setpoint source.
    pub fn set_setpoint_source(&self, source: Option<Arc<dyn SetpointSource>>) {
        self.shared.io.write().setpoint = source;
    }

    /// Replace or clear the output sink.
    pub fn set_output_sink(&self, sink: Option<Arc<dyn OutputSink>>) {
        self.shared.io.write().output = sink;
    }

    /// Drop all three accessors.
    pub fn clear_io(&self) {
        *self.shared.io.write() = PidIo::default();
    }
}

impl Drop for PidController {
    fn drop(&mut self) {
        self.disable();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
