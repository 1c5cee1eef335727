//! PID controller on normalized signals with conditional-integration
//! anti-windup.
//!
//! Process variable and setpoint are clamped to `[pv_min, pv_max]` and mapped
//! onto `[-1, 1]`; the raw output is clamped to `[-1, 1]` and mapped onto
//! `[out_min, out_max]`. The integrator freezes while the raw process
//! variable is outside its range. The first cycle after a reset is
//! proportional-only because there is no elapsed time to integrate or
//! differentiate over.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use kenbot_common::consts::DERIVATIVE_DT_EPSILON;

use crate::control::scaling::{denormalize, normalize};
use crate::error::{PidError, PidResult};

/// Gains and scaling bounds.
///
/// Gains may take any sign. Bounds must satisfy `pv_min < pv_max` and
/// `out_min <= out_max`; see [`PidParameters::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParameters {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    pub kd: f64,
    /// Lowest meaningful process-variable value.
    pub pv_min: f64,
    /// Highest meaningful process-variable value.
    pub pv_max: f64,
    /// Output value written for a normalized output of −1.
    pub out_min: f64,
    /// Output value written for a normalized output of +1.
    pub out_max: f64,
}

impl Default for PidParameters {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            pv_min: -1.0,
            pv_max: 1.0,
            out_min: -1.0,
            out_max: 1.0,
        }
    }
}

impl PidParameters {
    /// Reject non-finite values and ranges that would make scaling divide by
    /// zero or invert.
    pub fn validate(&self) -> PidResult<()> {
        for (name, value) in [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("pv_min", self.pv_min),
            ("pv_max", self.pv_max),
            ("out_min", self.out_min),
            ("out_max", self.out_max),
        ] {
            if !value.is_finite() {
                return Err(PidError::NonFiniteParameter { name, value });
            }
        }
        if self.pv_max <= self.pv_min {
            return Err(PidError::InvalidRange {
                name: "pv",
                min: self.pv_min,
                max: self.pv_max,
            });
        }
        if self.out_max < self.out_min {
            return Err(PidError::InvalidRange {
                name: "output",
                min: self.out_min,
                max: self.out_max,
            });
        }
        Ok(())
    }

    /// Whether a raw (unclamped) process variable lies inside `[pv_min, pv_max]`.
    #[inline]
    pub fn pv_in_range(&self, pv_raw: f64) -> bool {
        pv_raw >= self.pv_min && pv_raw <= self.pv_max
    }
}

/// Running state carried between compute cycles.
///
/// Reset on every disabled → enabled transition and by an explicit reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidRunningState {
    /// Instant of the last compute; `None` until the first cycle after reset.
    last_update: Option<Instant>,
    /// Normalized process variable of the last cycle (for the derivative).
    last_pv: f64,
    /// Accumulated error integral [normalized · s].
    integral_sum: f64,
}

impl PidRunningState {
    /// Zero the integral and return to the "never updated" sentinel.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Accumulated error integral.
    #[inline]
    pub fn integral_sum(&self) -> f64 {
        self.integral_sum
    }

    /// Instant of the last compute, if any since reset.
    #[inline]
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Normalized process variable seen by the last compute.
    #[inline]
    pub fn last_pv(&self) -> f64 {
        self.last_pv
    }
}

/// Breakdown of one compute cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidCycle {
    /// Normalized error (setpoint − process variable).
    pub error: f64,
    /// Proportional contribution.
    pub p_term: f64,
    /// Integral contribution.
    pub i_term: f64,
    /// Derivative contribution.
    pub d_term: f64,
    /// Elapsed seconds since the previous cycle (`None` on the first cycle).
    pub dt: Option<f64>,
    /// Output after clamping and mapping onto `[out_min, out_max]`.
    pub output: f64,
}

/// Compute one PID cycle at instant `now`.
///
/// # Arguments
/// - `state`: running state, updated in place on success.
/// - `params`: gains and bounds snapshot for this cycle.
/// - `pv_raw`, `sp_raw`: readings in engineering units.
/// - `now`: timestamp of this cycle.
///
/// # Errors
/// [`PidError::NonFiniteReading`] if either reading is NaN or infinite. The
/// running state is left untouched in that case.
pub fn pid_compute(
    state: &mut PidRunningState,
    params: &PidParameters,
    pv_raw: f64,
    sp_raw: f64,
    now: Instant,
) -> PidResult<PidCycle> {
    if !pv_raw.is_finite() {
        return Err(PidError::NonFiniteReading {
            input: "process variable",
            value: pv_raw,
        });
    }
    if !sp_raw.is_finite() {
        return Err(PidError::NonFiniteReading {
            input: "setpoint",
            value: sp_raw,
        });
    }

    let pv = normalize(pv_raw, params.pv_min, params.pv_max);
    let sp = normalize(sp_raw, params.pv_min, params.pv_max);
    let error = sp - pv;

    // ── P term ──────────────────────────────────────────────
    let p_term = error * params.kp;

    let mut i_term = 0.0;
    let mut d_term = 0.0;
    let mut dt = None;

    if let Some(last) = state.last_update {
        let elapsed = now.saturating_duration_since(last).as_secs_f64();
        dt = Some(elapsed);

        // ── I term (frozen while the pv is saturated) ───────
        if params.pv_in_range(pv_raw) {
            let candidate = state.integral_sum + elapsed * error;
            i_term = params.ki * candidate;
            state.integral_sum = candidate;
        }

        // ── D term (on measurement) ─────────────────────────
        if elapsed.abs() > DERIVATIVE_DT_EPSILON {
            d_term = params.kd * (pv - state.last_pv) / elapsed;
        }
    }

    state.last_update = Some(now);
    state.last_pv = pv;

    let output = denormalize(p_term + i_term + d_term, params.out_min, params.out_max);

    Ok(PidCycle {
        error,
        p_term,
        i_term,
        d_term,
        dt,
        output,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
