//! PID controller lifecycle on its real compute thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use kenbot_control_unit::control::io::PidIo;
use kenbot_control_unit::control::pid::{PidParameters, PidRunningState, pid_compute};
use kenbot_control_unit::cycle::PidController;
use parking_lot::Mutex;
use proptest::prelude::*;

const RATE_HZ: f64 = 100.0;

fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

fn recorder() -> (Arc<Mutex<Vec<f64>>>, impl Fn(f64) + Send + Sync + 'static) {
    let out = Arc::new(Mutex::new(Vec::new()));
    let o = Arc::clone(&out);
    (out, move |v| o.lock().push(v))
}

#[test]
fn first_cycle_is_proportional_only() {
    let (out, sink) = recorder();
    let ctrl = PidController::new(
        PidParameters::default(),
        PidIo::new(|| 0.0, || 0.5, sink),
        RATE_HZ,
    )
    .unwrap();

    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || !out.lock().is_empty()));
    ctrl.disable();

    assert!((out.lock()[0] - 0.5).abs() < 1e-12);
}

#[test]
fn enable_is_idempotent() {
    let (out, sink) = recorder();
    let ctrl = PidController::new(
        PidParameters::default(),
        PidIo::new(|| 0.0, || 0.5, sink),
        RATE_HZ,
    )
    .unwrap();

    ctrl.enable().unwrap();
    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || out.lock().len() >= 5));
    ctrl.disable();

    let stats = ctrl.stats();
    assert_eq!(stats.loops_started, 1);
    assert!(stats.cycles_computed >= 5);
}

#[test]
fn disable_stops_writing() {
    let (out, sink) = recorder();
    let ctrl = PidController::new(
        PidParameters::default(),
        PidIo::new(|| 0.0, || 0.5, sink),
        RATE_HZ,
    )
    .unwrap();

    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || out.lock().len() >= 3));
    ctrl.disable();
    assert!(!ctrl.is_enabled());

    // Let an in-flight step finish before taking the reference count.
    thread::sleep(Duration::from_millis(50));
    let written = out.lock().len();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(out.lock().len(), written);
}

#[test]
fn disable_then_enable_resets_integral() {
    let params = PidParameters {
        kp: 0.0,
        ki: 1.0,
        ..PidParameters::default()
    };
    let (out, sink) = recorder();
    let ctrl = PidController::new(params, PidIo::new(|| 0.0, || 0.5, sink), RATE_HZ).unwrap();

    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || out.lock().len() >= 5));
    ctrl.disable();
    assert!(ctrl.running_state().integral_sum() > 0.0);

    thread::sleep(Duration::from_millis(50));
    out.lock().clear();

    ctrl.enable().unwrap();
    assert_eq!(ctrl.running_state().integral_sum(), 0.0);
    assert!(wait_for(Duration::from_secs(2), || !out.lock().is_empty()));
    ctrl.disable();

    assert_eq!(out.lock()[0], 0.0);
}

#[test]
fn panicking_accessor_does_not_stop_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let pv = move || {
        if c.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            panic!("encoder read failed");
        }
        0.0
    };
    let (out, sink) = recorder();
    let ctrl = PidController::new(
        PidParameters::default(),
        PidIo::new(pv, || 0.5, sink),
        RATE_HZ,
    )
    .unwrap();

    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || out.lock().len() >= 3));
    ctrl.disable();

    let stats = ctrl.stats();
    assert!(stats.cycles_failed >= 3);
    assert!(stats.cycles_computed >= 3);
}

#[test]
fn missing_output_skips_every_cycle() {
    let ctrl = PidController::new(
        PidParameters::default(),
        PidIo {
            process_variable: Some(Arc::new(|| 0.0)),
            setpoint: Some(Arc::new(|| 0.5)),
            output: None,
        },
        RATE_HZ,
    )
    .unwrap();

    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || ctrl.stats().cycles_skipped >= 3));
    ctrl.disable();
    assert_eq!(ctrl.stats().cycles_computed, 0);
}

#[test]
fn accessors_can_be_installed_while_running() {
    let ctrl = PidController::new(PidParameters::default(), PidIo::default(), RATE_HZ).unwrap();
    ctrl.enable().unwrap();
    assert!(wait_for(Duration::from_secs(2), || ctrl.stats().cycles_skipped >= 1));

    let (out, sink) = recorder();
    ctrl.set_process_variable_source(Some(Arc::new(|| -0.25)));
    ctrl.set_setpoint_source(Some(Arc::new(|| 0.25)));
    ctrl.set_output_sink(Some(Arc::new(sink)));
    assert!(wait_for(Duration::from_secs(2), || !out.lock().is_empty()));
    ctrl.disable();

    assert!((out.lock()[0] - 0.5).abs() < 1e-12);
}

#[test]
fn invalid_setter_rejected_while_running() {
    let ctrl = PidController::new(PidParameters::default(), PidIo::default(), RATE_HZ).unwrap();
    ctrl.enable().unwrap();
    assert!(ctrl.set_output_range(1.0, -1.0).is_err());
    assert_eq!(ctrl.output_range(), (-1.0, 1.0));
    ctrl.disable();
}

proptest! {
    #[test]
    fn output_always_within_bounds(
        kp in -50.0f64..50.0,
        ki in -50.0f64..50.0,
        kd in -5.0f64..5.0,
        out_min in -100.0f64..0.0,
        out_span in 0.0f64..200.0,
        readings in prop::collection::vec((-2000.0f64..2000.0, -2000.0f64..2000.0, 0u64..500), 1..30),
    ) {
        let params = PidParameters {
            kp,
            ki,
            kd,
            pv_min: -1000.0,
            pv_max: 1000.0,
            out_min,
            out_max: out_min + out_span,
        };
        prop_assume!(params.validate().is_ok());

        let mut state = PidRunningState::default();
        let mut now = Instant::now();
        for (pv, sp, step_ms) in readings {
            now += Duration::from_millis(step_ms);
            let cycle = pid_compute(&mut state, &params, pv, sp, now).unwrap();
            prop_assert!(cycle.output >= params.out_min && cycle.output <= params.out_max,
                "output {} outside [{}, {}]", cycle.output, params.out_min, params.out_max);
        }
    }

    #[test]
    fn saturated_pv_never_moves_integral(
        ki in 0.1f64..10.0,
        readings in prop::collection::vec((1.0f64..500.0, -1.0f64..1.0, 1u64..100), 1..20),
    ) {
        let params = PidParameters { kp: 1.0, ki, kd: 0.0, ..PidParameters::default() };
        let mut state = PidRunningState::default();
        let mut now = Instant::now();
        for (excess, sp, step_ms) in readings {
            now += Duration::from_millis(step_ms);
            pid_compute(&mut state, &params, params.pv_max + excess, sp, now).unwrap();
            prop_assert_eq!(state.integral_sum(), 0.0);
        }
    }
}
