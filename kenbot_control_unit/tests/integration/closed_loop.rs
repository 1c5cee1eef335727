//! Closed-loop velocity control against the simulated drive.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kenbot_common::hal::PwmOutput;
use kenbot_control_unit::control::clock::{Clock, ManualClock};
use kenbot_control_unit::control::io::PidIo;
use kenbot_control_unit::control::pid::{PidParameters, PidRunningState, pid_compute};
use kenbot_control_unit::cycle::PidController;
use kenbot_control_unit::encoder::{EncoderInput, EncodingMode, PulseVelocity, QuadratureDecoder};
use kenbot_hal::{MotorConfig, SimulationDriver};

/// Target wheel speed [edges/s]; full duty reaches 960.
const SETPOINT: f64 = 400.0;

fn motor() -> MotorConfig {
    MotorConfig {
        counts_per_rev: 48,
        max_speed_rps: 5.0,
        time_constant_s: 0.05,
    }
}

fn params() -> PidParameters {
    PidParameters {
        kp: 0.5,
        ki: 2.0,
        kd: 0.0,
        pv_min: -1000.0,
        pv_max: 1000.0,
        out_min: -1.0,
        out_max: 1.0,
    }
}

#[test]
fn stepped_loop_converges_on_setpoint() {
    let sim = SimulationDriver::new(motor(), 0.0).unwrap();
    let encoder = sim.encoder();
    let decoder = Arc::new(QuadratureDecoder::new(EncodingMode::QuadResolution));
    let _input = EncoderInput::attach(
        Arc::clone(&decoder),
        &*encoder,
        encoder.channel_a(),
        encoder.channel_b(),
    );
    let clock = Arc::new(ManualClock::new());
    let velocity = PulseVelocity::with_clock(Arc::clone(&decoder), clock.clone());
    let pwm = sim.pwm();
    let params = params();
    let mut state = PidRunningState::default();
    let dt = Duration::from_millis(20);

    for _ in 0..250 {
        clock.advance(dt);
        sim.cycle(dt);
        let pv = velocity.sample();
        let cycle = pid_compute(&mut state, &params, pv, SETPOINT, clock.now()).unwrap();
        pwm.set_duty_cycle(cycle.output);
    }

    let rate = sim.edge_rate();
    assert!(
        (rate - SETPOINT).abs() < SETPOINT * 0.1,
        "edge rate {rate} did not settle near {SETPOINT}"
    );
    assert!(decoder.pulses() > 0);
}

#[test]
fn threaded_loop_drives_motor_toward_setpoint() {
    let sim = SimulationDriver::new(motor(), 0.0).unwrap();
    let encoder = sim.encoder();
    let decoder = Arc::new(QuadratureDecoder::new(EncodingMode::QuadResolution));
    let _input = EncoderInput::attach(
        Arc::clone(&decoder),
        &*encoder,
        encoder.channel_a(),
        encoder.channel_b(),
    );
    let velocity = PulseVelocity::new(Arc::clone(&decoder));
    let pwm = sim.pwm();
    let sink = {
        let pwm = Arc::clone(&pwm);
        move |duty: f64| pwm.set_duty_cycle(duty)
    };
    let ctrl = PidController::new(params(), PidIo::new(velocity, || SETPOINT, sink), 50.0).unwrap();

    sim.start(Duration::from_millis(1)).unwrap();
    ctrl.enable().unwrap();
    thread::sleep(Duration::from_millis(3000));
    let rate = sim.edge_rate();
    ctrl.disable();
    pwm.set_duty_cycle(0.0);
    sim.stop();

    let stats = ctrl.stats();
    assert!(stats.cycles_computed > 50, "only {} cycles", stats.cycles_computed);
    assert_eq!(stats.cycles_failed, 0);
    assert!(
        (rate - SETPOINT).abs() < SETPOINT * 0.3,
        "edge rate {rate} far from {SETPOINT}"
    );
    assert!(decoder.pulses() > 0);
    assert_eq!(decoder.pulses(), encoder.position());
}
