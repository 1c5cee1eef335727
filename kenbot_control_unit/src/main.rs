//! # Kenbot Control Unit
//!
//! Closed-loop wheel velocity control against the simulated drive.
//!
//! Builds the simulation driver, wires its encoder pins into a quadrature
//! decoder, and runs a PID controller that reads the pulse rate, follows a
//! stepped triangle setpoint, and writes the motor duty cycle. Runs until
//! Ctrl-C or until `--duration-s` has elapsed, then zeroes the motor.

use clap::Parser;
use kenbot_common::config::{ConfigError, LogLevel};
use kenbot_common::consts::DEFAULT_CONFIG_PATH;
use kenbot_common::hal::PwmOutput;
use kenbot_control_unit::config::{ControlUnitConfig, load_config};
use kenbot_control_unit::control::io::PidIo;
use kenbot_control_unit::cycle::PidController;
use kenbot_control_unit::encoder::{EncoderInput, PulseVelocity, QuadratureDecoder};
use kenbot_control_unit::profile::SetpointProfile;
use kenbot_hal::SimulationDriver;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Interval between status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Kenbot Control Unit - PID wheel velocity control
#[derive(Parser, Debug)]
#[command(name = "kenbot_control_unit")]
#[command(version)]
#[command(about = "Quadrature decoding and PID velocity control on a simulated drive")]
struct Args {
    /// Path to the control unit configuration TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many seconds (default: run until Ctrl-C).
    #[arg(long, value_name = "SECONDS")]
    duration_s: Option<f64>,

    /// Override the PID compute rate from the config file [Hz].
    #[arg(long, value_name = "HZ")]
    compute_hz: Option<f64>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Kenbot Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Kenbot Control Unit shutdown complete");
}

fn run(
    args: &Args,
    config: Result<ControlUnitConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.map_err(|e| format!("{}: {e}", args.config.display()))?;
    let compute_hz = args.compute_hz.unwrap_or(config.pid.compute_hz);
    let params = config.pid.parameters();

    info!(
        service = %config.shared.service_name,
        mode = ?config.encoder.mode,
        counts_per_cycle = config.encoder.mode.counts_per_cycle(),
        compute_hz,
        "Config OK"
    );

    // ── Simulated drive ─────────────────────────────────────
    let sim = SimulationDriver::new(
        config.simulation.motor(),
        config.simulation.bounce_probability,
    )?;
    let pwm = sim.pwm();
    let encoder = sim.encoder();

    // ── Encoder → decoder → velocity ────────────────────────
    let decoder = Arc::new(QuadratureDecoder::new(config.encoder.mode));
    let _input = EncoderInput::attach(
        Arc::clone(&decoder),
        &*encoder,
        encoder.channel_a(),
        encoder.channel_b(),
    );
    let velocity = PulseVelocity::new(Arc::clone(&decoder))
        .with_units_per_pulse(config.encoder.units_per_pulse);

    // ── Setpoint profile ────────────────────────────────────
    let profile = SetpointProfile::new(
        config.profile.steps,
        Duration::from_millis(config.profile.period_ms),
        params.pv_min,
        params.pv_max,
    );

    // ── PID ─────────────────────────────────────────────────
    let sink = {
        let pwm = Arc::clone(&pwm);
        move |duty: f64| pwm.set_duty_cycle(duty)
    };
    let controller = PidController::new(params, PidIo::new(velocity, profile, sink), compute_hz)?;

    // Setup signal handler for graceful shutdown.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    sim.start(Duration::from_millis(config.simulation.tick_ms))?;
    controller.enable()?;

    let started = Instant::now();
    let deadline = args
        .duration_s
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| started + Duration::from_secs_f64(s));
    let mut next_status = started + STATUS_INTERVAL;

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            info!("Run duration elapsed");
            break;
        }
        if now >= next_status {
            let stats = controller.stats();
            info!(
                pulses = decoder.pulses(),
                edge_rate = sim.edge_rate(),
                duty = pwm.duty_cycle(),
                cycles = stats.cycles_computed,
                failed = stats.cycles_failed,
                "status"
            );
            next_status += STATUS_INTERVAL;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // ── Shutdown ────────────────────────────────────────────
    controller.disable();
    pwm.set_duty_cycle(0.0);
    sim.stop();

    let stats = controller.stats();
    info!(
        computed = stats.cycles_computed,
        skipped = stats.cycles_skipped,
        failed = stats.cycles_failed,
        pulses = decoder.pulses(),
        "Final loop statistics"
    );
    Ok(())
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
