//! Transition sequences fed straight into the decoder.

use kenbot_control_unit::encoder::{EncodingMode, QuadratureDecoder};

fn feed(decoder: &QuadratureDecoder, levels: &[(bool, bool)]) {
    for &(a, b) in levels {
        decoder.process_readings(a, b);
    }
}

const CCW: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (false, false)];
const CW: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

#[test]
fn double_resolution_alternating_high_low_increments() {
    let d = QuadratureDecoder::new(EncodingMode::DoubleResolution);
    let mut expected = 0;
    for i in 0..10 {
        let level = i % 2 == 0;
        d.process_readings(level, level);
        expected += 1;
        assert_eq!(d.pulses(), expected);
    }
}

#[test]
fn double_resolution_alternating_split_decrements() {
    let d = QuadratureDecoder::new(EncodingMode::DoubleResolution);
    // Start from 10 so every following transition is a diagonal jump.
    d.process_readings(true, false);
    assert_eq!(d.pulses(), 0);
    for i in 0..10 {
        let a = i % 2 == 1;
        d.process_readings(a, !a);
        assert_eq!(d.pulses(), -(i + 1));
    }
}

#[test]
fn double_resolution_ignores_gray_code_walk() {
    let d = QuadratureDecoder::new(EncodingMode::DoubleResolution);
    for _ in 0..25 {
        feed(&d, &CCW);
    }
    for _ in 0..25 {
        feed(&d, &CW);
    }
    assert_eq!(d.pulses(), 0);
}

#[test]
fn quad_resolution_every_step_same_direction() {
    let d = QuadratureDecoder::new(EncodingMode::QuadResolution);
    let mut last = d.pulses();
    for _ in 0..3 {
        for &(a, b) in &CCW {
            d.process_readings(a, b);
            assert_eq!(d.pulses(), last + 1);
            last = d.pulses();
        }
    }
    assert_eq!(last, 12);
}

#[test]
fn quad_resolution_reverse_is_exact_opposite() {
    let fwd = QuadratureDecoder::new(EncodingMode::QuadResolution);
    let rev = QuadratureDecoder::new(EncodingMode::QuadResolution);
    for _ in 0..7 {
        feed(&fwd, &CCW);
        feed(&rev, &CW);
    }
    assert_eq!(fwd.pulses(), 28);
    assert_eq!(rev.pulses(), -fwd.pulses());
}

#[test]
fn quad_resolution_double_flip_is_noop() {
    let d = QuadratureDecoder::new(EncodingMode::QuadResolution);
    feed(&d, &[(false, true), (true, true)]);
    assert_eq!(d.pulses(), 2);
    // 11 → 00 and 00 → 11 flip both channels at once.
    feed(&d, &[(false, false), (true, true)]);
    assert_eq!(d.pulses(), 2);
    // Walking on from 11 resumes cleanly.
    feed(&d, &[(true, false), (false, false)]);
    assert_eq!(d.pulses(), 4);
}

#[test]
fn reset_evaluates_next_reading_against_old_history() {
    let d = QuadratureDecoder::new(EncodingMode::QuadResolution);
    feed(&d, &CCW[..3]);
    assert_eq!(d.pulses(), 3);
    d.reset();
    assert_eq!(d.pulses(), 0);
    assert_eq!(d.revolutions(), 0);
    // 10 → 00 is a counted step only relative to the pre-reset state.
    d.process_readings(false, false);
    assert_eq!(d.pulses(), 1);
}

#[test]
fn concurrent_feeders_and_readers() {
    use std::sync::Arc;
    use std::thread;

    let d = Arc::new(QuadratureDecoder::new(EncodingMode::QuadResolution));
    let feeder = {
        let d = Arc::clone(&d);
        thread::spawn(move || {
            for _ in 0..10_000 {
                feed(&d, &CCW);
            }
        })
    };
    let reader = {
        let d = Arc::clone(&d);
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..10_000 {
                let snap = d.snapshot();
                assert!(snap.pulses >= last);
                assert_eq!(snap.current_state, snap.previous_state);
                last = snap.pulses;
            }
        })
    };
    feeder.join().unwrap();
    reader.join().unwrap();
    assert_eq!(d.pulses(), 40_000);
}
