//! Simulated encoder pins driving a decoder through edge callbacks.

use std::sync::Arc;

use kenbot_common::hal::Channel;
use kenbot_control_unit::encoder::{EncoderInput, EncodingMode, QuadratureDecoder};
use kenbot_hal::SimulatedEncoder;

fn wire(mode: EncodingMode, encoder: &SimulatedEncoder) -> (Arc<QuadratureDecoder>, Arc<EncoderInput>) {
    let decoder = Arc::new(QuadratureDecoder::new(mode));
    let input = EncoderInput::attach(
        Arc::clone(&decoder),
        encoder,
        encoder.channel_a(),
        encoder.channel_b(),
    );
    (decoder, input)
}

#[test]
fn quad_mode_subscribes_both_channels() {
    let encoder = SimulatedEncoder::new();
    let (_, input) = wire(EncodingMode::QuadResolution, &encoder);
    assert_eq!(input.subscribed_channels(), &[Channel::A, Channel::B]);
}

#[test]
fn double_mode_subscribes_channel_a_only() {
    let encoder = SimulatedEncoder::new();
    let (_, input) = wire(EncodingMode::DoubleResolution, &encoder);
    assert_eq!(input.subscribed_channels(), &[Channel::A]);
}

#[test]
fn quad_mode_counts_every_edge() {
    let encoder = SimulatedEncoder::new();
    let (decoder, _input) = wire(EncodingMode::QuadResolution, &encoder);
    encoder.advance(40);
    assert_eq!(decoder.pulses(), 40);
    encoder.advance(-60);
    assert_eq!(decoder.pulses(), -20);
    assert_eq!(decoder.pulses(), encoder.position());
}

#[test]
fn double_mode_counts_two_per_cycle() {
    let encoder = SimulatedEncoder::new();
    let (decoder, _input) = wire(EncodingMode::DoubleResolution, &encoder);
    encoder.advance(40);
    assert_eq!(decoder.pulses(), 20);
}

#[test]
fn double_mode_reverse_from_rest_skips_first_edge() {
    let encoder = SimulatedEncoder::new();
    let (decoder, _input) = wire(EncodingMode::DoubleResolution, &encoder);
    // From rest the first channel A edge (00 → 10) is a single-bit change.
    encoder.advance(-8);
    assert_eq!(decoder.pulses(), -3);
    encoder.advance(-8);
    assert_eq!(decoder.pulses(), -7);
}

#[test]
fn quad_mode_bounce_cancels_out() {
    let encoder = SimulatedEncoder::new().with_bounce(1.0).unwrap();
    let (decoder, _input) = wire(EncodingMode::QuadResolution, &encoder);
    encoder.advance(100);
    assert_eq!(decoder.pulses(), 100);
    encoder.advance(-30);
    assert_eq!(decoder.pulses(), 70);
}

#[test]
fn double_mode_bounce_cancels_out() {
    let encoder = SimulatedEncoder::new().with_bounce(1.0).unwrap();
    let (decoder, _input) = wire(EncodingMode::DoubleResolution, &encoder);
    encoder.advance(80);
    assert_eq!(decoder.pulses(), 40);
}

#[test]
fn channel_glitch_does_not_drift() {
    let encoder = SimulatedEncoder::new();
    let (decoder, _input) = wire(EncodingMode::QuadResolution, &encoder);
    encoder.advance(2); // phase 11
    assert_eq!(decoder.pulses(), 2);
    // Channel A drops out for one sample and comes back.
    encoder.force_levels(false, true);
    assert_eq!(decoder.pulses(), 1);
    encoder.force_levels(true, true);
    assert_eq!(decoder.pulses(), 2);
    encoder.advance(2);
    assert_eq!(decoder.pulses(), 4);
}

#[test]
fn polled_input_without_subscription() {
    let encoder = SimulatedEncoder::new();
    let decoder = Arc::new(QuadratureDecoder::new(EncodingMode::QuadResolution));
    let input = EncoderInput::new(Arc::clone(&decoder), encoder.channel_a(), encoder.channel_b());
    encoder.advance(1);
    assert_eq!(decoder.pulses(), 0);
    input.sample();
    assert_eq!(decoder.pulses(), 1);
}
