//! Quadrature decoding state machine.
//!
//! Each reading packs channel A into bit 1 and channel B into bit 0. The
//! decoder compares the new state against the previous one and moves the
//! pulse counter according to the configured [`EncodingMode`].
//!
//! Counter-clockwise rotation increases the count, clockwise decreases it.

use kenbot_common::hal::Channel;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Resolution of the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingMode {
    /// Counts the two diagonal jumps per cycle seen when sampling on channel A edges only.
    DoubleResolution,
    /// Counts every single-channel edge (four per cycle).
    #[default]
    QuadResolution,
}

impl EncodingMode {
    /// Channels whose edges must be delivered to the decoder in this mode.
    pub fn edge_channels(&self) -> &'static [Channel] {
        match self {
            Self::DoubleResolution => &[Channel::A],
            Self::QuadResolution => &[Channel::A, Channel::B],
        }
    }

    /// Counted transitions per full encoder cycle.
    pub fn counts_per_cycle(&self) -> u32 {
        match self {
            Self::DoubleResolution => 2,
            Self::QuadResolution => 4,
        }
    }
}

/// Two-bit encoder state `(A << 1) | B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EncoderState(u8);

impl EncoderState {
    /// Pack two channel readings.
    #[inline]
    pub const fn from_channels(channel_a: bool, channel_b: bool) -> Self {
        Self(((channel_a as u8) << 1) | channel_b as u8)
    }

    /// Raw value in `0..=3`.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Channel A level.
    #[inline]
    pub const fn channel_a(self) -> bool {
        self.0 & 0b10 != 0
    }

    /// Channel B level.
    #[inline]
    pub const fn channel_b(self) -> bool {
        self.0 & 0b01 != 0
    }
}

impl From<EncoderState> for u8 {
    fn from(state: EncoderState) -> Self {
        state.bits()
    }
}

/// Direction-relevant bit of the previous state.
const PREV_MASK: u8 = 0x1;
/// Direction-relevant bit of the current state.
const CURR_MASK: u8 = 0x2;
/// XOR of two states where both channels changed.
const INVALID: u8 = 0x3;

/// Pulse change for the transition `previous → current` under `mode`.
#[inline]
pub fn pulse_delta(mode: EncodingMode, previous: EncoderState, current: EncoderState) -> i64 {
    let (prev, curr) = (previous.bits(), current.bits());
    match mode {
        EncodingMode::DoubleResolution => match (prev, curr) {
            // 11 ↔ 00: counter-clockwise
            (0x3, 0x0) | (0x0, 0x3) => 1,
            // 10 ↔ 01: clockwise
            (0x2, 0x1) | (0x1, 0x2) => -1,
            _ => 0,
        },
        EncodingMode::QuadResolution => {
            if (curr ^ prev) == INVALID || curr == prev {
                return 0;
            }
            // Right bit of prev XOR left bit of curr: 0 = counter-clockwise.
            if (prev & PREV_MASK) ^ ((curr & CURR_MASK) >> 1) == 0 {
                1
            } else {
                -1
            }
        }
    }
}

/// Read side of a rotary encoder: counters a consumer may observe and reset.
pub trait RotaryEncoder: Send + Sync {
    /// Last sampled two-bit state, in `0..=3`.
    fn current_state(&self) -> u8;
    /// Signed pulse count.
    fn pulses(&self) -> i64;
    /// Revolution count.
    fn revolutions(&self) -> i64;
    /// Zero the counters.
    fn reset(&self);
}

/// Consistent view of the decoder taken under one guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSnapshot {
    /// State of the last reading.
    pub current_state: EncoderState,
    /// State the next reading is compared against (equals `current_state`
    /// once a reading has been processed).
    pub previous_state: EncoderState,
    /// Signed pulse count.
    pub pulses: i64,
    /// Revolution count (see [`QuadratureDecoder::revolutions`]).
    pub revolutions: i64,
}

#[derive(Debug, Default)]
struct DecoderState {
    current: EncoderState,
    previous: EncoderState,
    pulses: i64,
    revolutions: i64,
}

/// Thread-safe quadrature decoder.
///
/// `process_readings` is meant to be called from edge callbacks; all other
/// methods may be called concurrently from any thread. History and counters
/// share a single lock so readers never observe a half-applied update.
#[derive(Debug)]
pub struct QuadratureDecoder {
    mode: EncodingMode,
    state: Mutex<DecoderState>,
}

impl QuadratureDecoder {
    /// Create a decoder with zeroed counters and history `00`.
    pub fn new(mode: EncodingMode) -> Self {
        Self {
            mode,
            state: Mutex::new(DecoderState::default()),
        }
    }

    /// Decoding resolution, fixed at construction.
    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Feed one pair of channel readings. Never fails.
    #[inline]
    pub fn process_readings(&self, channel_a: bool, channel_b: bool) {
        let current = EncoderState::from_channels(channel_a, channel_b);
        let mut s = self.state.lock();
        s.current = current;
        let delta = pulse_delta(self.mode, s.previous, current);
        s.pulses = s.pulses.wrapping_add(delta);
        s.previous = current;
    }

    /// State of the last reading, in `0..=3`.
    pub fn current_state(&self) -> u8 {
        self.state.lock().current.bits()
    }

    /// State the next reading will be compared against.
    pub fn previous_state(&self) -> u8 {
        self.state.lock().previous.bits()
    }

    /// Signed pulse count; wraps on `i64` overflow.
    pub fn pulses(&self) -> i64 {
        self.state.lock().pulses
    }

    /// Revolution count.
    ///
    /// Only [`reset`](Self::reset) touches this value: no pulses-per-revolution
    /// ratio is configured, so pulses are never converted into revolutions.
    pub fn revolutions(&self) -> i64 {
        self.state.lock().revolutions
    }

    /// All observable values at once.
    pub fn snapshot(&self) -> EncoderSnapshot {
        let s = self.state.lock();
        EncoderSnapshot {
            current_state: s.current,
            previous_state: s.previous,
            pulses: s.pulses,
            revolutions: s.revolutions,
        }
    }

    /// Zero pulses and revolutions. The state history is kept.
    pub fn reset(&self) {
        let mut s = self.state.lock();
        s.pulses = 0;
        s.revolutions = 0;
    }
}

impl RotaryEncoder for QuadratureDecoder {
    fn current_state(&self) -> u8 {
        QuadratureDecoder::current_state(self)
    }

    fn pulses(&self) -> i64 {
        QuadratureDecoder::pulses(self)
    }

    fn revolutions(&self) -> i64 {
        QuadratureDecoder::revolutions(self)
    }

    fn reset(&self) {
        QuadratureDecoder::reset(self)
    }
}
