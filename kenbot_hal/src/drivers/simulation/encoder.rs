//! Simulated quadrature encoder.
//!
//! Produces the two-channel Gray-code pattern of a rotary encoder and
//! delivers edge notifications to subscribers, optionally with contact bounce.
//! Counter-clockwise rotation walks the sequence `00 → 01 → 11 → 10 → 00`
//! (packed as `A << 1 | B`), clockwise walks it backwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kenbot_common::hal::{Channel, DigitalInput, EdgeCallback, EdgeSource};
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use super::SimError;

/// Channel levels `(A, B)` for each phase of one counter-clockwise cycle.
const SEQUENCE: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];

/// A single simulated logic-level pin.
#[derive(Debug, Default)]
pub struct SimulatedChannel {
    level: AtomicBool,
}

impl SimulatedChannel {
    fn set(&self, level: bool) {
        self.level.store(level, Ordering::Release);
    }
}

impl DigitalInput for SimulatedChannel {
    fn read(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }
}

struct Motion {
    /// Index into `SEQUENCE`.
    phase: usize,
    /// Net signed number of single-edge steps taken.
    position: i64,
}

/// Two-channel encoder signal generator.
pub struct SimulatedEncoder {
    channel_a: Arc<SimulatedChannel>,
    channel_b: Arc<SimulatedChannel>,
    subscribers: RwLock<Vec<(Channel, EdgeCallback)>>,
    motion: Mutex<Motion>,
    bounce_probability: f64,
}

impl SimulatedEncoder {
    /// Create an encoder resting at phase `00` with clean edges.
    pub fn new() -> Self {
        Self {
            channel_a: Arc::new(SimulatedChannel::default()),
            channel_b: Arc::new(SimulatedChannel::default()),
            subscribers: RwLock::new(Vec::new()),
            motion: Mutex::new(Motion {
                phase: 0,
                position: 0,
            }),
            bounce_probability: 0.0,
        }
    }

    /// Enable contact bounce: each edge chatters once with probability `p`.
    pub fn with_bounce(mut self, p: f64) -> Result<Self, SimError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(SimError::InvalidConfig(format!(
                "bounce_probability {p} out of range [0, 1]"
            )));
        }
        self.bounce_probability = p;
        Ok(self)
    }

    /// Channel A pin.
    pub fn channel_a(&self) -> Arc<SimulatedChannel> {
        Arc::clone(&self.channel_a)
    }

    /// Channel B pin.
    pub fn channel_b(&self) -> Arc<SimulatedChannel> {
        Arc::clone(&self.channel_b)
    }

    /// Net single-edge steps taken since creation (ground truth for tests).
    pub fn position(&self) -> i64 {
        self.motion.lock().position
    }

    /// Current `(A, B)` levels.
    pub fn levels(&self) -> (bool, bool) {
        (self.channel_a.read(), self.channel_b.read())
    }

    /// Advance one edge counter-clockwise.
    pub fn step_forward(&self) {
        self.step(true);
    }

    /// Advance one edge clockwise.
    pub fn step_backward(&self) {
        self.step(false);
    }

    /// Advance `steps` edges; positive is counter-clockwise.
    pub fn advance(&self, steps: i64) {
        let forward = steps >= 0;
        for _ in 0..steps.unsigned_abs() {
            self.step(forward);
        }
    }

    /// Force both channels to the given levels, notifying each channel that changed.
    ///
    /// Used to inject glitches such as a simultaneous flip of both channels.
    pub fn force_levels(&self, a: bool, b: bool) {
        let _motion = self.motion.lock();
        if self.channel_a.read() != a {
            self.channel_a.set(a);
            self.notify(Channel::A, a);
        }
        if self.channel_b.read() != b {
            self.channel_b.set(b);
            self.notify(Channel::B, b);
        }
    }

    fn step(&self, forward: bool) {
        // Holding the motion lock serializes edge delivery like a single ISR.
        let mut motion = self.motion.lock();
        let (old_a, _) = SEQUENCE[motion.phase];
        motion.phase = if forward {
            (motion.phase + 1) % SEQUENCE.len()
        } else {
            (motion.phase + SEQUENCE.len() - 1) % SEQUENCE.len()
        };
        motion.position += if forward { 1 } else { -1 };

        let (a, b) = SEQUENCE[motion.phase];
        let (channel, pin, level) = if a != old_a {
            (Channel::A, &self.channel_a, a)
        } else {
            (Channel::B, &self.channel_b, b)
        };

        if self.bounce_probability > 0.0 && rand::thread_rng().gen_bool(self.bounce_probability) {
            pin.set(level);
            self.notify(channel, level);
            pin.set(!level);
            self.notify(channel, !level);
        }

        pin.set(level);
        self.notify(channel, level);
    }

    fn notify(&self, channel: Channel, level: bool) {
        for (subscribed, callback) in self.subscribers.read().iter() {
            if *subscribed == channel {
                callback(channel, level);
            }
        }
    }
}

impl Default for SimulatedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeSource for SimulatedEncoder {
    fn subscribe(&self, channel: Channel, callback: EdgeCallback) {
        self.subscribers.write().push((channel, callback));
    }
}
