//! Edge-callback wiring between encoder pins and a decoder.
//!
//! On each edge both channels are sampled and the pair is handed to the
//! decoder; the level reported by the edge itself is not trusted, because by
//! the time the callback runs the other channel may have moved as well.

use std::sync::Arc;

use kenbot_common::hal::{Channel, DigitalInput, EdgeSource};
use tracing::debug;

use super::QuadratureDecoder;

/// Samples a pair of encoder pins into a decoder.
pub struct EncoderInput {
    decoder: Arc<QuadratureDecoder>,
    channel_a: Box<dyn DigitalInput>,
    channel_b: Box<dyn DigitalInput>,
}

impl EncoderInput {
    /// Build an input without subscribing to any edges (for polled use).
    pub fn new<A, B>(decoder: Arc<QuadratureDecoder>, channel_a: A, channel_b: B) -> Self
    where
        A: DigitalInput + 'static,
        B: DigitalInput + 'static,
    {
        Self {
            decoder,
            channel_a: Box::new(channel_a),
            channel_b: Box::new(channel_b),
        }
    }

    /// Build an input and subscribe it to the edges its decoder's mode needs.
    ///
    /// Channel A is always subscribed; channel B only in quad resolution.
    pub fn attach<S, A, B>(
        decoder: Arc<QuadratureDecoder>,
        source: &S,
        channel_a: A,
        channel_b: B,
    ) -> Arc<Self>
    where
        S: EdgeSource + ?Sized,
        A: DigitalInput + 'static,
        B: DigitalInput + 'static,
    {
        let input = Arc::new(Self::new(decoder, channel_a, channel_b));
        for &channel in input.subscribed_channels() {
            let i = Arc::clone(&input);
            source.subscribe(channel, Box::new(move |_, _| i.sample()));
            debug!(channel = %channel, "edge subscription added");
        }
        debug!(
            mode = ?input.decoder.mode(),
            channels = input.subscribed_channels().len(),
            "encoder input attached"
        );
        input
    }

    /// Channels whose edges drive this input.
    pub fn subscribed_channels(&self) -> &'static [Channel] {
        self.decoder.mode().edge_channels()
    }

    /// Read both pins and feed the decoder.
    #[inline]
    pub fn sample(&self) {
        let a = self.channel_a.read();
        let b = self.channel_b.read();
        self.decoder.process_readings(a, b);
    }

    /// Decoder this input feeds.
    pub fn decoder(&self) -> &Arc<QuadratureDecoder> {
        &self.decoder
    }
}
