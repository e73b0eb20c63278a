//! Streaming decoder for live playback
//!
//! Real-time driver: owns one long-lived [`PulseDecoder`] and is fed buffers
//! from an audio tap as they arrive. Each frame boundary reached while
//! feeding is handed synchronously to a [`FrameSink`].
//!
//! `feed` runs on the audio callback thread. It does not block, lock,
//! allocate or log; the decoder state is a fixed array updated in place.
//! For any buffer boundaries the emitted frames equal what the offline
//! analyzer decodes from the same samples.

use super::decoders::{DecodedFrame, PulseDecoder};
use crate::runtime::sample::{CONTROL_CHANNEL, Sample};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives frames as the streaming decoder completes them
///
/// Called on the audio thread, so implementations must not block.
pub trait FrameSink {
    fn on_frame(&mut self, frame: DecodedFrame);
}

impl<F: FnMut(DecodedFrame)> FrameSink for F {
    fn on_frame(&mut self, frame: DecodedFrame) {
        self(frame)
    }
}

/// Long-lived decoder for a live control channel
pub struct StreamingDecoder<S> {
    decoder: PulseDecoder,
    sink: S,
    samples_fed: u64,
}

impl<F: FnMut(DecodedFrame)> StreamingDecoder<F> {
    /// Create a decoder that calls `on_frame` for every decoded frame
    pub fn with_callback(on_frame: F) -> Self {
        Self::new(on_frame)
    }
}

impl<S: FrameSink> StreamingDecoder<S> {
    /// Create a decoder that delivers frames to `sink`
    pub fn new(sink: S) -> Self {
        Self {
            decoder: PulseDecoder::new(),
            sink,
            samples_fed: 0,
        }
    }

    /// Decode a buffer of control-channel samples.
    ///
    /// Returns the number of frames delivered during this call.
    #[inline]
    pub fn feed(&mut self, buffer: &[Sample]) -> usize {
        let mut emitted = 0;
        for &sample in buffer {
            if let Some(frame) = self.decoder.step(sample) {
                self.sink.on_frame(frame);
                emitted += 1;
            }
        }
        self.samples_fed += buffer.len() as u64;
        emitted
    }

    /// Decode the control channel of an interleaved multichannel buffer.
    ///
    /// Buffers with no control channel are ignored; a trailing partial frame
    /// is not decoded.
    pub fn feed_interleaved(&mut self, buffer: &[Sample], channels: usize) -> usize {
        if channels <= CONTROL_CHANNEL {
            return 0;
        }
        let mut emitted = 0;
        let mut fed = 0u64;
        for frame in buffer.chunks_exact(channels) {
            if let Some(decoded) = self.decoder.step(frame[CONTROL_CHANNEL]) {
                self.sink.on_frame(decoded);
                emitted += 1;
            }
            fed += 1;
        }
        self.samples_fed += fed;
        emitted
    }

    /// Discard any partial frame, e.g. after the playback position jumps
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.samples_fed = 0;
    }

    /// Replace the frame sink, keeping decoder state
    pub fn set_sink(&mut self, sink: S) {
        self.sink = sink;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn decoder(&self) -> &PulseDecoder {
        &self.decoder
    }

    /// Control samples consumed since creation or the last reset
    pub fn samples_fed(&self) -> u64 {
        self.samples_fed
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Hands frames from the audio thread to a consumer thread
///
/// Backed by a bounded channel: sending never blocks and never allocates.
/// When the consumer falls behind, new frames are dropped and counted.
#[derive(Clone)]
pub struct FrameForwarder {
    tx: Sender<DecodedFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameForwarder {
    /// Create a forwarder holding up to `capacity` undelivered frames
    pub fn new(capacity: usize) -> (Self, Receiver<DecodedFrame>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Frames discarded because the channel was full or disconnected
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared handle to the drop counter, readable from any thread
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl FrameSink for FrameForwarder {
    #[inline]
    fn on_frame(&mut self, frame: DecodedFrame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl StreamingDecoder<FrameForwarder> {
    /// Decoder whose frames are readable from the returned receiver
    pub fn forwarding(capacity: usize) -> (Self, Receiver<DecodedFrame>) {
        let (forwarder, rx) = FrameForwarder::new(capacity);
        (Self::new(forwarder), rx)
    }
}
