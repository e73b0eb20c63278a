//! Pulse-position decoder — sample-by-sample synchronization state machine
//!
//! The control channel carries one frame as a train of pulses. Each pulse
//! starts on a falling edge (non-negative → negative) and the width of the
//! high segment that follows is the payload for that slot:
//!
//!   1. Every falling edge advances to the next slot (0..=9)
//!   2. Every high sample adds one to the current slot's width
//!   3. A run of [`FRAME_SYNC_SAMPLES`] consecutive low samples ends the frame:
//!      slot widths are rescaled into joint angles and all counters reset
//!
//! Edges past slot 9 (tape damage) are counted but never stored.

use super::rescale::{Rescale, RescaleDomain};
use super::types::{DecodedFrame, Joint};

/// Number of pulse slots tracked per frame
pub const PULSE_SLOTS: usize = 10;

/// Consecutive low samples that mark a frame boundary
pub const FRAME_SYNC_SAMPLES: u32 = 130;

const EYE: Rescale = Rescale::new(RescaleDomain::new(42.0, 62.0), RescaleDomain::new(0.0, 90.0));
const TOP_MOUTH: Rescale =
    Rescale::new(RescaleDomain::new(50.0, 73.0), RescaleDomain::new(0.0, 45.0));
const BOTTOM_MOUTH: Rescale =
    Rescale::new(RescaleDomain::new(45.0, 65.0), RescaleDomain::new(0.0, 45.0));

/// Slot → joint mapping. Slots 0, 1, 5 and 9 are spacers and never read.
pub const DECODE_TABLE: [(usize, Joint, Rescale); 6] = [
    (2, Joint::Eye, EYE),
    (3, Joint::TopMouth, TOP_MOUTH),
    (4, Joint::BottomMouth, BOTTOM_MOUTH),
    (6, Joint::GrubbyEye, EYE),
    (7, Joint::GrubbyTopMouth, TOP_MOUTH),
    (8, Joint::GrubbyBottomMouth, BOTTOM_MOUTH),
];

/// Build a frame from one set of slot widths
pub fn decode_frame(pulse_distances: &[u32; PULSE_SLOTS]) -> DecodedFrame {
    let mut frame = DecodedFrame::default();
    for (slot, joint, rescale) in DECODE_TABLE {
        let value = rescale.rescale_clamped(f64::from(pulse_distances[slot]));
        // Clamped into a target domain no wider than 0..=90
        frame.set_joint(joint, value as u8);
    }
    frame
}

/// Pulse decoder state
///
/// Owns all of its counters inline, so stepping never allocates and the
/// decoder can live on a real-time audio thread.
#[derive(Debug, Clone, Default)]
pub struct PulseDecoder {
    /// Falling edges seen since the last frame boundary
    pulse_count: usize,
    /// Length of the current run of low samples
    frame_pulse: u32,
    /// High-segment widths per slot
    pulse_distances: [u32; PULSE_SLOTS],
    /// Frames emitted over the decoder's lifetime
    frames_decoded: u64,
}

impl PulseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one sample, returning a frame when this sample completes a sync run
    #[inline]
    pub fn step(&mut self, sample: f32) -> Option<DecodedFrame> {
        if sample < 0.0 {
            if self.frame_pulse == 0 {
                self.pulse_count = self.pulse_count.saturating_add(1);
            }
            self.frame_pulse += 1;

            if self.frame_pulse == FRAME_SYNC_SAMPLES {
                let frame = decode_frame(&self.pulse_distances);
                self.clear();
                self.frames_decoded += 1;
                return Some(frame);
            }
        } else {
            // NaN compares false above and lands here as a high sample
            self.frame_pulse = 0;
            if let Some(width) = self.pulse_distances.get_mut(self.pulse_count) {
                *width = width.saturating_add(1);
            }
        }
        None
    }

    /// Return to the power-on state, discarding any partial frame
    pub fn reset(&mut self) {
        self.clear();
        self.frames_decoded = 0;
    }

    fn clear(&mut self) {
        self.frame_pulse = 0;
        self.pulse_count = 0;
        self.pulse_distances.fill(0);
    }

    pub fn pulse_count(&self) -> usize {
        self.pulse_count
    }

    pub fn frame_pulse(&self) -> u32 {
        self.frame_pulse
    }

    pub fn pulse_distances(&self) -> &[u32; PULSE_SLOTS] {
        &self.pulse_distances
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}
