//! Time-indexed decoded frames
//!
//! Frames are kept in emission order, which is ascending by sample position,
//! so lookups are a binary search over the positions.

use crate::nodes::decoders::{DecodedFrame, TimestampedFrame};
use crate::{Result, RuxpunkError};

/// Ordered frames from one offline analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameIndex {
    frames: Vec<TimestampedFrame>,
}

impl FrameIndex {
    /// Wrap frames that are already ascending by `sample_position`
    pub fn new(frames: Vec<TimestampedFrame>) -> Self {
        debug_assert!(
            frames
                .windows(2)
                .all(|w| w[0].sample_position <= w[1].sample_position),
            "frames must be in ascending sample order"
        );
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[TimestampedFrame] {
        &self.frames
    }

    pub fn first(&self) -> Option<&TimestampedFrame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&TimestampedFrame> {
        self.frames.last()
    }

    /// Entry of the last frame at or before `target_sample`.
    ///
    /// A target before the first frame yields the first frame.
    pub fn lookup(&self, target_sample: u64) -> Result<&TimestampedFrame> {
        let first = self.frames.first().ok_or(RuxpunkError::EmptyFrameIndex)?;
        let idx = self
            .frames
            .partition_point(|f| f.sample_position <= target_sample);
        Ok(match idx {
            0 => first,
            n => &self.frames[n - 1],
        })
    }

    /// Frame to show at `time` seconds into a recording of `duration` seconds
    /// and `total_samples` samples per channel.
    ///
    /// The time is mapped to `floor(time / duration * total_samples)`.
    pub fn frame_at_time(
        &self,
        time: f64,
        duration: f64,
        total_samples: u64,
    ) -> Result<DecodedFrame> {
        let target = time_to_sample(time, duration, total_samples);
        self.lookup(target).map(|entry| entry.frame)
    }

    pub fn into_frames(self) -> Vec<TimestampedFrame> {
        self.frames
    }
}

impl From<Vec<TimestampedFrame>> for FrameIndex {
    fn from(frames: Vec<TimestampedFrame>) -> Self {
        Self::new(frames)
    }
}

/// `floor(time / duration * total_samples)`, saturating at the `u64` range.
///
/// Negative or NaN results map to sample 0.
pub fn time_to_sample(time: f64, duration: f64, total_samples: u64) -> u64 {
    (time / duration * total_samples as f64).floor() as u64
}
