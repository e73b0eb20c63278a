//! Core data types for control track processing

use std::fmt;

/// Amplitude of the control channel at one sample, nominally in `[-1, 1]`
pub type Sample = f32;

/// Channel index that carries the control track in a multichannel recording
pub const CONTROL_CHANNEL: usize = 1;

/// A contiguous run of control-channel samples
///
/// Sources fill one block per read. The sample storage is reused across
/// reads, so a driver can keep a single block alive for an entire file.
#[derive(Clone, Debug, Default)]
pub struct ControlBlock {
    /// Control-channel samples, in file order
    pub samples: Vec<Sample>,
    /// Position of the first sample in this block (0-based, per channel)
    pub start_position: u64,
}

impl ControlBlock {
    /// Create an empty block able to hold `capacity` samples without reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            start_position: 0,
        }
    }

    /// Number of valid samples in this block
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Absolute position of the sample at `offset` within this block
    #[inline]
    pub fn position_of(&self, offset: usize) -> u64 {
        self.start_position + offset as u64
    }

    /// The position one past the last valid sample in this block
    #[inline]
    pub fn end_position(&self) -> u64 {
        self.start_position + self.samples.len() as u64
    }

    /// Empty the block and mark where the next samples start
    pub fn reset(&mut self, start_position: u64) {
        self.samples.clear();
        self.start_position = start_position;
    }
}

impl fmt::Display for ControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ControlBlock[start={}, samples={}]",
            self.start_position,
            self.samples.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions() {
        let mut block = ControlBlock::with_capacity(16);
        block.reset(8192);
        block.samples.extend([0.1, -0.2, 0.3]);
        assert_eq!(block.len(), 3);
        assert_eq!(block.position_of(0), 8192);
        assert_eq!(block.position_of(2), 8194);
        assert_eq!(block.end_position(), 8195);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut block = ControlBlock::with_capacity(64);
        block.samples.extend(std::iter::repeat_n(0.0, 64));
        let capacity = block.samples.capacity();
        block.reset(64);
        assert!(block.is_empty());
        assert_eq!(block.samples.capacity(), capacity);
        assert_eq!(block.start_position, 64);
    }
}
