//! Control track sources
//!
//! A [`ControlTrackSource`] is the boundary to whatever decodes the audio
//! container. It reports the track layout once and then hands out the
//! control channel sequentially, one [`ControlBlock`] at a time.

use crate::runtime::sample::{CONTROL_CHANNEL, ControlBlock, Sample};
use crate::{Result, RuxpunkError};

/// Layout of a decoded recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackFormat {
    /// Number of interleaved channels in the recording
    pub channels: u16,
    /// Samples per second, per channel
    pub sample_rate: u32,
    /// Samples per channel in the whole recording
    pub total_samples: u64,
}

impl TrackFormat {
    /// Whether the recording has a control channel at all
    pub fn has_control_channel(&self) -> bool {
        self.channels as usize > CONTROL_CHANNEL
    }

    /// Recording length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64
    }
}

/// Sequential supplier of control-channel samples
pub trait ControlTrackSource {
    /// Layout of the underlying recording
    fn format(&self) -> TrackFormat;

    /// Replace the contents of `block` with up to `max_samples` control-channel
    /// samples following the previous read.
    ///
    /// Returns the number of samples read; 0 means the track is exhausted.
    fn read_block(&mut self, max_samples: usize, block: &mut ControlBlock) -> Result<usize>;
}

impl<S: ControlTrackSource + ?Sized> ControlTrackSource for Box<S> {
    fn format(&self) -> TrackFormat {
        (**self).format()
    }

    fn read_block(&mut self, max_samples: usize, block: &mut ControlBlock) -> Result<usize> {
        (**self).read_block(max_samples, block)
    }
}

/// In-memory recording, for callers that decode audio themselves
#[derive(Debug, Clone)]
pub struct MemorySource {
    /// Control channel only; the other channels are not needed for decoding
    control: Vec<Sample>,
    channels: u16,
    sample_rate: u32,
    /// Samples per channel, also for recordings without a control channel
    total_samples: u64,
    position: usize,
}

impl MemorySource {
    /// Build from interleaved samples. A trailing partial frame is dropped.
    pub fn interleaved(samples: &[Sample], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(RuxpunkError::InvalidLayout(
                "channel count must be at least 1".to_string(),
            ));
        }
        let frames = samples.chunks_exact(channels as usize);
        let total_samples = frames.len() as u64;
        let control = if channels as usize > CONTROL_CHANNEL {
            frames.map(|frame| frame[CONTROL_CHANNEL]).collect()
        } else {
            Vec::new()
        };
        Ok(Self {
            control,
            channels,
            sample_rate,
            total_samples,
            position: 0,
        })
    }

    /// Build from one buffer per channel. All channels must have equal length.
    pub fn planar(channels: Vec<Vec<Sample>>, sample_rate: u32) -> Result<Self> {
        let count = u16::try_from(channels.len()).map_err(|_| {
            RuxpunkError::InvalidLayout(format!("too many channels: {}", channels.len()))
        })?;
        if count == 0 {
            return Err(RuxpunkError::InvalidLayout(
                "channel count must be at least 1".to_string(),
            ));
        }
        let len = channels[0].len();
        if let Some((idx, ch)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != len) {
            return Err(RuxpunkError::InvalidLayout(format!(
                "channel {} has {} samples, channel 0 has {}",
                idx,
                ch.len(),
                len
            )));
        }
        let control = channels.into_iter().nth(CONTROL_CHANNEL).unwrap_or_default();
        Ok(Self {
            control,
            channels: count,
            sample_rate,
            total_samples: len as u64,
            position: 0,
        })
    }

    /// Stereo recording with silent narration and the given control channel
    pub fn stereo(control: Vec<Sample>, sample_rate: u32) -> Self {
        let total_samples = control.len() as u64;
        Self {
            control,
            channels: 2,
            sample_rate,
            total_samples,
            position: 0,
        }
    }

    /// Rewind to the start of the recording
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl ControlTrackSource for MemorySource {
    fn format(&self) -> TrackFormat {
        TrackFormat {
            channels: self.channels,
            sample_rate: self.sample_rate,
            total_samples: self.total_samples,
        }
    }

    fn read_block(&mut self, max_samples: usize, block: &mut ControlBlock) -> Result<usize> {
        block.reset(self.position as u64);
        let end = self.position.saturating_add(max_samples).min(self.control.len());
        block.samples.extend_from_slice(&self.control[self.position..end]);
        let n = end - self.position;
        self.position = end;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_extracts_channel_one() {
        let samples = [0.9, -0.1, 0.8, -0.2, 0.7, -0.3, 0.6];
        let mut source = MemorySource::interleaved(&samples, 2, 44_100).unwrap();
        let format = source.format();
        assert_eq!(format.channels, 2);
        assert_eq!(format.total_samples, 3);
        assert!(format.has_control_channel());

        let mut block = ControlBlock::default();
        assert_eq!(source.read_block(10, &mut block).unwrap(), 3);
        assert_eq!(block.samples, vec![-0.1, -0.2, -0.3]);
        assert_eq!(source.read_block(10, &mut block).unwrap(), 0);
        assert!(block.is_empty());
    }

    #[test]
    fn test_interleaved_mono_has_no_control() {
        let mut source = MemorySource::interleaved(&[0.1, 0.2, 0.3, 0.4], 1, 8_000).unwrap();
        let format = source.format();
        assert!(!format.has_control_channel());
        assert_eq!(format.total_samples, 4);
        assert!((format.duration() - 0.0005).abs() < 1e-12);

        let mut block = ControlBlock::default();
        assert_eq!(source.read_block(10, &mut block).unwrap(), 0);
    }

    #[test]
    fn test_planar_mono_reports_length() {
        let source = MemorySource::planar(vec![vec![0.0; 6]], 8_000).unwrap();
        assert!(!source.format().has_control_channel());
        assert_eq!(source.format().total_samples, 6);
    }

    #[test]
    fn test_interleaved_zero_channels_rejected() {
        let result = MemorySource::interleaved(&[0.1], 0, 8_000);
        assert!(matches!(result, Err(RuxpunkError::InvalidLayout(_))));
    }

    #[test]
    fn test_planar_layout() {
        let mut source =
            MemorySource::planar(vec![vec![0.0; 4], vec![-1.0, 1.0, -1.0, 1.0], vec![0.5; 4]], 22_050)
                .unwrap();
        assert_eq!(source.format().channels, 3);
        let mut block = ControlBlock::default();
        source.read_block(2, &mut block).unwrap();
        assert_eq!(block.samples, vec![-1.0, 1.0]);
        assert_eq!(block.start_position, 0);
        source.read_block(2, &mut block).unwrap();
        assert_eq!(block.samples, vec![-1.0, 1.0]);
        assert_eq!(block.start_position, 2);
    }

    #[test]
    fn test_planar_ragged_rejected() {
        let result = MemorySource::planar(vec![vec![0.0; 4], vec![0.0; 3]], 22_050);
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("channel 1 has 3 samples"));
        }
    }

    #[test]
    fn test_rewind() {
        let mut source = MemorySource::stereo(vec![0.1, 0.2, 0.3], 8_000);
        let mut block = ControlBlock::default();
        source.read_block(3, &mut block).unwrap();
        source.rewind();
        assert_eq!(source.read_block(1, &mut block).unwrap(), 1);
        assert_eq!(block.start_position, 0);
    }

    #[test]
    fn test_duration() {
        let source = MemorySource::stereo(vec![0.0; 22_050], 44_100);
        assert!((source.format().duration() - 0.5).abs() < 1e-12);
    }
}
