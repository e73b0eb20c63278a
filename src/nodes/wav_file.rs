//! WAV file source
//!
//! Provides `WavFileSource` - a [`ControlTrackSource`] that reads a story tape
//! recorded as a WAV file and delivers its control channel (channel 1) in
//! sequential blocks. Integer PCM is normalized to `[-1, 1]`; float PCM is
//! passed through unchanged.

use super::source::{ControlTrackSource, TrackFormat};
use crate::runtime::sample::{CONTROL_CHANNEL, ControlBlock};
use crate::{Result, RuxpunkError};
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header information from a WAV file
#[derive(Debug, Clone)]
pub struct WavHeader {
    /// Number of interleaved channels
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per stored sample
    pub bits_per_sample: u16,
    /// Integer or float PCM
    pub sample_format: SampleFormat,
    /// Samples per channel
    pub total_samples: u64,
}

/// Source that reads the control channel of a WAV file sequentially
///
/// # Example
/// ```no_run
/// use ruxpunk::{ControlTrackSource, WavFileSource};
///
/// let source = WavFileSource::open("story.wav")?;
/// println!("{} channels", source.format().channels);
/// # Ok::<(), ruxpunk::RuxpunkError>(())
/// ```
pub struct WavFileSource {
    path: PathBuf,
    reader: WavReader<BufReader<File>>,
    header: WavHeader,
    /// Divisor that maps integer PCM onto [-1, 1]
    int_scale: f32,
    /// Samples per channel consumed so far
    position: u64,
    /// Decode error hit after part of a block was already delivered
    pending_error: Option<RuxpunkError>,
}

impl WavFileSource {
    /// Open a WAV file and parse its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path)?;
        let spec = reader.spec();

        match spec.sample_format {
            SampleFormat::Float if spec.bits_per_sample != 32 => {
                return Err(RuxpunkError::UnsupportedFormat(format!(
                    "{}-bit float PCM",
                    spec.bits_per_sample
                )));
            }
            SampleFormat::Int if !(1..=32).contains(&spec.bits_per_sample) => {
                return Err(RuxpunkError::UnsupportedFormat(format!(
                    "{}-bit integer PCM",
                    spec.bits_per_sample
                )));
            }
            _ => {}
        }

        let header = WavHeader {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: spec.sample_format,
            total_samples: u64::from(reader.duration()),
        };
        let int_scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;

        info!(
            "Opened {}: {} channels, {} Hz, {}-bit {:?}, {} samples",
            path.display(),
            header.channels,
            header.sample_rate,
            header.bits_per_sample,
            header.sample_format,
            header.total_samples
        );

        Ok(Self {
            path,
            reader,
            header,
            int_scale,
            position: 0,
            pending_error: None,
        })
    }

    /// Get the header information
    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Path the source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    /// Get the total number of samples per channel
    pub fn total_samples(&self) -> u64 {
        self.header.total_samples
    }

    /// Get the recording duration in seconds
    pub fn capture_duration(&self) -> f64 {
        self.format().duration()
    }

    /// Samples per channel read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read `frames` interleaved frames, keeping only the control channel.
    ///
    /// A trailing partial frame (truncated file) is dropped.
    fn read_frames<T, F>(&mut self, frames: usize, block: &mut ControlBlock, convert: F) -> Result<()>
    where
        T: hound::Sample,
        F: Fn(T) -> f32,
    {
        let channels = self.header.channels as usize;
        let mut samples = self.reader.samples::<T>();
        'frames: for _ in 0..frames {
            let mut control = 0.0;
            for ch in 0..channels {
                match samples.next() {
                    Some(sample) => {
                        let sample = sample?;
                        if ch == CONTROL_CHANNEL {
                            control = convert(sample);
                        }
                    }
                    None => break 'frames,
                }
            }
            block.samples.push(control);
        }
        Ok(())
    }
}

impl ControlTrackSource for WavFileSource {
    fn format(&self) -> TrackFormat {
        TrackFormat {
            channels: self.header.channels,
            sample_rate: self.header.sample_rate,
            total_samples: self.header.total_samples,
        }
    }

    fn read_block(&mut self, max_samples: usize, block: &mut ControlBlock) -> Result<usize> {
        block.reset(self.position);
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }
        if !self.format().has_control_channel() {
            return Ok(0);
        }

        let remaining = self.header.total_samples.saturating_sub(self.position);
        let frames = remaining.min(max_samples as u64) as usize;
        if frames == 0 {
            return Ok(0);
        }

        let result = match self.header.sample_format {
            SampleFormat::Float => self.read_frames::<f32, _>(frames, block, |s| s),
            SampleFormat::Int => {
                let scale = self.int_scale;
                self.read_frames::<i32, _>(frames, block, move |s| s as f32 / scale)
            }
        };
        let n = block.len();
        if let Err(e) = result {
            debug!(
                "Read failed at sample {} of {}: {}",
                self.position + n as u64,
                self.path.display(),
                e
            );
            if n == 0 {
                return Err(e);
            }
            // Hand out the complete frames first, the error on the next read
            self.pending_error = Some(e);
        }

        self.position += n as u64;
        Ok(n)
    }
}
