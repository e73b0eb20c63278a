//! Offline analyzer
//!
//! Batch driver that decodes a whole recording up front so a puppet can be
//! resynchronized to any playback position. Reads the control channel in
//! fixed-size blocks, steps one [`PulseDecoder`] over every sample in order
//! and records each frame with the absolute position of the sample that
//! completed it. Block size has no effect on the decoded output.

use super::decoders::{DecodedFrame, PulseDecoder, TimestampedFrame};
use super::source::{ControlTrackSource, TrackFormat};
use super::wav_file::WavFileSource;
use crate::Result;
use crate::runtime::frame_index::FrameIndex;
use crate::runtime::sample::ControlBlock;
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Default number of samples read per block
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Decode every frame of a source with the default settings
pub fn analyze<S: ControlTrackSource + ?Sized>(source: &mut S) -> Vec<TimestampedFrame> {
    OfflineAnalyzer::new().analyze(source)
}

/// Everything decoded from one recording
#[derive(Debug, Clone)]
pub struct Analysis {
    pub index: FrameIndex,
    pub format: TrackFormat,
}

impl Analysis {
    /// Recording length in seconds
    pub fn duration(&self) -> f64 {
        self.format.duration()
    }

    /// Frame to show at `time` seconds of playback
    pub fn frame_at_seconds(&self, time: f64) -> Result<DecodedFrame> {
        self.index
            .frame_at_time(time, self.duration(), self.format.total_samples)
    }
}

/// Outcome of a (possibly interrupted) analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalysisRun {
    pub frames: Vec<TimestampedFrame>,
    /// Samples consumed from the source
    pub samples_read: u64,
    /// False if the run was stopped by the caller before the end of the track
    pub completed: bool,
}

/// Batch decoder for whole recordings
#[derive(Debug, Clone)]
pub struct OfflineAnalyzer {
    chunk_size: usize,
    max_samples: Option<u64>,
}

impl Default for OfflineAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineAnalyzer {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_samples: None,
        }
    }

    /// Set the number of samples read per block (minimum 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Stop after this many samples per channel
    pub fn with_max_samples(mut self, max_samples: Option<u64>) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Decode every frame of `source`.
    ///
    /// Recordings without a control channel yield no frames. A read error
    /// ends decoding early and the frames found up to that point are returned.
    pub fn analyze<S>(&self, source: &mut S) -> Vec<TimestampedFrame>
    where
        S: ControlTrackSource + ?Sized,
    {
        self.analyze_while(source, || true).frames
    }

    /// Open a WAV file and decode it into an [`Analysis`]
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<Analysis> {
        let mut source = WavFileSource::open(path)?;
        let frames = self.analyze(&mut source);
        Ok(Analysis {
            index: FrameIndex::new(frames),
            format: source.format(),
        })
    }

    /// Decode `source`, checking `keep_going` before each block.
    ///
    /// When `keep_going` returns false the run stops with `completed = false`.
    pub fn analyze_while<S, F>(&self, source: &mut S, keep_going: F) -> AnalysisRun
    where
        S: ControlTrackSource + ?Sized,
        F: Fn() -> bool,
    {
        let format = source.format();
        info!(
            "Analyzing {} samples ({} channels, {} Hz) in blocks of {}",
            format.total_samples, format.channels, format.sample_rate, self.chunk_size
        );

        let mut run = AnalysisRun::default();
        if !format.has_control_channel() {
            info!("Mono recording has no control track, nothing to decode");
            run.completed = true;
            return run;
        }

        let limit = self.max_samples.unwrap_or(u64::MAX);
        let mut decoder = PulseDecoder::new();
        let mut block = ControlBlock::with_capacity(self.chunk_size);
        let mut blocks_read: u64 = 0;

        loop {
            if !keep_going() {
                debug!("Analysis stopped by caller at sample {}", run.samples_read);
                return run;
            }

            let remaining = limit.saturating_sub(run.samples_read);
            if remaining == 0 {
                break;
            }
            let want = remaining.min(self.chunk_size as u64) as usize;

            let n = match source.read_block(want, &mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!(
                        "Read failed after {} samples, keeping {} frames: {}",
                        run.samples_read,
                        run.frames.len(),
                        e
                    );
                    break;
                }
            };

            for (offset, &sample) in block.samples.iter().enumerate() {
                if let Some(frame) = decoder.step(sample) {
                    let position = block.position_of(offset);
                    trace!("Frame #{} at sample {}: {}", run.frames.len(), position, frame);
                    run.frames.push(TimestampedFrame::new(position, frame));
                }
            }

            run.samples_read += n as u64;
            blocks_read += 1;
            if blocks_read % 256 == 0 && format.total_samples > 0 {
                let pct = (run.samples_read as f64 / format.total_samples as f64) * 100.0;
                debug!(
                    "Progress: {:.1}% ({} samples, {} frames)",
                    pct,
                    run.samples_read,
                    run.frames.len()
                );
            }
        }

        run.completed = true;
        info!(
            "Analysis complete: {} frames from {} samples",
            run.frames.len(),
            run.samples_read
        );
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuxpunkError;
    use crate::nodes::decoders::pulse_decoder::signal;
    use crate::nodes::source::MemorySource;
    use crate::nodes::streaming_decoder::StreamingDecoder;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::cell::Cell;
    use tempfile::TempDir;

    /// Serves a fixed control track, failing once `fail_at` samples are read
    struct FlakySource {
        inner: MemorySource,
        read: u64,
        fail_at: u64,
    }

    impl ControlTrackSource for FlakySource {
        fn format(&self) -> TrackFormat {
            self.inner.format()
        }

        fn read_block(&mut self, max_samples: usize, block: &mut ControlBlock) -> Result<usize> {
            if self.read >= self.fail_at {
                return Err(RuxpunkError::Io(std::io::Error::other("tape snapped")));
            }
            let n = self.inner.read_block(max_samples, block)?;
            self.read += n as u64;
            Ok(n)
        }
    }

    fn stream(samples: &[f32], buffer: usize) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();
        let mut decoder = StreamingDecoder::with_callback(|f| frames.push(f));
        for chunk in samples.chunks(buffer) {
            decoder.feed(chunk);
        }
        drop(decoder);
        frames
    }

    #[test]
    fn test_single_frame_position() {
        let samples = signal::frame(&signal::distances(52, 73, 45, 62, 50, 55));
        let mut source = MemorySource::stereo(samples.clone(), 44_100);
        let frames = analyze(&mut source);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sample_position, samples.len() as u64 - 1);
        assert_eq!(frames[0].frame.eye, 45);
        assert_eq!(frames[0].frame.grubby_bottom_mouth, 22);
    }

    #[test]
    fn test_chunk_size_invariance() {
        let samples = signal::tape(40);
        let reference = OfflineAnalyzer::new()
            .analyze(&mut MemorySource::stereo(samples.clone(), 44_100));
        assert_eq!(reference.len(), 40);

        for chunk in [1, 7, 130, 1024, 8191, 1 << 20] {
            let frames = OfflineAnalyzer::new()
                .with_chunk_size(chunk)
                .analyze(&mut MemorySource::stereo(samples.clone(), 44_100));
            assert_eq!(frames, reference, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_streaming_matches_offline() {
        let samples = signal::tape(40);
        let offline: Vec<DecodedFrame> = analyze(&mut MemorySource::stereo(samples.clone(), 44_100))
            .into_iter()
            .map(|f| f.frame)
            .collect();

        for buffer in [1, 7, 1024] {
            assert_eq!(stream(&samples, buffer), offline, "buffer size {}", buffer);
        }
    }

    #[test]
    fn test_positions_ascending() {
        let frames = analyze(&mut MemorySource::stereo(signal::tape(25), 44_100));
        assert!(frames.windows(2).all(|w| w[0].sample_position < w[1].sample_position));
    }

    #[test]
    fn test_mono_returns_empty() {
        let mut source = MemorySource::interleaved(&vec![-1.0; 1_000], 1, 44_100).unwrap();
        let run = OfflineAnalyzer::new().analyze_while(&mut source, || true);
        assert!(run.frames.is_empty());
        assert!(run.completed);
        assert_eq!(run.samples_read, 0);
    }

    #[test]
    fn test_non_negative_track_returns_empty() {
        let samples: Vec<f32> = (0..50_000).map(|i| ((i % 100) as f32) / 100.0).collect();
        assert!(analyze(&mut MemorySource::stereo(samples, 44_100)).is_empty());
    }

    #[test]
    fn test_read_failure_keeps_partial_result() {
        let samples = signal::tape(30);
        let full = analyze(&mut MemorySource::stereo(samples.clone(), 44_100));

        let fail_at = samples.len() as u64 / 2;
        let mut source = FlakySource {
            inner: MemorySource::stereo(samples, 44_100),
            read: 0,
            fail_at,
        };
        let partial = OfflineAnalyzer::new().with_chunk_size(100).analyze(&mut source);

        assert!(!partial.is_empty());
        assert!(partial.len() < full.len());
        assert_eq!(partial.as_slice(), &full[..partial.len()]);
    }

    #[test]
    fn test_max_samples_limit() {
        let samples = signal::tape(10);
        let full = analyze(&mut MemorySource::stereo(samples.clone(), 44_100));
        let cutoff = full[4].sample_position + 1;
        let frames = OfflineAnalyzer::new()
            .with_chunk_size(64)
            .with_max_samples(Some(cutoff))
            .analyze(&mut MemorySource::stereo(samples, 44_100));
        assert_eq!(frames.as_slice(), &full[..5]);
    }

    #[test]
    fn test_stop_before_first_block() {
        let mut source = MemorySource::stereo(signal::tape(5), 44_100);
        let run = OfflineAnalyzer::new().analyze_while(&mut source, || false);
        assert!(!run.completed);
        assert!(run.frames.is_empty());
    }

    #[test]
    fn test_stop_midway() {
        let samples = signal::tape(20);
        let blocks = Cell::new(0);
        let run = OfflineAnalyzer::new().with_chunk_size(500).analyze_while(
            &mut MemorySource::stereo(samples, 44_100),
            || {
                blocks.set(blocks.get() + 1);
                blocks.get() <= 3
            },
        );
        assert!(!run.completed);
        assert_eq!(run.samples_read, 1_500);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        assert_eq!(OfflineAnalyzer::new().with_chunk_size(0).chunk_size(), 1);
    }

    #[test]
    fn test_analyze_file_and_seek() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("story.wav");
        let control = signal::tape(8);
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for &c in &control {
            // Narration on the left, control on the right
            writer.write_sample(0.25f32).unwrap();
            writer.write_sample(c).unwrap();
        }
        writer.finalize().unwrap();

        let analysis = OfflineAnalyzer::new().analyze_file(&path).unwrap();
        let expected = analyze(&mut MemorySource::stereo(control.clone(), 44_100));
        assert_eq!(analysis.index.frames(), expected.as_slice());
        assert_eq!(analysis.format.total_samples, control.len() as u64);

        let first = analysis.index.first().unwrap().frame;
        let last = analysis.index.last().unwrap().frame;
        assert_eq!(analysis.frame_at_seconds(0.0).unwrap(), first);
        assert_eq!(analysis.frame_at_seconds(analysis.duration()).unwrap(), last);
    }

    #[test]
    fn test_analyze_mono_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..1_000 {
            writer.write_sample(-1000i16).unwrap();
        }
        writer.finalize().unwrap();

        let analysis = OfflineAnalyzer::new().analyze_file(&path).unwrap();
        assert!(analysis.index.is_empty());
        assert!(analysis.frame_at_seconds(0.0).is_err());
    }

    #[test]
    fn test_truncated_file_same_frames_for_any_chunk_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cut.wav");
        let control = signal::tape(20);
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for &c in &control {
            writer.write_sample(0i16).unwrap();
            writer.write_sample((c * 32_767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        // Cut the data chunk to about two thirds
        let data_len = control.len() as u64 * 4;
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        let header_len = file.metadata().unwrap().len() - data_len;
        file.set_len(header_len + data_len * 2 / 3 + 1).unwrap();
        drop(file);

        let full = analyze(&mut MemorySource::stereo(control, 44_100));
        let reference = OfflineAnalyzer::new()
            .with_chunk_size(1)
            .analyze_file(&path)
            .unwrap();
        assert!(!reference.index.is_empty());
        assert!(reference.index.len() < full.len());
        assert_eq!(reference.index.frames(), &full[..reference.index.len()]);

        for chunk in [7, 1024, DEFAULT_CHUNK_SIZE, 1 << 20] {
            let analysis = OfflineAnalyzer::new()
                .with_chunk_size(chunk)
                .analyze_file(&path)
                .unwrap();
            assert_eq!(analysis.index, reference.index, "chunk size {}", chunk);
        }
    }
}
