//! Control track decoder for talking-toy story tapes
//!
//! Story tapes carry narration on the left channel and a pulse-position
//! control signal on the right. This library decodes that signal into
//! puppet joint frames, either for a whole recording up front or live as
//! audio plays.
//!
//! # Architecture
//!
//! - **PulseDecoder**: Sample-by-sample synchronization state machine
//! - **OfflineAnalyzer**: Decodes a whole recording into a time-indexed `FrameIndex`
//! - **StreamingDecoder**: Real-time driver fed from an audio tap, one callback per frame
//! - **AnalysisWorker**: Runs offline analysis in the background and publishes the newest result
//! - **Sources**: `WavFileSource` and `MemorySource` deliver the control channel in blocks
//!
//! # Example
//!
//! ```no_run
//! use ruxpunk::OfflineAnalyzer;
//!
//! let analysis = OfflineAnalyzer::new().analyze_file("story.wav")?;
//! let frame = analysis.frame_at_seconds(12.5)?;
//! println!("{}", frame);
//! # Ok::<(), ruxpunk::RuxpunkError>(())
//! ```

use thiserror::Error;

pub mod nodes;
pub mod runtime;

// Re-export decoder data types
pub use nodes::decoders::{DecodedFrame, Joint, Rescale, RescaleDomain, TimestampedFrame};

// Re-export the decoder and drivers
pub use nodes::analyzer::{Analysis, AnalysisRun, OfflineAnalyzer, analyze};
pub use nodes::decoders::PulseDecoder;
pub use nodes::streaming_decoder::{FrameForwarder, FrameSink, StreamingDecoder};

// Re-export sources
pub use nodes::{ControlTrackSource, MemorySource, TrackFormat, WavFileSource};

// Re-export runtime components
pub use runtime::{AnalysisWorker, ControlBlock, FrameIndex, Sample};

#[derive(Error, Debug)]
pub enum RuxpunkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid channel layout: {0}")]
    InvalidLayout(String),

    #[error("Frame index is empty")]
    EmptyFrameIndex,
}

pub type Result<T> = std::result::Result<T, RuxpunkError>;
