//! Control track processing nodes
//!
//! - **Sources**: Deliver the control channel of a recording in blocks
//! - **Decoders**: The pulse decoder state machine and its frame types
//! - **Drivers**: Batch (`OfflineAnalyzer`) and real-time (`StreamingDecoder`)
//!
//! Both drivers step the same [`decoders::PulseDecoder`], so a recording
//! decodes to the same frames whichever way it is fed.

pub mod analyzer;
pub mod decoders;
pub mod source;
pub mod streaming_decoder;
mod wav_file;

// Export sources for file and in-memory input
pub use source::{ControlTrackSource, MemorySource, TrackFormat};
pub use wav_file::{WavFileSource, WavHeader};

// Re-export Sample from runtime
pub use crate::runtime::Sample;
