//! Runtime support: sample blocks, the frame index and the background worker

pub mod frame_index;
pub mod sample;
pub mod worker;

pub use frame_index::{FrameIndex, time_to_sample};
pub use sample::{CONTROL_CHANNEL, ControlBlock, Sample};
pub use worker::AnalysisWorker;
