//! Control track decoders
//!
//! The pulse decoder state machine plus the rescaling and frame types it produces.

pub mod pulse_decoder;
pub mod rescale;
pub mod types;

// Re-export common types
pub use rescale::{Rescale, RescaleDomain};
pub use types::{DecodedFrame, Joint, TimestampedFrame};

// Re-export decoder
pub use pulse_decoder::{
    DECODE_TABLE, FRAME_SYNC_SAMPLES, PULSE_SLOTS, PulseDecoder, decode_frame,
};
