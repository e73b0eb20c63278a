//! Common decoder types

use std::fmt;

/// One complete set of joint commands for both puppets
///
/// Angles are in degrees. Eyes range over `0..=90`, mouth halves over `0..=45`.
/// The "grubby" fields drive the secondary puppet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedFrame {
    pub eye: u8,
    pub top_mouth: u8,
    pub bottom_mouth: u8,
    pub grubby_eye: u8,
    pub grubby_top_mouth: u8,
    pub grubby_bottom_mouth: u8,
}

impl DecodedFrame {
    /// Value of a single joint
    pub fn joint(&self, joint: Joint) -> u8 {
        match joint {
            Joint::Eye => self.eye,
            Joint::TopMouth => self.top_mouth,
            Joint::BottomMouth => self.bottom_mouth,
            Joint::GrubbyEye => self.grubby_eye,
            Joint::GrubbyTopMouth => self.grubby_top_mouth,
            Joint::GrubbyBottomMouth => self.grubby_bottom_mouth,
        }
    }

    pub(crate) fn set_joint(&mut self, joint: Joint, value: u8) {
        match joint {
            Joint::Eye => self.eye = value,
            Joint::TopMouth => self.top_mouth = value,
            Joint::BottomMouth => self.bottom_mouth = value,
            Joint::GrubbyEye => self.grubby_eye = value,
            Joint::GrubbyTopMouth => self.grubby_top_mouth = value,
            Joint::GrubbyBottomMouth => self.grubby_bottom_mouth = value,
        }
    }
}

impl fmt::Display for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Frame[eye={}, top={}, bottom={} | grubby eye={}, top={}, bottom={}]",
            self.eye,
            self.top_mouth,
            self.bottom_mouth,
            self.grubby_eye,
            self.grubby_top_mouth,
            self.grubby_bottom_mouth
        )
    }
}

/// Puppet joints carried by the control track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Eye,
    TopMouth,
    BottomMouth,
    GrubbyEye,
    GrubbyTopMouth,
    GrubbyBottomMouth,
}

impl Joint {
    /// All joints in frame field order
    pub const ALL: [Joint; 6] = [
        Joint::Eye,
        Joint::TopMouth,
        Joint::BottomMouth,
        Joint::GrubbyEye,
        Joint::GrubbyTopMouth,
        Joint::GrubbyBottomMouth,
    ];

    /// Short column name, used for CSV headers
    pub fn name(&self) -> &'static str {
        match self {
            Joint::Eye => "eye",
            Joint::TopMouth => "top_mouth",
            Joint::BottomMouth => "bottom_mouth",
            Joint::GrubbyEye => "grubby_eye",
            Joint::GrubbyTopMouth => "grubby_top_mouth",
            Joint::GrubbyBottomMouth => "grubby_bottom_mouth",
        }
    }
}

/// A decoded frame tagged with the absolute sample position that completed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedFrame {
    /// Index (per channel) of the sample that ended the frame sync run
    pub sample_position: u64,
    pub frame: DecodedFrame,
}

impl TimestampedFrame {
    pub fn new(sample_position: u64, frame: DecodedFrame) -> Self {
        Self {
            sample_position,
            frame,
        }
    }

    /// Position in seconds for the given sample rate
    pub fn seconds(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.sample_position as f64 / sample_rate as f64
    }
}
