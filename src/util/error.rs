//! Error types for pyrscan.

use thiserror::Error;

/// Result alias for pyrscan operations.
pub type PyrScanResult<T> = std::result::Result<T, PyrScanError>;

/// Coarse classification of a failure, used by callers that only care which
/// stage rejected the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input image could not be read, decoded or viewed.
    Input,
    /// The configuration is invalid for the given input.
    Config,
    /// The scorer failed or returned a malformed batch.
    Scoring,
}

/// Errors that can occur when running the detection pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PyrScanError {
    /// The image file could not be opened, decoded or written.
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Only 1, 3 or 4 interleaved channels are supported.
    #[error("unsupported channel count {channels}")]
    InvalidChannels { channels: usize },
    /// Row stride is shorter than a row of pixels.
    #[error("stride {stride} is shorter than row length {row_len}")]
    InvalidStride { row_len: usize, stride: usize },
    /// The backing buffer cannot hold the described image.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region of interest extends past the image bounds.
    #[error("roi ({x}, {y}, {width}x{height}) outside {img_width}x{img_height} image")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// The sliding window does not fit in the resized image.
    #[error("roi size {roi_width}x{roi_height} larger than image {img_width}x{img_height}")]
    RoiLargerThanImage {
        roi_width: usize,
        roi_height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The scorer reported a failure.
    #[error("scoring failed: {reason}")]
    Scoring { reason: String },
    /// The scorer returned a different number of results than crops.
    #[error("scorer returned {got} predictions for {expected} crops")]
    ScoreCountMismatch { expected: usize, got: usize },
    /// A confidence is not a finite value in `[0, 1]`.
    #[error("prediction {index} has invalid confidence {confidence}")]
    InvalidConfidence { index: usize, confidence: f32 },
}

impl PyrScanError {
    /// Returns the pipeline stage this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PyrScanError::ImageIo { .. }
            | PyrScanError::InvalidDimensions { .. }
            | PyrScanError::InvalidChannels { .. }
            | PyrScanError::InvalidStride { .. }
            | PyrScanError::BufferTooSmall { .. }
            | PyrScanError::RoiOutOfBounds { .. } => ErrorKind::Input,
            PyrScanError::InvalidConfig(_) | PyrScanError::RoiLargerThanImage { .. } => {
                ErrorKind::Config
            }
            PyrScanError::Scoring { .. }
            | PyrScanError::ScoreCountMismatch { .. }
            | PyrScanError::InvalidConfidence { .. } => ErrorKind::Scoring,
        }
    }
}
