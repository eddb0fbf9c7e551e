use imaging::{ImagingError, PixelFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No frame captured yet")]
    NoFrameAvailable,

    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("Invalid frame dimension: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid frame pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("No readable frames match {0}")]
    EmptySource(String),

    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),
}
