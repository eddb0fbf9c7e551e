use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Invalid dimension: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Region {width}x{height} at ({x}, {y}) exceeds {frame_width}x{frame_height} frame")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Unsupported rotation: {0} degrees (must be a multiple of 90)")]
    UnsupportedRotation(i32),

    #[error("Invalid normalization: std must be finite and non-zero, got {0}")]
    InvalidNormalization(f32),

    #[error("Resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("Invalid resize buffer: {0}")]
    ResizeBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub(crate) fn ensure_dimensions(width: u32, height: u32) -> Result<(), ImagingError> {
    if width == 0 || height == 0 {
        return Err(ImagingError::InvalidDimension { width, height });
    }
    Ok(())
}
