use crate::error::{ImagingError, ensure_dimensions};
use crate::pixel::Pixel32;
use common::span_debug;
use ndarray::{Array, ArrayViewD, IxDyn};

pub const TENSOR_CHANNELS: usize = 3;
pub const DEFAULT_IMAGE_MEAN: f32 = 117.0;
pub const DEFAULT_IMAGE_STD: f32 = 1.0;

/// Per-channel `(value - mean) / std`, shared by R, G and B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    mean: f32,
    std: f32,
}

impl Normalization {
    pub fn new(mean: f32, std: f32) -> Result<Self, ImagingError> {
        if !std.is_finite() || std == 0.0 || !mean.is_finite() {
            return Err(ImagingError::InvalidNormalization(std));
        }
        Ok(Self { mean, std })
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn std(&self) -> f32 {
        self.std
    }

    /// Normalize one channel value and truncate it back to a byte.
    ///
    /// The fractional part is dropped first, then the integer wraps into
    /// 8 bits, so values below the mean land in the upper half (100 - 117
    /// becomes 239).
    #[inline]
    pub fn apply(&self, value: u8) -> u8 {
        ((value as f32 - self.mean) / self.std) as i32 as u8
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: DEFAULT_IMAGE_MEAN,
            std: DEFAULT_IMAGE_STD,
        }
    }
}

/// Model input: `width * height * 3` bytes shaped `(1, width, height, 3)`.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Array<u8, IxDyn>,
}

impl ImageTensor {
    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayViewD<'_, u8> {
        self.data.view()
    }

    /// Flat channel-interleaved bytes in pixel order.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice().unwrap_or_default()
    }

    pub fn into_array(self) -> Array<u8, IxDyn> {
        self.data
    }
}

/// Pack RGB channels (alpha dropped) of a row-major pixel matrix into a
/// model tensor.
pub fn encode_tensor(
    pixels: &[Pixel32],
    width: u32,
    height: u32,
    normalization: &Normalization,
) -> Result<ImageTensor, ImagingError> {
    let _s = span_debug!("encode_tensor");

    ensure_dimensions(width, height)?;
    let (w, h) = (width as usize, height as usize);
    if pixels.len() != w * h {
        return Err(ImagingError::BufferSizeMismatch {
            expected: w * h * 4,
            actual: pixels.len() * 4,
        });
    }

    let mut values = Vec::with_capacity(w * h * TENSOR_CHANNELS);
    for px in pixels {
        values.push(normalization.apply(px.r));
        values.push(normalization.apply(px.g));
        values.push(normalization.apply(px.b));
    }

    let data = Array::from_shape_vec(IxDyn(&[1, w, h, TENSOR_CHANNELS]), values)?;
    Ok(ImageTensor { data })
}
