use crate::error::ImagingError;
use crate::pixel::{Pixel32, as_bytes, as_pixels};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Grayscale8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => BYTES_PER_PIXEL,
            PixelFormat::Grayscale8 => 1,
        }
    }
}

/// A captured image in RGBA8 layout, row-major, top row first.
///
/// The buffer always holds exactly `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

pub(crate) fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

impl PixelFrame {
    /// Zero-filled frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; rgba_len(width, height)],
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImagingError> {
        let expected = rgba_len(width, height);
        if data.len() != expected {
            return Err(ImagingError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_pixels(width: u32, height: u32, pixels: &[Pixel32]) -> Result<Self, ImagingError> {
        Self::from_raw(width, height, as_bytes(pixels).to_vec())
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Pixel32) -> Self {
        let mut data = Vec::with_capacity(rgba_len(width, height));
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&<[u8; 4]>::from(f(x, y)));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels(&self) -> &[Pixel32] {
        as_pixels(&self.data)
    }

    /// Pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels()[y as usize * self.width as usize + x as usize])
    }

    /// Overwrite the contents in place. `bytes` must match the current size.
    pub fn overwrite(&mut self, bytes: &[u8]) -> Result<(), ImagingError> {
        if bytes.len() != self.data.len() {
            return Err(ImagingError::BufferSizeMismatch {
                expected: self.data.len(),
                actual: bytes.len(),
            });
        }
        self.data.copy_from_slice(bytes);
        Ok(())
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }
}

impl From<image::RgbaImage> for PixelFrame {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}
