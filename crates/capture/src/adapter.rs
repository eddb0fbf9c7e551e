use crate::error::CaptureError;
use imaging::{BYTES_PER_PIXEL, PixelFormat, PixelFrame};
use std::sync::Arc;

/// Bridges a push-style camera callback into a pollable "latest frame".
///
/// Single writer: only the owner of `&mut self` ingests frames. Readers take
/// [`Arc`] snapshots through [`FrameCapture::current_frame`], which never
/// blocks. Storage is overwritten in place when the size is unchanged and no
/// snapshot still references it; otherwise a fresh buffer is published and
/// outstanding snapshots keep the old one.
#[derive(Debug, Default)]
pub struct FrameCapture {
    latest: Option<Arc<PixelFrame>>,
    frames_received: u64,
    allocations: u64,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `size` bytes out of `buffer` into the adapter.
    ///
    /// The buffer is not retained after this returns. A rejected frame leaves
    /// the previously captured frame untouched.
    pub fn on_frame_available(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
        buffer: &[u8],
        size: usize,
    ) -> Result<(), CaptureError> {
        if format != PixelFormat::Rgba8 {
            return Err(CaptureError::UnsupportedFormat(format));
        }
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidDimension { width, height });
        }

        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if size != expected {
            return Err(CaptureError::SizeMismatch {
                expected,
                actual: size,
            });
        }
        let bytes = buffer.get(..size).ok_or(CaptureError::SizeMismatch {
            expected: size,
            actual: buffer.len(),
        })?;

        let reused = match self.latest.as_mut() {
            Some(frame) if frame.width() == width && frame.height() == height => {
                match Arc::get_mut(frame) {
                    Some(owned) => {
                        owned.overwrite(bytes)?;
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };

        if !reused {
            let frame = PixelFrame::from_raw(width, height, bytes.to_vec())?;
            if self.latest.is_none() {
                tracing::info!(width, height, "First frame captured");
            }
            self.latest = Some(Arc::new(frame));
            self.allocations += 1;
        }

        self.frames_received += 1;
        tracing::trace!(
            width,
            height,
            frames_received = self.frames_received,
            reused,
            "Frame ingested"
        );
        Ok(())
    }

    /// Latest captured frame.
    pub fn current_frame(&self) -> Result<Arc<PixelFrame>, CaptureError> {
        self.latest.clone().ok_or(CaptureError::NoFrameAvailable)
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.latest.as_ref().map(|f| (f.width(), f.height()))
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Number of times a new buffer had to be allocated.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}
