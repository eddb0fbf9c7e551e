use crate::adapter::FrameCapture;
use crate::error::CaptureError;
use imaging::{PixelFormat, PixelFrame, load_rgba};
use std::path::PathBuf;

/// Replays still images as if they were camera callbacks.
///
/// Frames are delivered in path order and loop forever.
pub struct ImageSequenceSource {
    frames: Vec<PixelFrame>,
    cursor: usize,
}

impl ImageSequenceSource {
    /// Load every image matching `pattern`, sorted by path. Unreadable files
    /// are skipped with a warning.
    pub fn from_glob(pattern: &str) -> Result<Self, CaptureError> {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable frame path");
                    None
                }
            })
            .collect();
        paths.sort();

        let frames: Vec<PixelFrame> = paths
            .iter()
            .filter_map(|path| match load_rgba(path) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping frame");
                    None
                }
            })
            .collect();

        if frames.is_empty() {
            return Err(CaptureError::EmptySource(pattern.to_string()));
        }

        tracing::info!(pattern, frames = frames.len(), "Loaded image sequence");
        Ok(Self { frames, cursor: 0 })
    }

    pub fn from_frames(frames: Vec<PixelFrame>) -> Result<Self, CaptureError> {
        if frames.is_empty() {
            return Err(CaptureError::EmptySource("<in-memory>".to_string()));
        }
        Ok(Self { frames, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push the next frame through the capture callback.
    pub fn deliver(&mut self, capture: &mut FrameCapture) -> Result<(), CaptureError> {
        let frame = &self.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.frames.len();

        let bytes = frame.as_bytes();
        capture.on_frame_available(
            PixelFormat::Rgba8,
            frame.width(),
            frame.height(),
            bytes,
            bytes.len(),
        )
    }
}
