use common::span;
use imaging::{
    ImageTensor, ImagingError, Normalization, PixelFrame, Rotation, crop_to_square, encode_tensor,
    rotate_frame, save_png, scale,
};
use std::path::PathBuf;

pub const SNAP_FILE: &str = "snap.png";
pub const SCALED_FILE: &str = "scaled.png";
pub const ROTATED_FILE: &str = "rotated.png";

/// Camera frame to model tensor: centered square crop, bilinear scale to the
/// model input size, rotation into model orientation, then encoding.
#[derive(Debug, Clone)]
pub struct PreProcessor {
    pub input_size: u32,
    pub rotation: Rotation,
    pub normalization: Normalization,
    snapshot_dir: Option<PathBuf>,
}

impl PreProcessor {
    pub fn new(input_size: u32, normalization: Normalization) -> Self {
        Self {
            input_size,
            rotation: Rotation::CounterClockwise90,
            normalization,
            snapshot_dir: None,
        }
    }

    /// Write each intermediate image as PNG into `dir` on every pass.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn prepare(&self, frame: &PixelFrame) -> Result<ImageTensor, ImagingError> {
        let _s = span!("preprocess_frame");

        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            input_size = self.input_size,
            "Preprocessing frame"
        );

        let square = crop_to_square(frame)?;
        self.snapshot(SNAP_FILE, &square);

        let scaled = scale(&square, self.input_size, self.input_size)?;
        self.snapshot(SCALED_FILE, &scaled);

        let rotated = rotate_frame(&scaled, self.rotation.degrees())?;
        self.snapshot(ROTATED_FILE, &rotated);

        encode_tensor(
            rotated.pixels(),
            rotated.width(),
            rotated.height(),
            &self.normalization,
        )
    }

    // Debug side channel only: failures never abort the pass.
    fn snapshot(&self, name: &str, frame: &PixelFrame) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };
        if let Err(e) = save_png(dir, name, frame) {
            tracing::warn!(error = %e, file = name, "Failed to write debug snapshot");
        }
    }
}
