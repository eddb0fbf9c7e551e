use crate::error::ImagingError;
use crate::frame::PixelFrame;
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Write `frame` as `<dir>/<name>`, PNG-encoded. The directory is created if
/// missing. Returns the written path.
pub fn save_png(dir: &Path, name: &str, frame: &PixelFrame) -> Result<PathBuf, ImagingError> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(name);
    frame
        .to_rgba_image()
        .save_with_format(&path, ImageFormat::Png)?;

    tracing::debug!(
        path = %path.display(),
        width = frame.width(),
        height = frame.height(),
        "Saved PNG snapshot"
    );
    Ok(path)
}

pub fn load_rgba(path: &Path) -> Result<PixelFrame, ImagingError> {
    let img = image::open(path)?.to_rgba8();
    Ok(PixelFrame::from(img))
}
