use crate::error::{ImagingError, ensure_dimensions};
use crate::frame::{BYTES_PER_PIXEL, PixelFrame};
use crate::pixel::Pixel32;
use common::span_debug;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};

/// Quarter-turn rotations. Counter-clockwise is what the capture pipeline
/// uses to undo the sensor orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Clockwise90,
    Half,
    CounterClockwise90,
}

impl Rotation {
    /// Positive degrees turn clockwise, negative counter-clockwise.
    pub fn from_degrees(degrees: i32) -> Result<Self, ImagingError> {
        if degrees % 90 != 0 {
            return Err(ImagingError::UnsupportedRotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Clockwise90,
            180 => Rotation::Half,
            _ => Rotation::CounterClockwise90,
        })
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Half => 180,
            Rotation::CounterClockwise90 => -90,
        }
    }

    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::CounterClockwise90)
    }
}

/// Crop the centered `min(W, H)` square.
pub fn crop_to_square(frame: &PixelFrame) -> Result<PixelFrame, ImagingError> {
    let (width, height) = (frame.width(), frame.height());
    ensure_dimensions(width, height)?;

    let side = width.min(height);
    crop(frame, (width - side) / 2, (height - side) / 2, side, side)
}

pub fn crop(
    frame: &PixelFrame,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<PixelFrame, ImagingError> {
    ensure_dimensions(width, height)?;

    let fits_x = x.checked_add(width).is_some_and(|r| r <= frame.width());
    let fits_y = y.checked_add(height).is_some_and(|b| b <= frame.height());
    if !fits_x || !fits_y {
        return Err(ImagingError::RegionOutOfBounds {
            x,
            y,
            width,
            height,
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
    }

    let src = frame.as_bytes();
    let src_stride = frame.width() as usize * BYTES_PER_PIXEL;
    let row_len = width as usize * BYTES_PER_PIXEL;
    let col_offset = x as usize * BYTES_PER_PIXEL;

    let mut data = Vec::with_capacity(row_len * height as usize);
    for row in y as usize..(y + height) as usize {
        let start = row * src_stride + col_offset;
        data.extend_from_slice(&src[start..start + row_len]);
    }

    PixelFrame::from_raw(width, height, data)
}

/// Bilinear resample to exactly `target_width x target_height`.
///
/// Alpha is interpolated like any other channel. Input that already has the
/// target size is returned as-is.
pub fn scale(
    image: &PixelFrame,
    target_width: u32,
    target_height: u32,
) -> Result<PixelFrame, ImagingError> {
    let _s = span_debug!("scale");

    ensure_dimensions(image.width(), image.height())?;
    ensure_dimensions(target_width, target_height)?;

    if image.width() == target_width && image.height() == target_height {
        return Ok(image.clone());
    }

    let src = ImageRef::new(
        image.width(),
        image.height(),
        image.as_bytes(),
        PixelType::U8x4,
    )?;
    let mut dst = Image::new(target_width, target_height, PixelType::U8x4);

    Resizer::new().resize(
        &src,
        &mut dst,
        &ResizeOptions::new()
            .resize_alg(ResizeAlg::Interpolation(FilterType::Bilinear))
            .use_alpha(false),
    )?;

    PixelFrame::from_raw(target_width, target_height, dst.into_vec())
}

/// Rotate a row-major pixel matrix by a multiple of 90 degrees.
///
/// Index mapping, with `W x H` the source size:
/// - `-90`: `out[r][c] = src[c][W - 1 - r]`, output is `H x W`
/// - `+90`: `out[r][c] = src[H - 1 - c][r]`, output is `H x W`
/// - `180`: `out[r][c] = src[H - 1 - r][W - 1 - c]`
pub fn rotate(
    pixels: &[Pixel32],
    width: u32,
    height: u32,
    degrees: i32,
) -> Result<PixelFrame, ImagingError> {
    let rotation = Rotation::from_degrees(degrees)?;
    ensure_dimensions(width, height)?;

    let (w, h) = (width as usize, height as usize);
    if pixels.len() != w * h {
        return Err(ImagingError::BufferSizeMismatch {
            expected: w * h * BYTES_PER_PIXEL,
            actual: pixels.len() * BYTES_PER_PIXEL,
        });
    }

    let mut out: Vec<Pixel32> = Vec::with_capacity(pixels.len());
    match rotation {
        Rotation::None => out.extend_from_slice(pixels),
        Rotation::Half => out.extend(pixels.iter().rev()),
        Rotation::CounterClockwise90 => {
            for r in 0..w {
                out.extend((0..h).map(|c| pixels[c * w + (w - 1 - r)]));
            }
        }
        Rotation::Clockwise90 => {
            for r in 0..w {
                out.extend((0..h).map(|c| pixels[(h - 1 - c) * w + r]));
            }
        }
    }

    let (out_w, out_h) = if rotation.swaps_dimensions() {
        (height, width)
    } else {
        (width, height)
    };
    PixelFrame::from_pixels(out_w, out_h, &out)
}

pub fn rotate_frame(frame: &PixelFrame, degrees: i32) -> Result<PixelFrame, ImagingError> {
    rotate(frame.pixels(), frame.width(), frame.height(), degrees)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Each pixel encodes its own coordinates: r = x, g = y.
    fn coordinate_frame(width: u32, height: u32) -> PixelFrame {
        PixelFrame::from_fn(width, height, |x, y| Pixel32::opaque(x as u8, y as u8, 7))
    }

    // ========== Crop ==========

    #[test]
    fn test_crop_to_square_landscape_is_centered() {
        let frame = coordinate_frame(10, 4);
        let square = crop_to_square(&frame).unwrap();

        assert_eq!((square.width(), square.height()), (4, 4));
        // Left margin 3, right margin 3
        assert_eq!(square.pixel(0, 0), Some(Pixel32::opaque(3, 0, 7)));
        assert_eq!(square.pixel(3, 3), Some(Pixel32::opaque(6, 3, 7)));
    }

    #[test]
    fn test_crop_to_square_odd_margin_differs_by_at_most_one() {
        for (w, h) in [(9, 4), (7, 2), (1920, 1080), (5, 5), (3, 8)] {
            let frame = PixelFrame::new(w, h);
            let square = crop_to_square(&frame).unwrap();
            let side = w.min(h);
            assert_eq!((square.width(), square.height()), (side, side));

            let left = (w - side) / 2;
            let right = w - side - left;
            assert!(right - left <= 1, "{}x{}: left {} right {}", w, h, left, right);
        }
    }

    #[test]
    fn test_crop_to_square_portrait_is_centered() {
        let frame = coordinate_frame(4, 10);
        let square = crop_to_square(&frame).unwrap();

        assert_eq!((square.width(), square.height()), (4, 4));
        assert_eq!(square.pixel(0, 0), Some(Pixel32::opaque(0, 3, 7)));
    }

    #[test]
    fn test_crop_rejects_empty_frame() {
        let frame = PixelFrame::new(0, 10);
        assert!(matches!(
            crop_to_square(&frame),
            Err(ImagingError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_crop_rejects_region_outside_frame() {
        let frame = PixelFrame::new(4, 4);
        assert!(matches!(
            crop(&frame, 2, 0, 3, 1),
            Err(ImagingError::RegionOutOfBounds { .. })
        ));
        assert!(crop(&frame, 1, 1, 3, 3).is_ok());
    }

    // ========== Scale ==========

    #[test]
    fn test_scale_always_produces_target_size() {
        for (w, h) in [(1080, 1080), (640, 480), (17, 301), (2, 2)] {
            let frame = PixelFrame::from_fn(w, h, |x, y| Pixel32::opaque(x as u8, y as u8, 0));
            let scaled = scale(&frame, 300, 300).unwrap();
            assert_eq!((scaled.width(), scaled.height()), (300, 300));
            assert_eq!(scaled.as_bytes().len(), 300 * 300 * 4);
        }
    }

    #[test]
    fn test_scale_uniform_image_stays_uniform() {
        let frame = PixelFrame::from_fn(64, 48, |_, _| Pixel32::new(120, 60, 30, 255));
        let scaled = scale(&frame, 300, 300).unwrap();
        let close = |a: u8, b: u8| a.abs_diff(b) <= 1;
        assert!(
            scaled.pixels().iter().all(|p| close(p.r, 120)
                && close(p.g, 60)
                && close(p.b, 30)
                && close(p.a, 255)),
            "Bilinear interpolation of a flat image must stay flat"
        );
    }

    #[test]
    fn test_scale_is_deterministic() {
        let frame = coordinate_frame(97, 61);
        let a = scale(&frame, 300, 300).unwrap();
        let b = scale(&frame, 300, 300).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scale_same_size_is_identity() {
        let frame = coordinate_frame(30, 30);
        assert_eq!(scale(&frame, 30, 30).unwrap(), frame);
    }

    #[test]
    fn test_scale_rejects_zero_target() {
        let frame = PixelFrame::new(4, 4);
        assert!(matches!(
            scale(&frame, 0, 300),
            Err(ImagingError::InvalidDimension { .. })
        ));
    }

    // ========== Rotate ==========

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::CounterClockwise90);
        assert_eq!(Rotation::from_degrees(270).unwrap(), Rotation::CounterClockwise90);
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Clockwise90);
        assert_eq!(Rotation::from_degrees(-180).unwrap(), Rotation::Half);
        assert_eq!(Rotation::from_degrees(720).unwrap(), Rotation::None);
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(ImagingError::UnsupportedRotation(45))
        ));
    }

    #[test]
    fn test_rotate_counter_clockwise_known_bitmap() {
        // 3x2 source:
        //   a b c
        //   d e f
        // -90 gives 2x3:
        //   c f
        //   b e
        //   a d
        let [a, b, c, d, e, f] = [1u8, 2, 3, 4, 5, 6].map(|v| Pixel32::opaque(v, 0, 0));
        let rotated = rotate(&[a, b, c, d, e, f], 3, 2, -90).unwrap();

        assert_eq!((rotated.width(), rotated.height()), (2, 3));
        assert_eq!(rotated.pixels(), &[c, f, b, e, a, d]);
    }

    #[test]
    fn test_rotate_clockwise_known_bitmap() {
        //   a b c      d a
        //   d e f  ->  e b
        //              f c
        let [a, b, c, d, e, f] = [1u8, 2, 3, 4, 5, 6].map(|v| Pixel32::opaque(v, 0, 0));
        let rotated = rotate(&[a, b, c, d, e, f], 3, 2, 90).unwrap();

        assert_eq!((rotated.width(), rotated.height()), (2, 3));
        assert_eq!(rotated.pixels(), &[d, a, e, b, f, c]);
    }

    #[test]
    fn test_rotate_half_reverses_matrix() {
        let frame = coordinate_frame(4, 3);
        let rotated = rotate_frame(&frame, 180).unwrap();
        assert_eq!((rotated.width(), rotated.height()), (4, 3));
        assert_eq!(rotated.pixel(0, 0), frame.pixel(3, 2));
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let frame = coordinate_frame(7, 3);
        let rotated = rotate_frame(&frame, -90).unwrap();
        assert_eq!((rotated.width(), rotated.height()), (3, 7));
    }

    #[test]
    fn test_four_counter_clockwise_turns_restore_original() {
        let frame = coordinate_frame(5, 3);
        let mut current = frame.clone();
        for _ in 0..4 {
            current = rotate_frame(&current, -90).unwrap();
        }
        assert_eq!(current, frame);
    }

    #[test]
    fn test_clockwise_undoes_counter_clockwise() {
        let frame = coordinate_frame(6, 4);
        let there = rotate_frame(&frame, -90).unwrap();
        let back = rotate_frame(&there, 90).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_rotate_rejects_mismatched_pixel_count() {
        let pixels = vec![Pixel32::default(); 5];
        assert!(matches!(
            rotate(&pixels, 2, 2, -90),
            Err(ImagingError::BufferSizeMismatch { .. })
        ));
    }
}
