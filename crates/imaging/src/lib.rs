pub mod error;
pub mod frame;
pub mod pixel;
pub mod snapshot;
pub mod tensor;
pub mod transform;

pub use error::ImagingError;
pub use frame::{BYTES_PER_PIXEL, PixelFormat, PixelFrame};
pub use pixel::Pixel32;
pub use snapshot::{load_rgba, save_png};
pub use tensor::{
    DEFAULT_IMAGE_MEAN, DEFAULT_IMAGE_STD, ImageTensor, Normalization, TENSOR_CHANNELS, encode_tensor,
};
pub use transform::{Rotation, crop, crop_to_square, rotate, rotate_frame, scale};
