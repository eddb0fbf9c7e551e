use bytemuck::{Pod, Zeroable};

/// One RGBA8 pixel. Layout matches four consecutive bytes of an RGBA buffer,
/// so byte buffers can be viewed as pixel slices without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Pixel32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel32 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, u8::MAX)
    }

    pub const fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 4]> for Pixel32 {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Pixel32> for [u8; 4] {
    fn from(p: Pixel32) -> Self {
        [p.r, p.g, p.b, p.a]
    }
}

/// View an RGBA byte buffer as pixels. The length must be a multiple of 4.
pub fn as_pixels(bytes: &[u8]) -> &[Pixel32] {
    bytemuck::cast_slice(bytes)
}

pub fn as_bytes(pixels: &[Pixel32]) -> &[u8] {
    bytemuck::cast_slice(pixels)
}
