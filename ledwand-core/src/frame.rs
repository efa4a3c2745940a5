//! Frame geometry and the packed 1-bit bitmap.
//!
//! A greyscale frame is `width * height` bytes, one intensity per pixel,
//! row-major. The bitmap packs eight pixels per byte, most significant
//! bit first, with `width / 8` bytes per row.

use crate::error::LedwandError;

/// Width of the reference display wall in pixels.
pub const WIDTH: usize = 448;
/// Height of the reference framebuffer in pixels (including module gaps).
pub const HEIGHT: usize = 240;

// ── Dimensions ───────────────────────────────────────────────────

/// Pixel dimensions of a frame. Width is always a multiple of 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    width: usize,
    height: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::REFERENCE
    }
}

impl Dimensions {
    /// The 448×240 reference deployment.
    pub const REFERENCE: Self = Self {
        width: WIDTH,
        height: HEIGHT,
    };

    pub fn new(width: usize, height: usize) -> Result<Self, LedwandError> {
        if width == 0 || height == 0 || width % 8 != 0 {
            return Err(LedwandError::Config(format!(
                "frame must be non-empty with a width divisible by 8, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels (and greyscale bytes).
    pub fn pixels(&self) -> usize {
        self.width * self.height
    }

    /// Packed bytes per bitmap row.
    pub fn row_bytes(&self) -> usize {
        self.width / 8
    }

    /// Size of the packed bitmap.
    pub fn bitmap_len(&self) -> usize {
        self.row_bytes() * self.height
    }

    /// Fail unless `len` is exactly one greyscale frame.
    pub fn check_frame_len(&self, len: usize) -> Result<(), LedwandError> {
        if len != self.pixels() {
            return Err(LedwandError::InvalidDimensions {
                expected: self.pixels(),
                actual: len,
            });
        }
        Ok(())
    }
}

// ── DitherBitmap ─────────────────────────────────────────────────

/// Packed 1-bit-per-pixel output of the ditherer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherBitmap {
    dims: Dimensions,
    data: Vec<u8>,
}

impl DitherBitmap {
    /// Wrap an already packed buffer.
    pub fn from_packed(dims: Dimensions, data: Vec<u8>) -> Result<Self, LedwandError> {
        if data.len() != dims.bitmap_len() {
            return Err(LedwandError::InvalidDimensions {
                expected: dims.bitmap_len(),
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    pub(crate) fn from_parts(dims: Dimensions, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), dims.bitmap_len());
        Self { dims, data }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Packed bytes of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is not below the bitmap height.
    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.dims.row_bytes();
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Whether the pixel at `(x, y)` is lit.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        assert!(x < self.dims.width && y < self.dims.height);
        let byte = self.data[y * self.dims.row_bytes() + x / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// Number of lit pixels.
    pub fn count_lit(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Give back the storage so it can hold the next greyscale frame.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_geometry() {
        let d = Dimensions::REFERENCE;
        assert_eq!(d.pixels(), 107_520);
        assert_eq!(d.row_bytes(), 56);
        assert_eq!(d.bitmap_len(), 13_440);
    }

    #[test]
    fn width_must_be_byte_aligned() {
        assert!(Dimensions::new(447, 240).is_err());
        assert!(Dimensions::new(0, 240).is_err());
        assert!(Dimensions::new(16, 0).is_err());
        assert!(Dimensions::new(16, 3).is_ok());
    }

    #[test]
    fn frame_len_check() {
        let d = Dimensions::new(16, 2).unwrap();
        assert!(d.check_frame_len(32).is_ok());
        assert!(matches!(
            d.check_frame_len(31),
            Err(LedwandError::InvalidDimensions { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn pixel_addressing_is_msb_first() {
        let d = Dimensions::new(16, 2).unwrap();
        let bm = DitherBitmap::from_packed(d, vec![0x80, 0x01, 0x00, 0x40]).unwrap();
        assert!(bm.pixel(0, 0));
        assert!(!bm.pixel(1, 0));
        assert!(bm.pixel(15, 0));
        assert!(bm.pixel(9, 1));
        assert_eq!(bm.row(1), &[0x00, 0x40]);
        assert_eq!(bm.count_lit(), 3);
    }

    #[test]
    fn packed_len_is_validated() {
        let d = Dimensions::new(16, 2).unwrap();
        assert!(DitherBitmap::from_packed(d, vec![0; 3]).is_err());
    }
}
