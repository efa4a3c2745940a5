//! Floyd–Steinberg error diffusion.
//!
//! Converts an 8-bit greyscale frame into a packed 1-bit bitmap. Pixels
//! are visited in plain raster order; each quantisation error is spread
//! to the four forward neighbours with weights 7/16, 3/16, 5/16 and 1/16.
//! Neighbours outside the frame are skipped.

use tracing::trace;

use crate::error::LedwandError;
use crate::frame::{DitherBitmap, Dimensions};

/// Default black/white cutoff (mid-grey).
pub const DEFAULT_BIAS: u8 = 127;

/// Summary of one dithering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DitherStats {
    /// Pixels set in the output.
    pub lit: usize,
    /// Largest absolute value the accumulator held.
    pub peak: u32,
}

/// Reusable ditherer for frames of a fixed size.
///
/// Owns the signed accumulator so it is allocated once and overwritten
/// every cycle.
#[derive(Debug, Clone)]
pub struct Ditherer {
    dims: Dimensions,
    bias: u8,
    accumulator: Vec<i32>,
    stats: DitherStats,
}

impl Ditherer {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            bias: DEFAULT_BIAS,
            accumulator: Vec::with_capacity(dims.pixels()),
            stats: DitherStats::default(),
        }
    }

    /// Pixels strictly above `bias` light up.
    pub fn with_bias(mut self, bias: u8) -> Self {
        self.bias = bias;
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn bias(&self) -> u8 {
        self.bias
    }

    /// Statistics of the most recent pass.
    pub fn stats(&self) -> DitherStats {
        self.stats
    }

    /// Dither a greyscale frame, reusing its storage for the result.
    ///
    /// `buffer` must hold exactly `width * height` samples. On success it
    /// comes back shrunk to `width / 8 * height` packed bytes inside the
    /// returned bitmap; call [`DitherBitmap::into_inner`] to recycle it.
    pub fn dither(&mut self, mut buffer: Vec<u8>) -> Result<DitherBitmap, LedwandError> {
        self.dims.check_frame_len(buffer.len())?;

        let width = self.dims.width();
        let height = self.dims.height();
        let row_bytes = self.dims.row_bytes();
        let bias = i32::from(self.bias);

        let acc = &mut self.accumulator;
        acc.clear();
        acc.extend(buffer.iter().map(|&s| i32::from(s)));

        buffer.clear();
        buffer.resize(self.dims.bitmap_len(), 0);

        let mut stats = DitherStats::default();
        for row in 0..height {
            for col in 0..width {
                let i = row * width + col;
                let value = acc[i];
                stats.peak = stats.peak.max(value.unsigned_abs());

                let lit = value > bias;
                if lit {
                    buffer[row * row_bytes + col / 8] |= 0x80 >> (col % 8);
                    stats.lit += 1;
                }

                let diff = value - if lit { 255 } else { 0 };
                if diff == 0 {
                    continue;
                }

                let has_right = col + 1 < width;
                if has_right {
                    acc[i + 1] += 7 * diff / 16;
                }
                if row + 1 < height {
                    let below = i + width;
                    if col > 0 {
                        acc[below - 1] += 3 * diff / 16;
                    }
                    acc[below] += 5 * diff / 16;
                    if has_right {
                        acc[below + 1] += diff / 16;
                    }
                }
            }
        }

        trace!(lit = stats.lit, peak = stats.peak, "dithered frame");
        self.stats = stats;
        Ok(DitherBitmap::from_parts(self.dims, buffer))
    }
}
