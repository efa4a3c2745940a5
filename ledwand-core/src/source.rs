//! Frame sources feeding the display session.
//!
//! A source delivers exactly `width * height` greyscale bytes per call,
//! row-major, one byte per pixel. The session trusts that layout and
//! rejects anything else with [`LedwandError::InvalidDimensions`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LedwandError;
use crate::frame::Dimensions;

/// Producer of greyscale frames.
pub trait FrameSource {
    /// Size of every frame this source yields.
    fn dimensions(&self) -> Dimensions;

    /// Overwrite `buffer` with the next frame.
    fn next_frame(&mut self, buffer: &mut Vec<u8>) -> Result<(), LedwandError>;
}

fn read_file_into(path: &Path, buffer: &mut Vec<u8>) -> Result<(), LedwandError> {
    buffer.clear();
    File::open(path)?.read_to_end(buffer)?;
    Ok(())
}

// ── TestPattern ──────────────────────────────────────────────────

/// Diagonal gradient that drifts a few pixels per frame.
#[derive(Debug, Clone)]
pub struct TestPattern {
    dims: Dimensions,
    phase: usize,
}

impl TestPattern {
    pub fn new(dims: Dimensions) -> Self {
        Self { dims, phase: 0 }
    }
}

impl FrameSource for TestPattern {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn next_frame(&mut self, buffer: &mut Vec<u8>) -> Result<(), LedwandError> {
        let width = self.dims.width();
        buffer.clear();
        buffer.extend((0..self.dims.pixels()).map(|i| {
            let (x, y) = (i % width, i / width);
            ((x + 2 * y + self.phase) % 256) as u8
        }));
        self.phase = (self.phase + 4) % 256;
        Ok(())
    }
}

// ── GreyFile ─────────────────────────────────────────────────────

/// Raw 8-bit greyscale file, re-read on every frame.
#[derive(Debug, Clone)]
pub struct GreyFile {
    dims: Dimensions,
    path: PathBuf,
}

impl GreyFile {
    pub fn new(dims: Dimensions, path: impl Into<PathBuf>) -> Self {
        Self {
            dims,
            path: path.into(),
        }
    }
}

impl FrameSource for GreyFile {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn next_frame(&mut self, buffer: &mut Vec<u8>) -> Result<(), LedwandError> {
        read_file_into(&self.path, buffer)?;
        self.dims.check_frame_len(buffer.len())
    }
}

// ── XrgbFile ─────────────────────────────────────────────────────

/// Per-channel weights for colour to grey conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumaWeights {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Default for LumaWeights {
    /// Flat 0.3 per channel, as the original capture path used.
    fn default() -> Self {
        Self {
            red: 0.3,
            green: 0.3,
            blue: 0.3,
        }
    }
}

impl LumaWeights {
    /// Grey value of a little-endian `0x00RRGGBB` pixel.
    pub fn grey(&self, pixel: u32) -> u8 {
        let blue = (pixel & 0xff) as f32;
        let green = ((pixel >> 8) & 0xff) as f32;
        let red = ((pixel >> 16) & 0xff) as f32;
        (red * self.red + green * self.green + blue * self.blue).clamp(0.0, 255.0) as u8
    }
}

/// Raw 32-bit XRGB pixel file, re-read and converted on every frame.
#[derive(Debug, Clone)]
pub struct XrgbFile {
    dims: Dimensions,
    path: PathBuf,
    weights: LumaWeights,
    scratch: Vec<u8>,
}

impl XrgbFile {
    pub fn new(dims: Dimensions, path: impl Into<PathBuf>, weights: LumaWeights) -> Self {
        Self {
            dims,
            path: path.into(),
            weights,
            scratch: Vec::with_capacity(dims.pixels() * 4),
        }
    }
}

impl FrameSource for XrgbFile {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn next_frame(&mut self, buffer: &mut Vec<u8>) -> Result<(), LedwandError> {
        read_file_into(&self.path, &mut self.scratch)?;
        let expected = self.dims.pixels() * 4;
        if self.scratch.len() != expected {
            return Err(LedwandError::InvalidDimensions {
                expected,
                actual: self.scratch.len(),
            });
        }

        buffer.clear();
        buffer.extend(self.scratch.chunks_exact(4).map(|px| {
            self.weights
                .grey(u32::from_le_bytes([px[0], px[1], px[2], px[3]]))
        }));
        Ok(())
    }
}

// ── BitmapFile ───────────────────────────────────────────────────

/// Pre-packed 1-bit bitmap that is drawn without dithering.
#[derive(Debug, Clone)]
pub struct BitmapFile {
    dims: Dimensions,
    path: PathBuf,
}

impl BitmapFile {
    pub fn new(dims: Dimensions, path: impl Into<PathBuf>) -> Self {
        Self {
            dims,
            path: path.into(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Read the packed bitmap into `buffer`.
    pub fn read(&self, buffer: &mut Vec<u8>) -> Result<(), LedwandError> {
        read_file_into(&self.path, buffer)?;
        if buffer.len() != self.dims.bitmap_len() {
            return Err(LedwandError::InvalidDimensions {
                expected: self.dims.bitmap_len(),
                actual: buffer.len(),
            });
        }
        Ok(())
    }
}
