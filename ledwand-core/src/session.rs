//! Display session: one owned connection plus the per-frame pipeline.
//!
//! ```text
//! FrameSource ──► Ditherer ──► FrameStreamer ──► PacketFramer ──► Transport
//! ```
//!
//! The session keeps a single frame buffer that cycles between
//! greyscale input and packed bitmap output, and the ditherer keeps its
//! accumulator, so a steady-state frame allocates nothing.

use tracing::{debug, info, warn};

use crate::dither::Ditherer;
use crate::error::LedwandError;
use crate::frame::{DitherBitmap, Dimensions};
use crate::network::{Connection, Transport};
use crate::packet::PacketFramer;
use crate::source::FrameSource;
use crate::stream::{FrameStreamer, StreamReport};

/// Owned sender state for one display wall.
#[derive(Debug)]
pub struct DisplaySession<T: Transport = Connection> {
    transport: T,
    framer: PacketFramer,
    ditherer: Ditherer,
    streamer: FrameStreamer,
    buffer: Vec<u8>,
    frames: u64,
}

impl<T: Transport> DisplaySession<T> {
    /// Assemble a session, checking that a full band fits one packet.
    pub fn new(
        transport: T,
        framer: PacketFramer,
        ditherer: Ditherer,
        streamer: FrameStreamer,
    ) -> Result<Self, LedwandError> {
        let dims = ditherer.dimensions();
        streamer.check_fits(&framer, dims.row_bytes())?;
        Ok(Self {
            transport,
            framer,
            ditherer,
            streamer,
            buffer: Vec::with_capacity(dims.pixels()),
            frames: 0,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.ditherer.dimensions()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Frames streamed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clear(&mut self) -> Result<(), LedwandError> {
        let packet = self.framer.clear()?;
        self.transport.send(&packet)
    }

    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), LedwandError> {
        let packet = self.framer.set_brightness(brightness)?;
        self.transport.send(&packet)
    }

    pub fn reset(&mut self, hard: bool) -> Result<(), LedwandError> {
        let packet = self.framer.reset(hard)?;
        self.transport.send(&packet)
    }

    /// Blank the display, then optionally set its brightness.
    ///
    /// Send failures are logged; only framing errors are returned.
    pub fn prepare(&mut self, brightness: Option<u8>) -> Result<(), LedwandError> {
        if let Err(e) = self.clear() {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("clear command dropped: {e}");
        }
        if let Some(level) = brightness {
            if let Err(e) = self.set_brightness(level) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("brightness command dropped: {e}");
            }
        }
        info!(?brightness, "display prepared");
        Ok(())
    }

    /// Dither a greyscale frame and stream it.
    ///
    /// Consumes `frame`; its storage becomes the packed bitmap.
    pub fn draw_image(&mut self, frame: Vec<u8>) -> Result<(StreamReport, DitherBitmap), LedwandError> {
        let bitmap = self.ditherer.dither(frame)?;
        let report = self
            .streamer
            .stream(&mut self.transport, &self.framer, &bitmap)?;
        self.frames += 1;
        Ok((report, bitmap))
    }

    /// Stream a pre-packed buffer without dithering.
    pub fn draw_buffer(&mut self, buffer: &[u8]) -> Result<StreamReport, LedwandError> {
        let report = self
            .streamer
            .draw_buffer(&mut self.transport, &self.framer, buffer)?;
        self.frames += 1;
        Ok(report)
    }

    /// Pull one frame from `source`, dither and stream it.
    pub fn render(&mut self, source: &mut dyn FrameSource) -> Result<StreamReport, LedwandError> {
        let dims = self.dimensions();
        if source.dimensions() != dims {
            return Err(LedwandError::InvalidDimensions {
                expected: dims.pixels(),
                actual: source.dimensions().pixels(),
            });
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        let acquired = source
            .next_frame(&mut buffer)
            .and_then(|()| dims.check_frame_len(buffer.len()));
        if let Err(e) = acquired {
            self.buffer = buffer;
            return Err(e);
        }

        // Length is checked above, so dithering cannot fail here.
        let bitmap = self.ditherer.dither(buffer)?;
        let streamed = self
            .streamer
            .stream(&mut self.transport, &self.framer, &bitmap);
        self.buffer = bitmap.into_inner();
        let report = streamed?;
        self.frames += 1;

        debug!(
            frame = self.frames,
            lit = self.ditherer.stats().lit,
            sent = report.sent,
            "frame rendered"
        );
        Ok(report)
    }
}
