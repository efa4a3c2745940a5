//! Command packet framer.
//!
//! A packet is a [`CommandHeader`] followed by an optional raw payload.
//! The framer rejects anything that would exceed the maximum packet size
//! rather than truncating it.

use bytes::{Bytes, BytesMut};

use crate::command::Command;
use crate::error::LedwandError;
use crate::header::{ByteOrder, CommandHeader, HEADER_SIZE};

/// Default upper bound for one encoded datagram.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Builds encoded command datagrams.
#[derive(Debug, Clone, Copy)]
pub struct PacketFramer {
    order: ByteOrder,
    max_packet_size: usize,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new(ByteOrder::default())
    }
}

impl PacketFramer {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }

    /// Override the packet size limit (must leave room for the header).
    pub fn with_max_packet_size(mut self, max_packet_size: usize) -> Result<Self, LedwandError> {
        if max_packet_size <= HEADER_SIZE {
            return Err(LedwandError::Config(format!(
                "max packet size {max_packet_size} leaves no room for a payload"
            )));
        }
        self.max_packet_size = max_packet_size;
        Ok(self)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Largest payload a single packet can carry.
    pub fn max_payload(&self) -> usize {
        self.max_packet_size - HEADER_SIZE
    }

    /// Encode a command with explicit header fields.
    pub fn build(
        &self,
        command: Command,
        xpos: u16,
        ypos: u16,
        xsize: u16,
        ysize: u16,
        payload: Option<&[u8]>,
    ) -> Result<Bytes, LedwandError> {
        let payload = payload.unwrap_or_default();
        let size = HEADER_SIZE + payload.len();
        if size > self.max_packet_size {
            return Err(LedwandError::PacketTooLarge {
                size,
                max: self.max_packet_size,
            });
        }

        let header = CommandHeader {
            command,
            xpos,
            ypos,
            xsize,
            ysize,
        };
        let mut buf = BytesMut::with_capacity(size);
        header.encode(&mut buf, self.order);
        buf.extend_from_slice(payload);
        Ok(buf.freeze())
    }

    pub fn clear(&self) -> Result<Bytes, LedwandError> {
        self.build(Command::Clear, 0, 0, 0, 0, None)
    }

    pub fn set_brightness(&self, brightness: u8) -> Result<Bytes, LedwandError> {
        self.build(Command::SetBrightness, 0, 0, 0, 0, Some(&[brightness]))
    }

    pub fn reset(&self, hard: bool) -> Result<Bytes, LedwandError> {
        let command = if hard {
            Command::HardReset
        } else {
            Command::Reset
        };
        self.build(command, 0, 0, 0, 0, None)
    }

    /// Write `columns * rows` character cells starting at cell `(x, y)`.
    pub fn write_raw(
        &self,
        x: u16,
        y: u16,
        columns: u16,
        rows: u16,
        chars: &[u8],
    ) -> Result<Bytes, LedwandError> {
        self.rect(Command::WriteRaw, x, y, columns, rows, chars)
    }

    /// Write `columns * rows` per-cell luminance levels starting at `(x, y)`.
    pub fn write_luminance(
        &self,
        x: u16,
        y: u16,
        columns: u16,
        rows: u16,
        levels: &[u8],
    ) -> Result<Bytes, LedwandError> {
        self.rect(Command::WriteLumRaw, x, y, columns, rows, levels)
    }

    /// Write `text` at cell `(x, y)`; the receiver wraps it itself.
    pub fn write_text(&self, x: u16, y: u16, text: &[u8]) -> Result<Bytes, LedwandError> {
        self.build(Command::WriteStd, x, y, 1, 1, Some(text))
    }

    /// Luminance for subsequent [`write_text`](Self::write_text) calls.
    pub fn set_text_luminance(&self, level: u8) -> Result<Bytes, LedwandError> {
        self.build(Command::WriteLumStd, 0, 0, 0, 0, Some(&[level]))
    }

    fn rect(
        &self,
        command: Command,
        x: u16,
        y: u16,
        columns: u16,
        rows: u16,
        data: &[u8],
    ) -> Result<Bytes, LedwandError> {
        let cells = usize::from(columns) * usize::from(rows);
        if data.len() != cells {
            return Err(LedwandError::InvalidDimensions {
                expected: cells,
                actual: data.len(),
            });
        }
        self.build(command, x, y, columns, rows, Some(data))
    }

    /// Draw `slice` at byte `offset` of the receiver's linear bitmap.
    ///
    /// `xpos` carries the offset and `ypos` the slice length.
    pub fn draw(&self, offset: usize, slice: &[u8]) -> Result<Bytes, LedwandError> {
        let xpos = u16::try_from(offset).map_err(|_| LedwandError::FieldOverflow {
            field: "offset",
            value: offset,
        })?;
        let ypos = u16::try_from(slice.len()).map_err(|_| LedwandError::FieldOverflow {
            field: "length",
            value: slice.len(),
        })?;
        self.build(Command::Draw, xpos, ypos, 0, 0, Some(slice))
    }

    /// Split an encoded datagram into its header and payload.
    pub fn parse<'a>(&self, datagram: &'a [u8]) -> Result<(CommandHeader, &'a [u8]), LedwandError> {
        let header = CommandHeader::decode(datagram, self.order)?;
        Ok((header, &datagram[HEADER_SIZE..]))
    }
}
