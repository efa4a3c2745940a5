//! Fixed-layout command header.
//!
//! ## Wire format
//!
//! ```text
//! cmd:    u16  (2)
//! xpos:   u16  (2)
//! ypos:   u16  (2)
//! xsize:  u16  (2)
//! ysize:  u16  (2)
//! ```
//!
//! The byte order is part of the receiver contract and is not negotiated.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::LedwandError;

/// Encoded size of [`CommandHeader`] on the wire.
pub const HEADER_SIZE: usize = 10;

/// Byte order of the 16-bit header fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// x86 host order, as the reference sender copied its request struct.
    #[default]
    Little,
    /// Network order.
    Big,
}

impl ByteOrder {
    fn put(self, buf: &mut impl BufMut, value: u16) {
        match self {
            ByteOrder::Little => buf.put_u16_le(value),
            ByteOrder::Big => buf.put_u16(value),
        }
    }

    fn read(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }
}

/// Header prepended to every datagram.
///
/// Fields a command does not use are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub command: Command,
    pub xpos: u16,
    pub ypos: u16,
    pub xsize: u16,
    pub ysize: u16,
}

impl CommandHeader {
    /// Header with every positional field zeroed.
    pub fn bare(command: Command) -> Self {
        Self {
            command,
            xpos: 0,
            ypos: 0,
            xsize: 0,
            ysize: 0,
        }
    }

    /// Append the encoded header to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut, order: ByteOrder) {
        order.put(buf, self.command.code());
        order.put(buf, self.xpos);
        order.put(buf, self.ypos);
        order.put(buf, self.xsize);
        order.put(buf, self.ysize);
    }

    /// Parse the header at the start of `data`.
    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self, LedwandError> {
        if data.len() < HEADER_SIZE {
            return Err(LedwandError::TruncatedHeader {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let field = |i: usize| order.read([data[i * 2], data[i * 2 + 1]]);
        Ok(Self {
            command: Command::try_from(field(0))?,
            xpos: field(1),
            ypos: field(2),
            xsize: field(3),
            ysize: field(4),
        })
    }
}
