//! Transport that decodes packets into log lines instead of sending them.

use tracing::trace;

use ledwand_core::{LedwandError, PacketFramer, Transport};

/// Logs every datagram at `trace` level and keeps counters.
#[derive(Debug)]
pub struct DryRunTransport {
    framer: PacketFramer,
    datagrams: u64,
    bytes: u64,
}

impl DryRunTransport {
    pub fn new(framer: PacketFramer) -> Self {
        Self {
            framer,
            datagrams: 0,
            bytes: 0,
        }
    }

    pub fn datagrams(&self) -> u64 {
        self.datagrams
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Transport for DryRunTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<(), LedwandError> {
        let (header, payload) = self.framer.parse(datagram)?;
        trace!(
            command = %header.command,
            xpos = header.xpos,
            ypos = header.ypos,
            payload = payload.len(),
            "dry-run packet"
        );
        self.datagrams += 1;
        self.bytes += datagram.len() as u64;
        Ok(())
    }
}
