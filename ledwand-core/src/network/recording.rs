//! In-memory transport for tests and offline runs.

use std::collections::HashSet;

use bytes::Bytes;

use crate::error::LedwandError;
use crate::network::connection::Transport;

/// In-memory transport that keeps every datagram it is handed.
///
/// Sends listed with [`fail_on`](Self::fail_on) are rejected with a
/// send error and not recorded.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    datagrams: Vec<Bytes>,
    attempts: usize,
    failing: HashSet<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the send attempts with these zero-based indices.
    pub fn fail_on(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(attempts);
        self
    }

    /// Datagrams accepted so far, in send order.
    pub fn datagrams(&self) -> &[Bytes] {
        &self.datagrams
    }

    /// Number of send calls, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Take everything recorded so far, leaving the log empty.
    pub fn take(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.datagrams)
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<(), LedwandError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.failing.contains(&attempt) {
            return Err(LedwandError::Send {
                sent: 0,
                expected: datagram.len(),
                source: None,
            });
        }
        self.datagrams.push(Bytes::copy_from_slice(datagram));
        Ok(())
    }
}
