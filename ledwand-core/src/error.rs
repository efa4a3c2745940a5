//! Domain-specific error types for the LED wall sender.
//!
//! All fallible operations return `Result<T, LedwandError>`.
//! Transport failures are recoverable per packet; everything else is a
//! configuration or contract violation that the caller must surface.

use thiserror::Error;

/// The canonical error type for the LED wall sender.
#[derive(Debug, Error)]
pub enum LedwandError {
    // ── Connection Errors ────────────────────────────────────────
    /// The destination address could not be parsed.
    #[error("invalid display address: {0}")]
    Address(String),

    /// The datagram endpoint could not be created.
    #[error("socket error: {0}")]
    Socket(#[source] std::io::Error),

    /// A datagram was rejected or only partially accepted by the OS.
    #[error("send failed: {sent} of {expected} bytes accepted")]
    Send {
        sent: usize,
        expected: usize,
        #[source]
        source: Option<std::io::Error>,
    },

    // ── Protocol Errors ──────────────────────────────────────────
    /// Header plus payload exceeds the maximum packet size.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// A numeric value did not map to any known command code.
    #[error("unknown command code: {0:#06x}")]
    UnknownCommand(u16),

    /// A received datagram is shorter than the fixed header.
    #[error("truncated header: {actual} bytes (need {expected})")]
    TruncatedHeader { expected: usize, actual: usize },

    /// A value does not fit into its 16-bit wire field.
    #[error("{field} value {value} does not fit in a 16-bit field")]
    FieldOverflow { field: &'static str, value: usize },

    // ── Frame Errors ─────────────────────────────────────────────
    /// A buffer does not match the declared frame dimensions.
    #[error("invalid dimensions: expected {expected} bytes, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    // ── Application Errors ───────────────────────────────────────
    /// Frame source I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value is out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// The thread running the frame work panicked or was cancelled.
    #[error("frame worker failed: {0}")]
    Worker(String),
}

impl LedwandError {
    /// Whether the error should stop the current operation.
    ///
    /// Send failures are tolerated: the display repaints on the next
    /// frame. Everything else indicates broken configuration or input.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LedwandError::Send { .. })
    }
}
