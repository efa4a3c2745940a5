//! # ledwand-core
//!
//! Sender-side library for a monochrome LED display wall driven over UDP.
//!
//! This crate contains:
//! - **Protocol types**: `Command`, `CommandHeader`, `ByteOrder`
//! - **Framer**: `PacketFramer`, bounded header + payload datagrams
//! - **Network**: `Connection` (UDP) and the `Transport` seam
//! - **Ditherer**: Floyd–Steinberg greyscale → packed 1-bit bitmap
//! - **Streamer**: `FrameStreamer`, paced band and part draws
//! - **Session**: `DisplaySession` tying the pipeline together
//! - **Sources**: `FrameSource` plus file and test-pattern sources
//! - **Error**: `LedwandError`, a `thiserror` enum

pub mod command;
pub mod dither;
pub mod error;
pub mod frame;
pub mod header;
pub mod network;
pub mod packet;
pub mod session;
pub mod source;
pub mod stream;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::Command;
pub use dither::{DEFAULT_BIAS, DitherStats, Ditherer};
pub use error::LedwandError;
pub use frame::{DitherBitmap, Dimensions, HEIGHT, WIDTH};
pub use header::{ByteOrder, CommandHeader, HEADER_SIZE};
pub use network::connection::DEFAULT_PORT;
pub use network::{Connection, RecordingTransport, Transport};
pub use packet::{MAX_PACKET_SIZE, PacketFramer};
pub use session::DisplaySession;
pub use source::{BitmapFile, FrameSource, GreyFile, LumaWeights, TestPattern, XrgbFile};
pub use stream::{FrameStreamer, StreamConfig, StreamReport};
