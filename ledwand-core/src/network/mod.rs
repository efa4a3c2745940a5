//! Datagram transport to the display wall.

pub mod connection;
pub mod recording;

pub use connection::{Connection, Transport};
pub use recording::RecordingTransport;
