//! Command codes understood by the display wall.
//!
//! The numeric values are a fixed contract with the receiving device.
//! Uses `TryFrom`, so unknown values are errors rather than panics.

use std::fmt;

use crate::error::LedwandError;

/// All commands the sender can issue.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Blank the whole display.
    Clear = 0x0002,
    /// Write a rectangle of character cells (one byte per cell).
    WriteRaw = 0x0003,
    /// Write a text string at a cell position.
    WriteStd = 0x0004,
    /// Write a rectangle of per-cell luminance levels.
    WriteLumRaw = 0x0005,
    /// Set the luminance used by subsequent text writes (1-byte payload).
    WriteLumStd = 0x0006,
    /// Set global brightness (1-byte payload).
    SetBrightness = 0x0007,
    /// Soft reset of the controller.
    Reset = 0x0008,
    /// Hard reset of the controller.
    HardReset = 0x000b,
    /// Write a slice of the linear 1-bit bitmap.
    Draw = 0x0012,
}

impl Command {
    /// Wire code of this command.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Whether the command carries a payload after the header.
    pub const fn has_payload(self) -> bool {
        !matches!(self, Command::Clear | Command::Reset | Command::HardReset)
    }
}

impl TryFrom<u16> for Command {
    type Error = LedwandError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0002 => Ok(Command::Clear),
            0x0003 => Ok(Command::WriteRaw),
            0x0004 => Ok(Command::WriteStd),
            0x0005 => Ok(Command::WriteLumRaw),
            0x0006 => Ok(Command::WriteLumStd),
            0x0007 => Ok(Command::SetBrightness),
            0x0008 => Ok(Command::Reset),
            0x000b => Ok(Command::HardReset),
            0x0012 => Ok(Command::Draw),
            _ => Err(LedwandError::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Clear => write!(f, "Clear"),
            Command::WriteRaw => write!(f, "WriteRaw"),
            Command::WriteStd => write!(f, "WriteStd"),
            Command::WriteLumRaw => write!(f, "WriteLumRaw"),
            Command::WriteLumStd => write!(f, "WriteLumStd"),
            Command::SetBrightness => write!(f, "SetBrightness"),
            Command::Reset => write!(f, "Reset"),
            Command::HardReset => write!(f, "HardReset"),
            Command::Draw => write!(f, "Draw"),
        }
    }
}
