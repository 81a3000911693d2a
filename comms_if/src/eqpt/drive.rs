//! # Drive Controller Interface
//!
//! Commands understood by the drive microcontroller. Each command is sent as a single ASCII byte
//! with no framing, checksum or acknowledgement.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A discrete steering command for the drive controller.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Hash, Eq, PartialEq)]
pub enum DriveCmd {
    /// Drive straight ahead
    Forward,

    /// Turn towards the left
    Left,

    /// Turn towards the right
    Right,

    /// Bring the rover to a stop
    Stop,
}

/// Errors that can occur when decoding a command from the wire.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum WireError {
    #[error("Unknown drive command byte 0x{0:02x}")]
    UnknownByte(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCmd {
    /// All commands, in wire-code order.
    pub const ALL: [DriveCmd; 4] = [DriveCmd::Forward, DriveCmd::Left, DriveCmd::Right, DriveCmd::Stop];

    /// Get the byte which is written to the drive controller for this command.
    pub fn to_wire(self) -> u8 {
        match self {
            DriveCmd::Forward => b'F',
            DriveCmd::Left => b'L',
            DriveCmd::Right => b'R',
            DriveCmd::Stop => b'S',
        }
    }

    /// Decode a command byte.
    pub fn from_wire(byte: u8) -> Result<Self, WireError> {
        match byte {
            b'F' => Ok(DriveCmd::Forward),
            b'L' => Ok(DriveCmd::Left),
            b'R' => Ok(DriveCmd::Right),
            b'S' => Ok(DriveCmd::Stop),
            b => Err(WireError::UnknownByte(b)),
        }
    }
}

impl fmt::Display for DriveCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire() as char)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
