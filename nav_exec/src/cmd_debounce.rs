//! # Command Debouncing
//!
//! Only changes of command are transmitted to the drive controller. The controller holds the
//! last command it was given, so repeating it only costs serial bandwidth. The one exception is
//! the STOP sent at shutdown, which is always transmitted.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::eqpt::drive::DriveCmd;
use log::{info, warn};

use crate::{data_store::CmdLog, drive_client::DriveLink};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What happened to a submitted command.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Dispatch {
    /// The command was handed to the link and recorded
    Sent,

    /// The command repeated the last transmission and was dropped
    Suppressed,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Transmit `cmd` if it differs from the last transmitted command.
pub fn submit(
    log: &mut CmdLog,
    link: &mut dyn DriveLink,
    cmd: DriveCmd,
    now: DateTime<Utc>,
) -> Dispatch {
    if log.last_cmd() == Some(cmd) {
        return Dispatch::Suppressed;
    }

    transmit(log, link, cmd, now);
    Dispatch::Sent
}

/// Transmit STOP regardless of what was last sent.
pub fn force_stop(log: &mut CmdLog, link: &mut dyn DriveLink, now: DateTime<Utc>) {
    transmit(log, link, DriveCmd::Stop, now);
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn transmit(log: &mut CmdLog, link: &mut dyn DriveLink, cmd: DriveCmd, now: DateTime<Utc>) {
    // Transmission is fire and forget, a failed write is recorded like any other
    match link.send(cmd) {
        Ok(()) => info!("Drive command {} sent", cmd),
        Err(e) => warn!("Drive command {} could not be sent: {}", cmd, e),
    }

    log.record(cmd, now);
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
