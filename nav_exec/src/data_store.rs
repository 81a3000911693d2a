//! # Data Store
//!
//! Session state of the navigation loop. Nothing here outlives the process.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use comms_if::eqpt::drive::DriveCmd;

use crate::frame_sched::FpsCounter;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of transmitted commands kept for display.
pub const CMD_HISTORY_LEN: usize = 3;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A command which was transmitted, and when.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CmdRecord {
    pub timestamp: DateTime<Utc>,

    pub cmd: DriveCmd,
}

/// Record of transmitted commands.
///
/// The last transmitted command is always the newest history entry, so the two can never
/// disagree.
#[derive(Debug, Clone, Default)]
pub struct CmdLog {
    history: VecDeque<CmdRecord>,

    num_sent: u64,
}

/// State owned by the navigation loop.
#[derive(Debug, Clone)]
pub struct NavState {
    /// Transmitted command record
    pub cmd_log: CmdLog,

    /// Index of the next frame to be captured
    pub frame_index: u64,

    /// Frame rate counter
    pub fps: FpsCounter,

    /// Payload of the most recently tracked marker
    pub last_payload: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdLog {
    /// The most recently transmitted command, or `None` if nothing has been sent.
    pub fn last_cmd(&self) -> Option<DriveCmd> {
        self.history.back().map(|r| r.cmd)
    }

    /// Record a transmission, evicting the oldest entry if the history is full.
    pub fn record(&mut self, cmd: DriveCmd, timestamp: DateTime<Utc>) {
        if self.history.len() == CMD_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(CmdRecord { timestamp, cmd });
        self.num_sent += 1;
    }

    /// Recent transmissions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CmdRecord> + '_ {
        self.history.iter()
    }

    /// Recent transmitted commands, oldest first.
    pub fn history_cmds(&self) -> Vec<DriveCmd> {
        self.history.iter().map(|r| r.cmd).collect()
    }

    /// Total number of transmissions this session.
    pub fn num_sent(&self) -> u64 {
        self.num_sent
    }
}

impl NavState {
    /// Fresh state for a session starting at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            cmd_log: CmdLog::default(),
            frame_index: 0,
            fps: FpsCounter::new(now),
            last_payload: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::drive::DriveCmd::*;

    #[test]
    fn test_history_evicts_oldest() {
        let mut log = CmdLog::default();
        assert_eq!(log.last_cmd(), None);

        for &cmd in [Forward, Left, Right, Forward, Stop].iter() {
            log.record(cmd, Utc::now());
            assert!(log.history().count() <= CMD_HISTORY_LEN);
            assert_eq!(log.last_cmd(), Some(cmd));
        }

        assert_eq!(log.history_cmds(), vec![Right, Forward, Stop]);
        assert_eq!(log.num_sent(), 5);
    }
}
