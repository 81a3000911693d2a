//! # Diagnostics
//!
//! Text rendering of what the navigation loop did on each cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::eqpt::marker::Detection;

use crate::{
    cmd_debounce::Dispatch, data_store::NavState, frame_sched::FrameAction,
    steer_ctrl::SteerDecision,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of history entries shown in the diagnostics.
const NUM_HISTORY_SHOWN: usize = 2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Summary of one cycle of the navigation loop.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Index of the frame processed in this cycle
    pub frame_index: u64,

    /// Whether the frame was fully processed
    pub action: FrameAction,

    /// Frame rate over the last window
    pub fps: u32,

    /// Width of the frame used for steering
    pub frame_width: u32,

    /// Number of markers found in the frame
    pub num_detections: usize,

    /// The marker steered towards
    pub target: Option<Detection>,

    /// Steering outcome, `None` for display only frames
    pub decision: Option<SteerDecision>,

    /// What the debouncer did with the command
    pub dispatch: Option<Dispatch>,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Render the report as lines of text.
pub fn render(report: &CycleReport, state: &NavState, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();

    match report.decision {
        Some(d) => lines.push(d.status.to_string()),
        None => lines.push(String::from("Detection skipped")),
    }

    lines.push(format!("FPS: {}", report.fps));

    // Most recent commands, oldest first
    let history: Vec<_> = state.cmd_log.history().collect();
    let start = history.len().saturating_sub(NUM_HISTORY_SHOWN);
    for record in &history[start..] {
        let age_s = (now - record.timestamp).num_milliseconds() as f64 / 1000.0;
        lines.push(format!("{}: {:.1}s ago", record.cmd, age_s));
    }

    if let Some(offset) = report.decision.and_then(|d| d.offset_px) {
        lines.push(format!("Offset: {:+}px", offset));
    }

    if let Some(target) = &report.target {
        lines.push(format!("Marker: {}", target.payload));
    }

    lines
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
