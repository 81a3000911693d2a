//! # Steering Control
//!
//! Maps the horizontal position of the selected marker onto a discrete drive command. The frame
//! is split into a central band, `CENTRE_BAND_FRACTION` of the frame width either side of the
//! centre line, inside which the rover drives forward. Outside the band the rover turns towards
//! the marker, and with no marker it stops.
//!
//! All functions here are pure.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{drive::DriveCmd, marker::Detection};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Half width of the forward band as a fraction of the processed frame width.
pub const CENTRE_BAND_FRACTION: f64 = 0.10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The outcome of steering for one processed frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SteerDecision {
    /// Command to send to the drive controller
    pub cmd: DriveCmd,

    /// Why the command was chosen
    pub status: SteerStatus,

    /// Horizontal offset of the target centre from the frame centre, positive to the right, or
    /// `None` if there was no target.
    ///
    /// Units: pixels
    pub offset_px: Option<i64>,

    /// Half width of the forward band used for this decision.
    ///
    /// Units: pixels
    pub threshold_px: i64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SteerStatus {
    /// No marker in view
    NoTarget,

    /// Marker is inside the forward band
    Centred,

    /// Marker is left of the forward band
    TargetLeft,

    /// Marker is right of the forward band
    TargetRight,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Half width of the forward band for a frame of the given width.
pub fn centre_threshold_px(frame_width: u32) -> i64 {
    (frame_width as f64 * CENTRE_BAND_FRACTION).round() as i64
}

/// Horizontal centre line of a frame of the given width.
pub fn frame_centre_x(frame_width: u32) -> i64 {
    (frame_width / 2) as i64
}

/// Steer towards the selected target, or stop if there isn't one.
pub fn calc_steer(target: Option<&Detection>, frame_width: u32) -> SteerDecision {
    match target {
        Some(det) => steer_to_centre_x(det.bbox.centre_x(), frame_width),
        None => SteerDecision {
            cmd: DriveCmd::Stop,
            status: SteerStatus::NoTarget,
            offset_px: None,
            threshold_px: centre_threshold_px(frame_width),
        },
    }
}

/// Steer towards a target whose centre is at `object_centre_x`.
pub fn steer_to_centre_x(object_centre_x: i64, frame_width: u32) -> SteerDecision {
    let offset = object_centre_x - frame_centre_x(frame_width);
    let threshold = centre_threshold_px(frame_width);

    let (cmd, status) = if offset.abs() < threshold {
        (DriveCmd::Forward, SteerStatus::Centred)
    } else if offset < 0 {
        (DriveCmd::Left, SteerStatus::TargetLeft)
    } else {
        (DriveCmd::Right, SteerStatus::TargetRight)
    };

    SteerDecision {
        cmd,
        status,
        offset_px: Some(offset),
        threshold_px: threshold,
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for SteerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SteerStatus::NoTarget => "No marker detected",
            SteerStatus::Centred => "Marker centred - moving forward",
            SteerStatus::TargetLeft => "Marker left - turning left",
            SteerStatus::TargetRight => "Marker right - turning right",
        };
        f.write_str(s)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
