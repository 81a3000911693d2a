//! # Navigation library.
//!
//! This library allows the executables and benchmarks in the workspace to access items defined
//! inside the navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Camera client - opens the video source and reads frames from it
pub mod cam_client;

/// Command debouncer - only forwards drive commands which differ from the last one
pub mod cmd_debounce;

/// Data store - session state shared between the navigation modules
pub mod data_store;

/// Diagnostics - text summary of each navigation cycle
pub mod diag;

/// Drive client - sends drive commands to the motor controller over serial
pub mod drive_client;

/// Frame scheduler - decides which frames are processed and measures the frame rate
pub mod frame_sched;

/// Marker detection - finds and decodes QR markers in a frame
pub mod marker_det;

/// Marker generation - renders printable QR markers
pub mod marker_gen;

/// Navigation control - the capture, detect, steer and command loop
pub mod nav_ctrl;

/// Parameters for the navigation executable
pub mod params;

/// Quit signal - operator requests to end the session
pub mod quit;

/// Steering control - converts the target position into a drive command
pub mod steer_ctrl;

/// Target selection - picks the marker to steer towards
pub mod target_sel;

#[cfg(test)]
mod test_eqpt;
