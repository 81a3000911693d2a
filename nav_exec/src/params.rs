//! # Navigation Executable Parameters
//!
//! This module provides parameters for the navigation executable, loaded from
//! `params/nav_exec.toml`. Every section may be omitted, in which case the defaults below apply.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::marker_det::DetectorKind;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NavExecParams {
    pub cam: CamParams,

    pub link: LinkParams,

    pub nav: NavParams,

    pub det: DetParams,
}

/// Video source parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CamParams {
    /// Connection string for the video source, see `cam_client::SourceSpec`
    pub source: String,

    /// Requested capture width in pixels (V4L2 devices only)
    pub capture_width: u32,

    /// Requested capture height in pixels (V4L2 devices only)
    pub capture_height: u32,

    /// Requested capture rate (V4L2 devices only)
    ///
    /// Units: frames/second
    pub capture_fps: u32,

    /// Longest time to wait for a frame from a network stream
    ///
    /// Units: milliseconds
    pub read_timeout_ms: u64,
}

/// Serial link parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LinkParams {
    /// Serial device of the drive controller
    pub port: String,

    pub baud_rate: u32,

    /// Units: milliseconds
    pub write_timeout_ms: u64,

    /// Time given to the controller to reset after the port is opened
    ///
    /// Units: milliseconds
    pub connect_settle_ms: u64,

    /// Time given to the controller to process each command byte
    ///
    /// Units: milliseconds
    pub post_write_delay_ms: u64,
}

/// Navigation loop parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NavParams {
    /// Width frames are scaled to before detection
    ///
    /// Units: pixels
    pub processing_width: u32,

    /// Run detection on every `skip_factor`-th frame. Values below 1 are treated as 1.
    pub skip_factor: u32,
}

/// Marker detector parameters
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DetParams {
    pub kind: DetectorKind,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CamParams {
    fn default() -> Self {
        Self {
            source: String::from("0"),
            capture_width: 640,
            capture_height: 480,
            capture_fps: 30,
            read_timeout_ms: 5000,
        }
    }
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyACM0"),
            baud_rate: 9600,
            write_timeout_ms: 1000,
            connect_settle_ms: 2000,
            post_write_delay_ms: 50,
        }
    }
}

impl Default for NavParams {
    fn default() -> Self {
        Self {
            processing_width: 640,
            skip_factor: 2,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
