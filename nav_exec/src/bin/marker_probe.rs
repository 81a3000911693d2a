//! # Marker Probe
//!
//! Runs marker detection on a video source without driving the robot, to check that markers can
//! be seen and decoded from where the camera is mounted.
//!
//! With `--json` every detection set is printed to stdout as a single JSON line.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Result};
use comms_if::eqpt::marker::Detection;
use log::{info, warn};
use serde::Serialize;
use structopt::StructOpt;

use nav_lib::{
    cam_client, marker_det::DetectorKind, params::CamParams, quit::QuitSignal, target_sel,
};
use util::{
    host,
    logger::{logger_init, parse_level},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "marker_probe", about = "Report QR markers seen by a video source")]
struct Opt {
    /// Video source: camera index, /dev/ path, stream URL or image directory
    #[structopt(long, default_value = "0")]
    source: String,

    /// Width frames are scaled to before detection
    #[structopt(long, default_value = "640")]
    width: u32,

    /// Print each detection set to stdout as JSON
    #[structopt(long)]
    json: bool,

    /// Log level (info, debug or trace)
    #[structopt(long, default_value = "info")]
    log_level: String,
}

/// One line of JSON output.
#[derive(Serialize)]
struct ProbeLine<'a> {
    frame_index: u64,
    frame_width: u32,
    detections: &'a [Detection],
    target: Option<&'a Detection>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("marker_probe", "sessions").wrap_err("Failed to create the session")?;

    let level = parse_level(&opt.log_level).wrap_err("Invalid log level")?;
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Marker Probe\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE EQUIPMENT ----

    let quit = QuitSignal::new();
    quit.install()
        .wrap_err("Failed to install the quit signal")?;

    let cam_params = CamParams {
        source: opt.source.clone(),
        ..Default::default()
    };
    let mut video = cam_client::open_source(&cam_params).wrap_err("Failed to open video source")?;
    info!("Video source: {}", video.describe());

    let mut detector = DetectorKind::Rqrr.build();

    // ---- MAIN LOOP ----

    let mut frame_index = 0u64;

    while !quit.requested() {
        let frame = match video.read_frame() {
            Ok(f) => f.resized_to_width(opt.width),
            Err(e) => {
                warn!("Failed to retrieve frame from the video source: {}", e);
                break;
            }
        };

        let detections = detector.detect(&frame.to_luma());
        let target = target_sel::select_target(&detections);

        match target {
            Some(t) => info!(
                "[frame {}] Marker detected: {} ({} total)",
                frame_index,
                t.payload,
                detections.len()
            ),
            None => info!("[frame {}] No marker detected", frame_index),
        }

        if opt.json {
            let line = ProbeLine {
                frame_index,
                frame_width: frame.width(),
                detections: &detections,
                target,
            };
            println!(
                "{}",
                serde_json::to_string(&line).wrap_err("Failed to serialise detections")?
            );
        }

        frame_index += 1;
    }

    video.release();

    info!("Probed {} frames", frame_index);

    Ok(())
}
