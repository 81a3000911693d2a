//! # Marker Generator
//!
//! Renders a QR marker for the rover to follow and saves it as an image ready for printing.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Result};
use log::info;
use structopt::StructOpt;

use nav_lib::marker_gen::{render_marker, MarkerSpec};
use util::{
    logger::{logger_init, parse_level},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "marker_gen", about = "Generate a QR marker for robot tracking")]
struct Opt {
    /// Data to encode in the marker
    #[structopt(long, default_value = "ROBOT_TARGET")]
    data: String,

    /// Output image file
    #[structopt(long, default_value = "robot_target.png", parse(from_os_str))]
    output: PathBuf,

    /// QR version (1-40), higher values allow more data
    #[structopt(long, default_value = "5")]
    size: i16,

    /// Border size in modules
    #[structopt(long, default_value = "4")]
    border: u32,

    /// Do not add a text label below the marker
    #[structopt(long)]
    no_text: bool,

    /// Log level (info, debug or trace)
    #[structopt(long, default_value = "info")]
    log_level: String,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let session = Session::new("marker_gen", "sessions").wrap_err("Failed to create the session")?;

    let level = parse_level(&opt.log_level).wrap_err("Invalid log level")?;
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Marker Generator\n");

    let spec = MarkerSpec {
        data: opt.data.clone(),
        min_version: opt.size,
        border_modules: opt.border,
        label: !opt.no_text,
        ..Default::default()
    };

    let img = render_marker(&spec).wrap_err("Failed to render the marker")?;

    img.save(&opt.output)
        .wrap_err_with(|| format!("Failed to save the marker to {:?}", opt.output))?;

    let size_kb = std::fs::metadata(&opt.output)
        .wrap_err("Failed to read the saved marker")?
        .len() as f64
        / 1024.0;

    info!(
        "Marker {:?} saved to {:?} ({}x{} px, {:.2} KB)",
        spec.data,
        opt.output,
        img.width(),
        img.height(),
        size_kb
    );

    Ok(())
}
